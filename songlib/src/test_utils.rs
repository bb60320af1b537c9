//! Shared helpers for tests.

use crate::api::models::songs::NewSong;
use crate::config::{Config, DatabaseConfig, PoolSettings};
use crate::library::Library;
use crate::lookup::{LookupConfig, LookupError, SongDetail, SongInfoLookup};
use async_trait::async_trait;
use axum_test::TestServer;
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use url::Url;

/// In-memory [`SongInfoLookup`]. Unknown songs answer like the real service does for a bad
/// request (status 400).
#[derive(Default)]
pub struct StaticLookup {
    details: Mutex<HashMap<(String, String), SongDetail>>,
    calls: AtomicUsize,
}

impl StaticLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_song(self, group: &str, song: &str, text: &str) -> Self {
        self.insert(
            group,
            song,
            SongDetail {
                release_date: "16.07.2006".to_string(),
                text: text.to_string(),
                link: format!("https://www.youtube.com/watch?v={}", song.replace(' ', "_")),
            },
        );
        self
    }

    pub fn insert(&self, group: &str, song: &str, detail: SongDetail) {
        self.details
            .lock()
            .unwrap()
            .insert((group.to_string(), song.to_string()), detail);
    }

    /// Number of `fetch` calls so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SongInfoLookup for StaticLookup {
    async fn fetch(&self, group: &str, song: &str) -> Result<SongDetail, LookupError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.details
            .lock()
            .unwrap()
            .get(&(group.to_string(), song.to_string()))
            .cloned()
            .ok_or_else(|| LookupError::Status {
                status: 400,
                body: "unknown song".to_string(),
            })
    }
}

pub fn new_song(group: &str, song: &str) -> NewSong {
    NewSong {
        group: group.to_string(),
        song: song.to_string(),
    }
}

/// A library over `pool` backed by `lookup`
pub fn create_test_library(pool: PgPool, lookup: Arc<StaticLookup>) -> Library {
    Library::new(pool, lookup)
}

pub fn create_test_config() -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        database: DatabaseConfig {
            user: Some("postgres".to_string()),
            password: Some("postgres".to_string()),
            create_if_missing: false,
            pool: PoolSettings {
                max_connections: 4,
                min_connections: 0,
                ..Default::default()
            },
            ..Default::default()
        },
        lookup: LookupConfig {
            base_url: Url::parse("http://127.0.0.1:9").unwrap(),
            timeout: std::time::Duration::from_secs(2),
        },
        ..Default::default()
    }
}

/// Full application on top of an existing pool, with the lookup service at `lookup_url`
pub async fn create_test_app(pool: PgPool, lookup_url: &str) -> TestServer {
    crate::install_crypto_provider();

    let mut config = create_test_config();
    config.lookup.base_url = Url::parse(lookup_url).unwrap();

    crate::Application::new_with_pool(config, Some(pool))
        .await
        .expect("Failed to create application")
        .into_test_server()
}
