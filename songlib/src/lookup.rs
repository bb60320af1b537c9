//! Client for the external song-info lookup service.
//!
//! The service answers `GET {base_url}/info?group=..&song=..` with
//! `{"releaseDate": "..", "text": "..", "link": ".."}`. Workflows depend on the [`SongInfoLookup`]
//! trait so tests and alternative backends can be injected; [`ReqwestLookup`] is the HTTP
//! implementation. There are no retries.

use crate::errors::Error;
use crate::types::abbrev_text;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error as ThisError;
use tracing::{debug, instrument};
use url::Url;
use utoipa::ToSchema;

/// Details the lookup service knows about a song
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SongDetail {
    /// `dd.MM.yyyy`
    #[schema(example = "16.07.2006")]
    pub release_date: String,
    /// Full lyrics, verses separated by blank lines
    pub text: String,
    #[schema(example = "https://www.youtube.com/watch?v=Xsp3_a-PMTw")]
    pub link: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct LookupConfig {
    /// Address of the lookup service, without the `/info` path
    pub base_url: Url,
    /// Per-request timeout; expiry counts as an upstream failure
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl LookupConfig {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse("http://localhost:8081").expect("static URL is valid"),
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }
}

#[derive(ThisError, Debug)]
pub enum LookupError {
    /// Connection failure or timeout; no response was received
    #[error("lookup request failed: {0}")]
    Transport(#[source] reqwest::Error),

    /// The service answered with a non-success status
    #[error("lookup service responded with {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body is not a song detail
    #[error("invalid lookup response: {0}")]
    Decode(String),

    #[error("invalid lookup URL: {0}")]
    Url(#[from] url::ParseError),
}

impl From<LookupError> for Error {
    fn from(err: LookupError) -> Self {
        match err {
            LookupError::Transport(e) => Error::Upstream {
                status: None,
                message: e.to_string(),
            },
            LookupError::Status { status, .. } => Error::Upstream {
                status: Some(status),
                message: format!("Lookup service responded with status {status}"),
            },
            LookupError::Decode(message) => Error::Validation {
                message: format!("Lookup service returned an unexpected response: {message}"),
            },
            err @ LookupError::Url(_) => Error::Other(anyhow::Error::new(err)),
        }
    }
}

/// Source of release date, lyrics and link for a (group, song) pair
#[async_trait]
pub trait SongInfoLookup: Send + Sync {
    async fn fetch(&self, group: &str, song: &str) -> Result<SongDetail, LookupError>;
}

/// [`SongInfoLookup`] over HTTP
pub struct ReqwestLookup {
    client: Client,
    base_url: Url,
}

impl ReqwestLookup {
    pub fn new(config: &LookupConfig) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
        })
    }

    fn info_url(&self, group: &str, song: &str) -> Result<Url, LookupError> {
        let mut url = ensure_slash(&self.base_url).join("info")?;
        url.query_pairs_mut().append_pair("group", group).append_pair("song", song);
        Ok(url)
    }
}

/// Makes sure a url has a trailing slash, so `join` appends instead of replacing the last segment.
fn ensure_slash(url: &Url) -> Url {
    if url.path().ends_with('/') {
        return url.clone();
    }
    let mut new_url = url.clone();
    let path = format!("{}/", new_url.path());
    new_url.set_path(&path);
    new_url
}

#[async_trait]
impl SongInfoLookup for ReqwestLookup {
    #[instrument(skip(self), err)]
    async fn fetch(&self, group: &str, song: &str) -> Result<SongDetail, LookupError> {
        let url = self.info_url(group, song)?;
        debug!("Fetching song info from {}", url);

        let response = self.client.get(url).send().await.map_err(LookupError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), body = %abbrev_text(&body), "Lookup service returned an error");
            return Err(LookupError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await.map_err(LookupError::Transport)?;
        serde_json::from_str::<SongDetail>(&body).map_err(|e| {
            tracing::warn!(body = %abbrev_text(&body), "Failed to parse lookup response: {}", e);
            LookupError::Decode(e.to_string())
        })
    }
}
