//! # songlib: Song Library Service
//!
//! A catalog of songs grouped by performer, with lyrics stored as ordered verses. Songs are added
//! by group and title; their release date, link and lyrics are fetched from an external song-info
//! service and the lyrics are split into verses on blank lines.
//!
//! ## Architecture
//!
//! ```text
//!   HTTP ──► api::handlers ──► library (workflows) ──► db::handlers (repositories) ──► PostgreSQL
//!                                   │
//!                                   └──► lookup (song-info service client)
//! ```
//!
//! - [`api`]: axum handlers and the request/response models
//! - [`library`]: one workflow per operation, each validating its input and owning its transaction
//! - [`db`]: repositories over `sqlx` connections, row models and the database error taxonomy
//! - [`lookup`]: the external song-info client, behind the [`lookup::SongInfoLookup`] trait
//! - [`problem_details`]: renders every failed request as a problem body
//!
//! ## Startup
//!
//! [`Application::new`] creates the database when it is missing, runs the migrations and builds
//! the router; [`Application::serve`] binds the listener and serves until the shutdown future
//! resolves.

pub mod api;
pub mod config;
pub mod db;
pub mod errors;
pub mod library;
pub mod lookup;
mod openapi;
pub mod problem_details;
pub mod telemetry;
pub mod types;
pub mod verses;

#[cfg(test)]
pub mod test_utils;

use crate::config::{CorsOrigin, DatabaseConfig};
use crate::library::Library;
use crate::lookup::ReqwestLookup;
use crate::openapi::{ApiDoc, LIBRARY_PREFIX};
use axum::{
    Json, Router,
    http::{self, HeaderValue, Method},
    middleware::from_fn,
    routing::{delete, get, post, put},
};
use bon::Builder;
pub use config::Config;
use sqlx::{Connection, Executor, PgConnection, PgPool, postgres::PgPoolOptions};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{AllowOrigin, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, debug, info, instrument};
use utoipa_scalar::{Scalar, Servable};

/// Application state shared across all request handlers.
///
/// ```ignore
/// let state = AppState::builder()
///     .config(config)
///     .library(Library::new(pool, lookup))
///     .build();
/// ```
#[derive(Clone, Builder)]
pub struct AppState {
    pub config: Config,
    pub library: Library,
}

/// Install the process-wide rustls crypto provider. Safe to call more than once.
pub fn install_crypto_provider() {
    // Err means a provider is already installed
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
}

/// Get the songlib database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

/// Create the service database when it does not exist yet.
///
/// Connects to the `postgres` maintenance database on the same server, so the configured user
/// needs the `CREATEDB` privilege the first time around.
#[instrument(skip_all, err)]
async fn ensure_database_exists(db: &DatabaseConfig) -> anyhow::Result<()> {
    let name = db.database_name()?;
    let mut conn = PgConnection::connect_with(&db.maintenance_options()?).await?;

    let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM pg_database WHERE datname = $1)")
        .bind(&name)
        .fetch_one(&mut conn)
        .await?;

    if exists {
        debug!(database = %name, "Database already exists");
    } else {
        info!(database = %name, "Creating database");
        // identifiers cannot be bound, quote it instead
        let statement = format!("CREATE DATABASE \"{}\"", name.replace('"', "\"\""));
        conn.execute(statement.as_str()).await?;
    }

    conn.close().await?;
    Ok(())
}

/// Connect the pool and apply pending migrations.
async fn setup_database(config: &Config) -> anyhow::Result<PgPool> {
    let db = &config.database;
    if db.create_if_missing {
        ensure_database_exists(db).await?;
    }

    let settings = &db.pool;
    let pool = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .min_connections(settings.min_connections)
        .acquire_timeout(settings.acquire_timeout())
        .idle_timeout(settings.idle_timeout())
        .max_lifetime(settings.max_lifetime())
        .connect_with(db.connect_options()?)
        .await?;

    info!(database = %db.database_name()?, "Connected to database");
    Ok(pool)
}

/// Create CORS layer from configuration
fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let allowed = &config.cors.allowed_origins;

    let origin = if allowed.contains(&CorsOrigin::Wildcard) {
        AllowOrigin::any()
    } else {
        let mut origins = Vec::new();
        for origin in allowed {
            if let CorsOrigin::Url(url) = origin {
                // Url keeps a trailing slash, an Origin header never has one
                origins.push(url.as_str().trim_end_matches('/').parse::<HeaderValue>()?);
            }
        }
        AllowOrigin::list(origins)
    };

    let mut cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([http::header::CONTENT_TYPE]);

    if let Some(max_age) = config.cors.max_age {
        cors = cors.max_age(std::time::Duration::from_secs(max_age));
    }

    Ok(cors)
}

/// Build the application router.
///
/// - `/api/v1/library/*`: the song endpoints
/// - `/api/v1/openapi.json` and `/api/v1/docs`: API documentation
/// - `/healthz`: liveness
///
/// Layers, innermost first: panic recovery, problem-details rendering, request tracing, CORS.
#[instrument(skip_all)]
pub fn build_router(state: &AppState) -> anyhow::Result<Router> {
    let library_routes = Router::new()
        .route("/songs", get(api::handlers::songs::list_songs))
        .route("/songs/add", post(api::handlers::songs::add_song))
        .route("/songs/{id}/lyrics", get(api::handlers::songs::get_lyrics))
        .route("/songs/edit/{id}", put(api::handlers::songs::edit_song))
        .route("/songs/delete/{id}", delete(api::handlers::songs::delete_song))
        .with_state(state.clone());

    let openapi = ApiDoc::for_config(&state.config);
    let openapi_json = openapi.clone();

    let router = Router::new()
        .route("/healthz", get(|| async { "ok" }))
        .route("/api/v1/openapi.json", get(move || async move { Json(openapi_json) }))
        .merge(Scalar::with_url("/api/v1/docs", openapi))
        .nest(LIBRARY_PREFIX, library_routes)
        // a panicking handler becomes a 500 the problem layer can render
        .layer(CatchPanicLayer::new())
        .layer(from_fn(problem_details::problem_details))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(create_cors_layer(&state.config)?);

    Ok(router)
}

/// Main application struct that owns all resources and lifecycle.
///
/// 1. **Create**: [`Application::new`] connects to (and if needed creates) the database, runs
///    migrations and builds the router
/// 2. **Serve**: [`Application::serve`] binds to the configured address and handles requests
/// 3. **Shutdown**: when the shutdown future resolves, in-flight requests finish, then the pool
///    is closed and pending spans are flushed
pub struct Application {
    router: Router,
    config: Config,
    pool: PgPool,
}

impl Application {
    /// Create a new application instance with all resources initialized
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        Self::new_with_pool(config, None).await
    }

    /// Like [`Application::new`], on top of an existing pool when one is given
    pub async fn new_with_pool(config: Config, pool: Option<PgPool>) -> anyhow::Result<Self> {
        debug!("Starting song library with configuration: {:#?}", config);

        let pool = match pool {
            Some(pool) => pool,
            None => setup_database(&config).await?,
        };
        migrator().run(&pool).await?;

        let lookup = ReqwestLookup::new(&config.lookup)?;
        info!(base_url = %config.lookup.base_url, "Song-info lookup configured");

        let app_state = AppState::builder()
            .config(config.clone())
            .library(Library::new(pool.clone(), Arc::new(lookup)))
            .build();
        let router = build_router(&app_state)?;

        Ok(Self { router, config, pool })
    }

    /// Convert application into a test server (for tests)
    #[cfg(test)]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router).expect("Failed to create test server")
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "Song library listening on http://{}, docs at http://{}:{}/api/v1/docs",
            bind_addr, self.config.domain, self.config.port
        );

        axum::serve(listener, self.router).with_graceful_shutdown(shutdown).await?;

        info!("Closing database connections...");
        self.pool.close().await;

        info!("Shutting down telemetry...");
        telemetry::shutdown_telemetry();

        Ok(())
    }
}
