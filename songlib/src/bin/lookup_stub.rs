//! Local stand-in for the external song-info service.
//!
//! Answers `GET /info?group=..&song=..` with the same canned song detail for every song, and 400
//! when either parameter is missing or empty. Point `lookup.base_url` (or `EXTERNAL_API_ADDR`) at
//! it to run the library without the real service.

use axum::{
    Json, Router,
    extract::Query,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use clap::Parser;
use serde::Deserialize;
use serde_json::json;
use songlib::lookup::SongDetail;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "Canned song-info service for local development")]
struct Args {
    /// Address to bind to
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    #[arg(long, env = "LOOKUP_STUB_PORT", default_value_t = 8081)]
    port: u16,
}

#[derive(Debug, Deserialize)]
struct InfoQuery {
    group: Option<String>,
    song: Option<String>,
}

fn canned_detail() -> SongDetail {
    SongDetail {
        release_date: "16.07.2006".to_string(),
        text: "Ooh baby, don't you know I suffer?\nOoh baby, can you hear me moan?\nYou caught me under false pretenses\nHow long before you let me go?\n\nOoh\nYou set my soul alight\nOoh\nYou set my soul alight".to_string(),
        link: "https://www.youtube.com/watch?v=Xsp3_a-PMTw".to_string(),
    }
}

#[tracing::instrument(skip_all)]
async fn song_info(Query(query): Query<InfoQuery>) -> Response {
    let present = |value: &Option<String>| value.as_deref().is_some_and(|v| !v.is_empty());
    if !present(&query.group) || !present(&query.song) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "group and song parameters are required"})),
        )
            .into_response();
    }

    Json(canned_detail()).into_response()
}

fn router() -> Router {
    Router::new().route("/info", get(song_info)).layer(TraceLayer::new_for_http())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let bind_addr = format!("{}:{}", args.host, args.port);
    let listener = TcpListener::bind(&bind_addr).await?;
    tracing::info!("Lookup stub listening on http://{}", bind_addr);

    axum::serve(listener, router()).await?;
    Ok(())
}
