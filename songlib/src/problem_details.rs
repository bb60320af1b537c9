//! Problem-details rendering for failed requests.
//!
//! Every client or server error leaving the router is rewritten into the same JSON body:
//!
//! ```json
//! {
//!   "status_code": 404,
//!   "method": "GET",
//!   "time": "2024-11-23 18:04:11",
//!   "type": "/api/v1/library/songs/17/lyrics?page=1&limit=5",
//!   "title": "Not found",
//!   "detail": "Song with ID 17 not found"
//! }
//! ```
//!
//! Handler errors ([`crate::errors::Error`]) attach a [`Problem`] extension carrying their title and
//! detail. Anything else (unknown routes, rejected extractors, caught panics) is wrapped using the
//! status reason as the title and the response body text as the detail.

use crate::errors::Problem;
use axum::{
    Json,
    body::to_bytes,
    extract::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use utoipa::ToSchema;

pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// Rejection bodies are short; anything longer is not worth echoing back.
const MAX_WRAPPED_BODY_BYTES: usize = 64 * 1024;

/// Error body returned for every non-2xx response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct ProblemDetails {
    pub status_code: u16,
    pub method: String,
    /// UTC, `YYYY-MM-DD HH:MM:SS`
    pub time: String,
    /// Path and query of the request that failed
    #[serde(rename = "type")]
    pub problem_type: String,
    pub title: String,
    pub detail: String,
}

#[instrument(skip_all, fields(path = %request.uri().path(), method = %request.method()))]
pub async fn problem_details(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();

    let response = next.run(request).await;
    let status = response.status();
    if !status.is_client_error() && !status.is_server_error() {
        return response;
    }

    let (parts, body) = response.into_parts();
    let problem = match parts.extensions.get::<Problem>().cloned() {
        Some(problem) => problem,
        None => {
            let detail = match to_bytes(body, MAX_WRAPPED_BODY_BYTES).await {
                Ok(bytes) => String::from_utf8_lossy(&bytes).trim().to_string(),
                Err(_) => String::new(),
            };
            Problem {
                title: status.canonical_reason().unwrap_or("Error").to_string(),
                detail,
            }
        }
    };

    if status.is_server_error() {
        tracing::error!(%method, %uri, status = status.as_u16(), title = %problem.title, detail = %problem.detail, "Request failed");
    } else {
        tracing::warn!(%method, %uri, status = status.as_u16(), title = %problem.title, detail = %problem.detail, "Request rejected");
    }

    let body = ProblemDetails {
        status_code: status.as_u16(),
        method: method.to_string(),
        time: Utc::now().format(TIME_FORMAT).to_string(),
        problem_type: uri.path_and_query().map(|p| p.as_str()).unwrap_or("/").to_string(),
        title: problem.title,
        detail: problem.detail,
    };

    (status, Json(body)).into_response()
}
