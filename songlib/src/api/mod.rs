//! API layer for HTTP request handling and data models.
//!
//! - **[`handlers`]**: Axum route handlers, one module per resource
//! - **[`models`]**: Request/response data structures for API communication
//!
//! All library routes live under `/api/v1/library`. Every endpoint is annotated for `utoipa`;
//! the rendered documentation is served at `/api/v1/docs`.

pub mod handlers;
pub mod models;
