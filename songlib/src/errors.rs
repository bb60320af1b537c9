use crate::db::errors::DbError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum Error {
    /// Bad or missing input, rejected before any workflow step runs
    #[error("{message}")]
    Validation { message: String },

    /// Duplicate song or a lost insert race
    #[error("Conflict: {message}")]
    Conflict { message: String },

    /// Requested resource not found
    #[error("{resource} with ID {id} not found")]
    NotFound { resource: String, id: String },

    /// Lookup service failure. `status` is the upstream HTTP status when one was received.
    #[error("Lookup failed: {message}")]
    Upstream { status: Option<u16>, message: String },

    /// Failure inside a multi-row unit of work (the whole transaction was rolled back)
    #[error("Transaction failed: {0}")]
    Transaction(DbError),

    /// Database operation error
    #[error(transparent)]
    Database(#[from] DbError),

    /// Unexpected error with full context chain
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Title and detail of a failed request, attached to error responses as an extension so the
/// [`problem_details`](crate::problem_details) middleware can render the full problem body.
#[derive(Debug, Clone, PartialEq)]
pub struct Problem {
    pub title: String,
    pub detail: String,
}

impl Error {
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation { message: message.into() }
    }

    pub fn song_not_found(id: impl ToString) -> Self {
        Error::NotFound {
            resource: "Song".to_string(),
            id: id.to_string(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Validation { .. } => StatusCode::BAD_REQUEST,
            Error::Conflict { .. } => StatusCode::CONFLICT,
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::Upstream { status: Some(_), .. } => StatusCode::BAD_REQUEST,
            Error::Upstream { status: None, .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Transaction(db_err) if db_err.is_unique_violation() => StatusCode::CONFLICT,
            Error::Transaction(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Database(db_err) => match db_err {
                DbError::NotFound => StatusCode::NOT_FOUND,
                DbError::UniqueViolation { .. } => StatusCode::CONFLICT,
                DbError::ForeignKeyViolation { .. } => StatusCode::BAD_REQUEST,
                DbError::CheckViolation { .. } => StatusCode::BAD_REQUEST,
                DbError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Error::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short problem title, one per error kind
    pub fn title(&self) -> &'static str {
        match self {
            Error::Validation { .. } => "Validation error",
            Error::Conflict { .. } => "Conflict",
            Error::NotFound { .. } => "Not found",
            Error::Upstream { .. } => "Upstream error",
            Error::Transaction(_) => "Tx error",
            Error::Database(_) => "DB error",
            Error::Other(_) => "Internal error",
        }
    }

    /// Returns a user-safe error message, without leaking internal implementation details
    pub fn user_message(&self) -> String {
        match self {
            Error::Validation { message } => message.clone(),
            Error::Conflict { message } => message.clone(),
            Error::NotFound { resource, id } => format!("{resource} with ID {id} not found"),
            Error::Upstream { status: Some(_), message } => message.clone(),
            Error::Upstream { status: None, .. } => "Lookup service is unavailable".to_string(),
            Error::Transaction(db_err) => match db_err {
                DbError::UniqueViolation { constraint, .. } => unique_violation_message(constraint.as_deref()),
                _ => "Transaction failed".to_string(),
            },
            Error::Database(db_err) => match db_err {
                DbError::NotFound => "Resource not found".to_string(),
                DbError::UniqueViolation { constraint, .. } => unique_violation_message(constraint.as_deref()),
                DbError::ForeignKeyViolation { .. } => "Invalid reference to related resource".to_string(),
                DbError::CheckViolation { .. } => "Invalid data provided".to_string(),
                DbError::Other(_) => "Database error occurred".to_string(),
            },
            Error::Other(_) => "Internal server error".to_string(),
        }
    }
}

fn unique_violation_message(constraint: Option<&str>) -> String {
    match constraint {
        Some("songs_group_title_unique") => "Song already exists".to_string(),
        Some("groups_name_unique") => "Group already exists".to_string(),
        Some("verses_song_order_unique") => "Verse order must be unique within a song".to_string(),
        _ => "Resource already exists".to_string(),
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        // Log full error details for debugging - different log levels based on severity
        match &self {
            Error::Database(DbError::Other(_)) | Error::Transaction(_) | Error::Other(_) => {
                tracing::error!("Internal service error: {:#}", self);
            }
            Error::Upstream { status: None, .. } => {
                tracing::error!("Lookup service unreachable: {}", self);
            }
            Error::Database(_) | Error::Conflict { .. } => {
                tracing::warn!("Conflict or constraint error: {}", self);
            }
            Error::Upstream { .. } => {
                tracing::warn!("Lookup service rejected request: {}", self);
            }
            Error::Validation { .. } | Error::NotFound { .. } => {
                tracing::debug!("Client error: {}", self);
            }
        }

        let problem = Problem {
            title: self.title().to_string(),
            detail: self.user_message(),
        };
        let mut response = (self.status_code(), problem.detail.clone()).into_response();
        response.extensions_mut().insert(problem);
        response
    }
}

/// Type alias for service operation results
pub type Result<T> = std::result::Result<T, Error>;
