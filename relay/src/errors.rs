use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error as ThisError;

use crate::upstream::UpstreamError;

#[derive(ThisError, Debug)]
pub enum Error {
    /// Request did not carry a file under the `contract` field
    #[error("No file uploaded")]
    NoFileUploaded,

    /// Invalid request data (unreadable multipart body, etc.)
    #[error("{message}")]
    BadRequest { message: String },

    /// Upstream analysis call failed
    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    /// Generic internal service error
    #[error("Failed to {operation}")]
    Internal { operation: String },

    /// Unexpected error with full context chain
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::NoFileUploaded | Error::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Error::Upstream(_) | Error::Internal { .. } | Error::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns a user-safe error message, without leaking internal implementation details.
    ///
    /// Every server-side failure collapses to the same generic message; the specific
    /// upstream failure mode only ever appears in the logs.
    pub fn user_message(&self) -> String {
        match self {
            Error::NoFileUploaded => "No file uploaded".to_string(),
            Error::BadRequest { message } => message.clone(),
            Error::Upstream(_) | Error::Internal { .. } | Error::Other(_) => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        // Log full error details for debugging - different log levels based on severity
        match &self {
            Error::Upstream(_) | Error::Internal { .. } | Error::Other(_) => {
                tracing::error!("Internal service error: {:#}", self);
            }
            Error::NoFileUploaded | Error::BadRequest { .. } => {
                tracing::debug!("Client error: {}", self);
            }
        }

        let status = self.status_code();

        (status, Json(json!({ "error": self.user_message() }))).into_response()
    }
}

/// Type alias for service operation results
pub type Result<T> = std::result::Result<T, Error>;
