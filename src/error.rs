//! Error types for the feeder gateway

use std::io;

use axum::Json;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

/// Result type alias for the feeder gateway
pub type Result<T> = std::result::Result<T, Error>;

/// Feeder gateway errors
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Missing or malformed input (code, range header, access token)
    #[error("{0}")]
    BadRequest(String),

    /// Resource already exists (username taken)
    #[error("{0}")]
    Conflict(String),

    /// Missing, invalid, or expired session credential
    #[error("Authentication required")]
    Unauthenticated,

    /// No matching account or folder
    #[error("{0}")]
    NotFound(String),

    /// Identity provider or object API failure
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Requested byte offset lies beyond the object size
    #[error("Range not satisfiable for object of {size} bytes")]
    RangeNotSatisfiable {
        /// Total size of the remote object
        size: u64,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// HTTP status this error maps to at the boundary
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::RangeNotSatisfiable { .. } => StatusCode::RANGE_NOT_SATISFIABLE,
            Self::Upstream(_)
            | Self::Config(_)
            | Self::Io(_)
            | Self::Json(_)
            | Self::Http(_)
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        // A range rejection carries the total size and no body, per RFC 9110.
        if let Self::RangeNotSatisfiable { size } = self {
            let mut response = StatusCode::RANGE_NOT_SATISFIABLE.into_response();
            if let Ok(value) = format!("bytes */{size}").parse() {
                response.headers_mut().insert(header::CONTENT_RANGE, value);
            }
            return response;
        }

        let status = self.status();
        if status.is_server_error() {
            // Raw upstream detail is logged here and never returned to the client.
            tracing::error!(error = %self, "Request failed");
        }
        let message = if status.is_server_error() {
            "Server error".to_string()
        } else {
            self.to_string()
        };
        (status, Json(json!({ "message": message }))).into_response()
    }
}
