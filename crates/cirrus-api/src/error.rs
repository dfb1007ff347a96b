//! Error types for cirrus-api

use thiserror::Error;

/// Result type alias using cirrus-api Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when talking to the agent backend
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request failed (connect, send, or body read)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Backend answered with a non-success status
    #[error("HTTP status {status}: {body}")]
    Status { status: u16, body: String },

    /// Event stream framing failed
    #[error("SSE error: {0}")]
    Sse(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Create a status error from a code and response body
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self::Status {
            status,
            body: body.into(),
        }
    }

    /// Whether this error ends a session early (connection, status, or read failure).
    ///
    /// Configuration mistakes never count as transport failures.
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Http(_) | Error::Status { .. } | Error::Sse(_))
    }
}
