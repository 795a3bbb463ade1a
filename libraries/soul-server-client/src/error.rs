//! Error types for the Soul Server client.

use soul_core::SoulError;
use thiserror::Error;

/// Errors that can occur when talking to the library API.
#[derive(Error, Debug)]
pub enum ServerClientError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Server returned an error response
    #[error("Server error ({status}): {message}")]
    ServerError { status: u16, message: String },

    /// Authentication required or the token was rejected
    #[error("Authentication required")]
    AuthRequired,

    /// Invalid server URL
    #[error("Invalid server URL: {0}")]
    InvalidUrl(String),

    /// Failed to parse server response
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Server is offline or unreachable
    #[error("Server unreachable: {0}")]
    ServerUnreachable(String),
}

impl From<ServerClientError> for SoulError {
    fn from(err: ServerClientError) -> Self {
        match err {
            ServerClientError::AuthRequired => SoulError::PermissionDenied(err.to_string()),
            ServerClientError::ServerUnreachable(_) => SoulError::network(err.to_string()),
            ServerClientError::ServerError { status: 404, .. } => {
                SoulError::not_found("Source", err.to_string())
            }
            other => SoulError::catalog(other.to_string()),
        }
    }
}

/// Result type for server client operations.
pub type Result<T> = std::result::Result<T, ServerClientError>;
