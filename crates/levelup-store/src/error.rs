//! Store error types.

use thiserror::Error;

/// Errors from the remote progress API or the local cache.
///
/// These never leave `DualPathGateway` except as the cause of a failed
/// local write on `save`.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The remote call exceeded its time budget.
    #[error("request timed out after {0}ms")]
    Timeout(u64),

    /// A network error occurred.
    #[error("network error: {0}")]
    Network(String),

    /// Authentication failed (missing or invalid token).
    #[error("authentication failed: {0}")]
    Unauthorized(String),

    /// The API returned an error response.
    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// The API answered `success: false`.
    #[error("request rejected: {0}")]
    Rejected(String),

    /// The cause is part of the message, not `source()`.
    #[error("cache I/O error: {0}")]
    Io(std::io::Error),

    #[error("malformed payload: {0}")]
    Serialization(serde_json::Error),
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Io(e)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e)
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
