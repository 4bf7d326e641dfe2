//! Error types for pagesync-store.

use thiserror::Error;

/// Any failure talking to the remote content store.
///
/// Timeouts surface as [`StoreError::Transport`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The request never produced an HTTP response.
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    /// The store answered with an unexpected status code.
    #[error("{url} returned HTTP {code}: {body}")]
    Status { url: String, code: u16, body: String },

    /// The response body was not the expected shape.
    #[error("unexpected response from {url}: {message}")]
    Decode { url: String, message: String },

    /// The credentials were rejected or the store could not be reached.
    #[error("cannot connect to content store at {0}")]
    Connectivity(String),
}

impl StoreError {
    /// HTTP status code, when the store answered at all.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            StoreError::Status { code, .. } => Some(*code),
            _ => None,
        }
    }
}
