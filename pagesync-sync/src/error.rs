//! Error types for pagesync-sync.

use std::path::{Path, PathBuf};

use thiserror::Error;

use pagesync_core::ContentError;
use pagesync_store::StoreError;

/// Errors that abort a run (as opposed to per-item failures, which are
/// recorded in the batch result).
#[derive(Debug, Error)]
pub enum SyncError {
    /// Discovery failed before any item was processed.
    #[error("content error: {0}")]
    Content(#[from] ContentError),

    /// A store error outside per-item processing.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization error (fingerprints, reports).
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}

/// One asset could not be attached. Never fails the item it belongs to.
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("asset not found: {path}")]
    NotFound { path: PathBuf },

    /// An empty placeholder would match between every character of the body.
    #[error("asset {path} has an empty placeholder")]
    EmptyPlaceholder { path: PathBuf },

    #[error("failed to read asset {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to upload asset {path}: {source}")]
    Upload {
        path: PathBuf,
        #[source]
        source: StoreError,
    },
}

impl AssetError {
    /// The asset file this error is about.
    pub fn path(&self) -> &Path {
        match self {
            AssetError::NotFound { path }
            | AssetError::EmptyPlaceholder { path }
            | AssetError::Read { path, .. }
            | AssetError::Upload { path, .. } => path,
        }
    }
}

/// A create-or-update could not be committed.
#[derive(Debug, Error)]
pub enum UpsertError {
    #[error("lookup of slug '{slug}' failed: {source}")]
    Lookup {
        slug: String,
        #[source]
        source: StoreError,
    },

    #[error("fetching page {id} failed: {source}")]
    Fetch {
        id: u64,
        #[source]
        source: StoreError,
    },

    #[error("writing page '{slug}' failed: {source}")]
    Write {
        slug: String,
        #[source]
        source: StoreError,
    },
}
