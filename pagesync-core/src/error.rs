//! Error types for pagesync-core.

use std::path::PathBuf;

use thiserror::Error;

/// A content item is structurally incomplete.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required key is absent (or `null`).
    #[error("missing required field '{field}'")]
    MissingField { field: &'static str },

    /// A required identifying field is present but empty.
    #[error("required field '{field}' is empty")]
    EmptyField { field: &'static str },
}

impl ValidationError {
    /// Name of the offending field.
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::MissingField { field } | ValidationError::EmptyField { field } => {
                field
            }
        }
    }
}

/// A content file could not be read or parsed.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Includes file path and line/column context from serde_json.
    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// All errors that can arise from content loading and discovery.
#[derive(Debug, Error)]
pub enum ContentError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("invalid file pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("failed to scan content directory: {0}")]
    Walk(#[from] walkdir::Error),
}

/// Errors from loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(&'static str),
}
