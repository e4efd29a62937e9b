//! Error types for the status store.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for status store operations.
pub type Result<T> = std::result::Result<T, StatusError>;

#[derive(Error, Debug)]
pub enum StatusError {
    /// Reading or writing a status document failed.
    #[error("Status I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A status document could not be encoded or decoded.
    #[error("Malformed status document at {path}: {source}")]
    Serialization {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The policy name cannot be used as a file name.
    #[error("Policy name '{name}' is not usable as a status key")]
    InvalidName { name: String },
}

impl StatusError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }

    pub fn serialization(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Serialization { path: path.into(), source }
    }

    pub fn invalid_name(name: impl Into<String>) -> Self {
        Self::InvalidName { name: name.into() }
    }
}
