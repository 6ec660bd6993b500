//! Error types for progression tracking

use std::path::PathBuf;

/// Errors raised by a [`KeyValueStore`](crate::KeyValueStore)
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// IO failure on a file-backed store
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Key cannot be mapped onto the backend
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// Backend-specific failure
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Errors raised by [`ProgressionStore`](crate::ProgressionStore)
#[derive(Debug, thiserror::Error)]
pub enum ProgressionError {
    /// Reading or writing the persisted state failed
    #[error("persistence failed: {0}")]
    Store(#[from] StoreError),

    /// State could not be encoded
    #[error("state encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}

impl ProgressionError {
    /// Check if the failure came from the backend and may succeed later
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Store(StoreError::Io { .. } | StoreError::Unavailable(_)))
    }
}
