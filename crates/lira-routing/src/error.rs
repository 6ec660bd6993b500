//! Error types for the catalog and module registry

use std::path::PathBuf;

/// Catalog errors
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// Path not present in the catalog
    #[error("file not in catalog: {0}")]
    NotFound(String),

    /// IO error while loading a project
    #[error("io error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// `project_map.json` is not a path → description object
    #[error("invalid project map {path}: {message}")]
    InvalidProjectMap { path: PathBuf, message: String },
}

impl CatalogError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Module registry errors
#[derive(Debug, thiserror::Error)]
pub enum ModuleError {
    /// IO error reading the modules file
    #[error("io error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Modules file is not a list of modules
    #[error("invalid modules file: {0}")]
    Invalid(#[from] serde_json::Error),

    /// Two modules share an id
    #[error("duplicate module id: {0}")]
    DuplicateId(String),
}
