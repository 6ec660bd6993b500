//! Error types for Lira Core
//!
//! Provides error handling for:
//! - Workflow transitions
//! - File writes, backups and restores
//! - Configuration loading
//! - Applying an approved change

use crate::workflow::WorkflowStep;
use lira_progression::ProgressionError;
use lira_routing::{CatalogError, ContentHash, ModuleError};
use std::path::PathBuf;

/// Illegal workflow transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum WorkflowError {
    /// Transition not in the table
    #[error("illegal transition: {from} -> {to}")]
    IllegalTransition { from: WorkflowStep, to: WorkflowStep },
}

/// File writer errors
#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    /// IO error
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Path escapes the project root
    #[error("invalid project path: {0}")]
    InvalidPath(String),

    /// Backup does not belong to the file
    #[error("backup {backup} does not belong to {path}")]
    ForeignBackup { path: String, backup: PathBuf },

    /// Writer cannot perform this operation
    #[error("unsupported by this writer: {0}")]
    Unsupported(&'static str),
}

impl WriteError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file unreadable
    #[error("io error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for the schema
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Value out of range
    #[error("invalid config value: {0}")]
    Invalid(String),
}

/// Base content changed since the proposal was generated
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("content changed since proposal (expected {}, found {})", .expected.short(), .actual.short())]
pub struct StaleContent {
    /// Hash the proposal was based on
    pub expected: ContentHash,
    /// Hash of the current content
    pub actual: ContentHash,
}

/// Step of `apply` that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyStep {
    /// Checking the base content
    Verify,
    /// Writing the file
    Write,
    /// Updating the catalog
    Catalog,
    /// Recording progression
    Progression,
}

impl std::fmt::Display for ApplyStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Verify => "verify",
            Self::Write => "write",
            Self::Catalog => "catalog",
            Self::Progression => "progression",
        };
        f.write_str(name)
    }
}

/// Main Lira error type
#[derive(Debug, thiserror::Error)]
pub enum LiraError {
    /// Workflow transition refused
    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    /// Goal is empty
    #[error("goal is empty")]
    EmptyGoal,

    /// Target path not in the catalog
    #[error("no catalogued file for {0}")]
    NoTarget(String),

    /// Selection changes are only allowed while composing a request
    #[error("cannot change selection while in {0}")]
    Busy(WorkflowStep),

    /// Generation was superseded or cancelled
    #[error("generation cancelled")]
    Cancelled,

    /// Generator returned no usable content
    #[error("generation failed: {0}")]
    GenerationFailed(String),

    /// Applying an approved change failed; the workflow stays approved
    #[error("apply failed at {step} for {path}: {source}")]
    ApplyFailed {
        step: ApplyStep,
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },

    /// File writer error outside `apply`
    #[error("write error: {0}")]
    Write(#[from] WriteError),

    /// Catalog error outside `apply`
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Module registry error
    #[error("module error: {0}")]
    Module(#[from] ModuleError),

    /// Progression error outside `apply`
    #[error("progression error: {0}")]
    Progression(#[from] ProgressionError),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl LiraError {
    /// Wrap a failure of one `apply` step
    pub fn apply_failed(
        step: ApplyStep,
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::ApplyFailed {
            step,
            path: path.into(),
            source: Box::new(source),
        }
    }

    /// Check if this is an `apply` failure
    #[inline]
    #[must_use]
    pub fn is_apply_failure(&self) -> bool {
        matches!(self, Self::ApplyFailed { .. })
    }

    /// Check if `apply` refused a proposal whose base content changed
    #[must_use]
    pub fn is_stale(&self) -> bool {
        matches!(
            self,
            Self::ApplyFailed {
                step: ApplyStep::Verify,
                source,
                ..
            } if source.is::<StaleContent>()
        )
    }

    /// Check if retrying the same call could succeed
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ApplyFailed { step, .. } => !matches!(step, ApplyStep::Verify),
            Self::Progression(e) => e.is_retryable(),
            _ => false,
        }
    }
}
