//! Lira Core
//!
//! Ties routing, patch generation and progression into one reviewed
//! workflow:
//! - [`ChangeOrchestrator`] moves a request through
//!   `Input -> Review -> Approved -> Applied`
//! - [`FileWriter`] performs the only file mutation, with backups
//! - [`LiraConfig`] loads workspace settings from `lira.toml`
//!
//! # Example
//!
//! ```rust,ignore
//! use lira_core::{ChangeOrchestrator, FsFileWriter};
//!
//! let proposal = orchestrator.generate("mude a cor do botão", false).await?;
//! orchestrator.approve()?;
//! let applied = orchestrator.apply()?;
//! println!("{} -> {} XP", applied.file_path, applied.state.xp);
//! ```

#![warn(unreachable_pub)]

pub mod config;
pub mod error;
pub mod orchestrator;
pub mod workflow;
pub mod writer;

pub use config::{LiraConfig, API_KEY_ENV, CONFIG_FILE, DEFAULT_XP_PER_CHANGE};
pub use error::{ApplyStep, ConfigError, LiraError, StaleContent, WorkflowError, WriteError};
pub use orchestrator::{AppliedChange, ChangeOrchestrator, ProgressionObserver, Proposal, Selection};
pub use workflow::{allowed_transitions, validate_transition, WorkflowStep};
pub use writer::{BackupLocator, DryRunWriter, FileWriter, FsFileWriter};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
