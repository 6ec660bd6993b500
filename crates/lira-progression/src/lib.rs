//! Lira Progression
//!
//! Turns applied changes into XP, levels and badges:
//! - [`level_of`]: pure XP → level curve
//! - [`badge::evaluate`]: idempotent badge awards
//! - [`ProgressionStore`]: serialized read-modify-write over a [`KeyValueStore`]
//!
//! # Example
//!
//! ```rust,ignore
//! use lira_progression::{EventKind, MemoryStore, ProgressionStore};
//! use std::sync::Arc;
//!
//! let store = ProgressionStore::new(Arc::new(MemoryStore::new()));
//! let state = store.apply_event(EventKind::ChangeApplied, 25, Default::default())?;
//! assert_eq!(state.xp, 25);
//! ```

#![warn(unreachable_pub)]

pub mod badge;
pub mod error;
pub mod kv;
pub mod level;
pub mod state;
pub mod store;

pub use badge::{Badge, BADGES};
pub use error::{ProgressionError, StoreError};
pub use kv::{FileStore, KeyValueStore, MemoryStore};
pub use level::{level_of, progress_percent, LevelInfo};
pub use state::{EventKind, HistoryEvent, ProgressionState, HISTORY_LIMIT};
pub use store::{ProgressionStore, DEFAULT_STATE_KEY, META_LINES};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
