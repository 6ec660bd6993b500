//! Lira Patch
//!
//! Turns a [`ChangeRequest`] into a proposed [`ChangeResult`]:
//! - remote path through any [`RemoteGenerator`] ([`GeminiClient`] over HTTP),
//!   bounded by a deadline
//! - deterministic textual fallback when the remote path is absent or fails
//! - learning-mode explanations from a small knowledge base
//!
//! Generation has no side effects; nothing here writes files.
//!
//! # Example
//!
//! ```rust,ignore
//! use lira_patch::{ChangeRequest, PatchConfig, PatchGenerator};
//!
//! let generator = PatchGenerator::new(PatchConfig::default());
//! let request = ChangeRequest::new("backend/server.py", "def run():\n    pass", "add error handling");
//! let result = generator.generate(&request).await;
//! assert!(result.is_fallback());
//! ```

#![warn(unreachable_pub)]

pub mod error;
pub mod fallback;
pub mod generator;
pub mod prompt;
pub mod remote;
pub mod request;
pub mod tips;

pub use error::RemoteError;
pub use fallback::{FALLBACK_WARNING, LEARNING_WARNING};
pub use generator::{PatchConfig, PatchGenerator};
pub use prompt::{build_prompt, strip_fences, Envelope};
pub use remote::{GeminiClient, RemoteConfig, RemoteGenerator};
pub use request::{ChangeRequest, ChangeResult, GenerationSource};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
