//! Lira Routing
//!
//! The project view shared by the assistant:
//! - [`FileCatalog`]: ordered project files with descriptions and content
//! - [`ModuleRegistry`]: logical modules and their main files
//! - [`IntentRouter`]: keyword rules mapping a request to one file
//!
//! # Example
//!
//! ```rust,ignore
//! use lira_routing::{FileCatalog, InMemoryCatalog, IntentRouter};
//!
//! let catalog = InMemoryCatalog::load_project(std::path::Path::new("."))?;
//! let result = IntentRouter::new().route_in("mude a cor do botão", &catalog);
//! println!("{} ({:.2})", result.target_path, result.confidence);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod catalog;
pub mod error;
pub mod hash;
pub mod module;
pub mod router;

pub use catalog::{extension_of, FileCatalog, FileEntry, FileKind, InMemoryCatalog, PROJECT_MAP_FILE};
pub use error::{CatalogError, ModuleError};
pub use hash::{ContentHash, HashError};
pub use module::{
    module_of_path, LiraModule, ModulePriority, ModuleRegistry, ModuleStatus, MODULES_FILE,
    UNKNOWN_MODULE,
};
pub use router::{
    IntentRouter, Keyword, RouteIntent, RoutingResult, RoutingRule, DEFAULT_CONFIDENCE,
    DEFAULT_TARGET, ROUTING_RULES,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
