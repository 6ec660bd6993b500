//! Logical project modules
//!
//! A module groups files under a root path and carries dashboard metadata
//! (status, priority, tags). Selecting a module selects its main file.

use crate::error::ModuleError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Default modules file name
pub const MODULES_FILE: &str = "modules.json";

/// Main file assumed when a module lists none
pub const DEFAULT_MAIN_FILE: &str = "main.py";

/// Module id used when a path carries no module segment
pub const UNKNOWN_MODULE: &str = "unknown";

/// A logical unit of work in the project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiraModule {
    pub id: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub module_type: String,
    pub root_path: String,
    #[serde(default)]
    pub main_files: Vec<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub status: ModuleStatus,
    #[serde(default)]
    pub priority: ModulePriority,
}

impl LiraModule {
    /// Path of the module's main file
    ///
    /// The first entry of `main_files` under `root_path`, or
    /// [`DEFAULT_MAIN_FILE`] when the list is empty.
    #[must_use]
    pub fn main_file(&self) -> String {
        let file = self
            .main_files
            .first()
            .map_or(DEFAULT_MAIN_FILE, String::as_str);
        let root = self.root_path.trim_end_matches('/');
        if root.is_empty() {
            file.to_string()
        } else {
            format!("{root}/{file}")
        }
    }

    /// Whether a project path falls under this module
    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        let root = self.root_path.trim_end_matches('/');
        !root.is_empty() && path.strip_prefix(root).is_some_and(|rest| rest.starts_with('/'))
    }
}

/// Development status shown on the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleStatus {
    Active,
    Developing,
    #[default]
    Inactive,
}

/// Work priority shown on the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModulePriority {
    High,
    #[default]
    Medium,
    Low,
}

/// Module id for a project path
///
/// Paths look like `root/module/...`; the second segment names the module.
#[must_use]
pub fn module_of_path(path: &str) -> &str {
    let mut parts = path.split('/');
    match (parts.next(), parts.next()) {
        (Some(_), Some(module)) if !module.is_empty() => module,
        _ => UNKNOWN_MODULE,
    }
}

/// Registry of modules, in declaration order
#[derive(Debug, Clone, Default)]
pub struct ModuleRegistry {
    modules: Vec<LiraModule>,
}

impl ModuleRegistry {
    /// Create a registry, rejecting duplicate ids
    ///
    /// # Errors
    /// Returns error if two modules share an id
    pub fn new(modules: Vec<LiraModule>) -> Result<Self, ModuleError> {
        let mut seen = HashSet::new();
        for module in &modules {
            if !seen.insert(module.id.as_str()) {
                return Err(ModuleError::DuplicateId(module.id.clone()));
            }
        }
        Ok(Self { modules })
    }

    /// Parse a JSON array of modules
    ///
    /// # Errors
    /// Returns error if the JSON is not a module list or ids repeat
    pub fn from_json(raw: &str) -> Result<Self, ModuleError> {
        Self::new(serde_json::from_str(raw)?)
    }

    /// Load a modules file; a missing file yields an empty registry
    ///
    /// # Errors
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: &Path) -> Result<Self, ModuleError> {
        match fs::read_to_string(path) {
            Ok(raw) => Self::from_json(&raw),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No modules file, registry empty");
                Ok(Self::default())
            }
            Err(e) => Err(ModuleError::Io {
                path: path.to_path_buf(),
                source: e,
            }),
        }
    }

    /// All modules
    #[inline]
    #[must_use]
    pub fn modules(&self) -> &[LiraModule] {
        &self.modules
    }

    /// Module by id
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&LiraModule> {
        self.modules.iter().find(|m| m.id == id)
    }

    /// Module owning a project path, if any
    #[must_use]
    pub fn owner_of(&self, path: &str) -> Option<&LiraModule> {
        self.modules.iter().find(|m| m.contains(path))
    }
}
