//! Project file catalog
//!
//! The catalog is the router's and orchestrator's view of the project: an
//! ordered list of files with a description and current content. Content is
//! only replaced after a change has been approved and written.

use crate::error::CatalogError;
use crate::hash::ContentHash;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

/// Name of the metadata file mapping paths to descriptions
pub const PROJECT_MAP_FILE: &str = "project_map.json";

/// Broad role of a file in the project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    /// Assistant internals
    Core,
    /// Server-side code
    Backend,
    /// Client-side code and styles
    Frontend,
    /// Metadata and configuration
    Config,
}

impl FileKind {
    /// Infer the kind from a project-relative path
    #[must_use]
    pub fn infer(path: &str) -> Self {
        let top = path.split('/').next().unwrap_or_default();
        match top {
            "frontend" => Self::Frontend,
            "backend" => Self::Backend,
            "config" => Self::Config,
            _ if !path.contains('/') && is_config_extension(path) => Self::Config,
            _ => Self::Core,
        }
    }

    /// Lowercase name
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Core => "core",
            Self::Backend => "backend",
            Self::Frontend => "frontend",
            Self::Config => "config",
        }
    }
}

impl std::fmt::Display for FileKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn is_config_extension(path: &str) -> bool {
    [".json", ".toml", ".yaml", ".yml", ".ini"]
        .iter()
        .any(|ext| path.ends_with(ext))
}

/// A file known to the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// Project-relative path using `/` separators
    pub path: String,
    /// What the file is responsible for
    pub description: String,
    /// Current content
    pub content: String,
    /// Role in the project
    #[serde(rename = "type")]
    pub kind: FileKind,
}

impl FileEntry {
    /// Create a new entry
    #[must_use]
    pub fn new(
        path: impl Into<String>,
        description: impl Into<String>,
        content: impl Into<String>,
        kind: FileKind,
    ) -> Self {
        Self {
            path: path.into(),
            description: description.into(),
            content: content.into(),
            kind,
        }
    }

    /// File extension without the dot, lowercased
    #[must_use]
    pub fn extension(&self) -> Option<String> {
        extension_of(&self.path)
    }

    /// Hash of the current content
    #[inline]
    #[must_use]
    pub fn content_hash(&self) -> ContentHash {
        ContentHash::of_text(&self.content)
    }
}

/// Extension of a path without the dot, lowercased
#[must_use]
pub fn extension_of(path: &str) -> Option<String> {
    let name = path.rsplit('/').next().unwrap_or(path);
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Read/write access to the project's files
pub trait FileCatalog: Send + Sync {
    /// All files, in catalog order
    fn list_files(&self) -> Vec<FileEntry>;

    /// A single file by path
    fn get_file(&self, path: &str) -> Option<FileEntry>;

    /// Replace a file's content
    ///
    /// # Errors
    /// Returns error if the path is not in the catalog
    fn update_content(&self, path: &str, content: &str) -> Result<(), CatalogError>;
}

/// Catalog held in memory
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    files: RwLock<Vec<FileEntry>>,
}

impl InMemoryCatalog {
    /// Create a catalog from entries, keeping their order
    #[must_use]
    pub fn new(files: Vec<FileEntry>) -> Self {
        Self {
            files: RwLock::new(files),
        }
    }

    /// Load a project directory described by its `project_map.json`
    ///
    /// Every mapped path is read relative to `root`; a mapped file that does
    /// not exist yet is catalogued with empty content. The map file itself
    /// is catalogued last as a config entry.
    ///
    /// # Errors
    /// Returns error if the map is missing or malformed, or a mapped file
    /// cannot be read
    pub fn load_project(root: &Path) -> Result<Self, CatalogError> {
        let map_path = root.join(PROJECT_MAP_FILE);
        let raw = fs::read_to_string(&map_path).map_err(|e| CatalogError::io_error(&map_path, e))?;
        let map: BTreeMap<String, String> =
            serde_json::from_str(&raw).map_err(|e| CatalogError::InvalidProjectMap {
                path: map_path.clone(),
                message: e.to_string(),
            })?;

        let mut files = Vec::with_capacity(map.len() + 1);
        for (path, description) in map {
            if path == PROJECT_MAP_FILE {
                continue;
            }
            let disk_path = root.join(&path);
            let content = match fs::read_to_string(&disk_path) {
                Ok(content) => content,
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    tracing::warn!(path = %path, "Mapped file missing on disk, cataloguing empty");
                    String::new()
                }
                Err(e) => return Err(CatalogError::io_error(disk_path, e)),
            };
            let kind = FileKind::infer(&path);
            files.push(FileEntry::new(path, description, content, kind));
        }
        files.push(FileEntry::new(
            PROJECT_MAP_FILE,
            "Metadata listing the main project files",
            raw,
            FileKind::Config,
        ));

        tracing::debug!(root = %root.display(), files = files.len(), "Project catalog loaded");
        Ok(Self::new(files))
    }

    /// Description of a file, or `"Unknown file"`
    #[must_use]
    pub fn describe(&self, path: &str) -> String {
        self.get_file(path)
            .map_or_else(|| "Unknown file".to_string(), |f| f.description)
    }

    /// Number of files
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.read().len()
    }

    /// Whether the catalog is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.read().is_empty()
    }
}

impl FileCatalog for InMemoryCatalog {
    fn list_files(&self) -> Vec<FileEntry> {
        self.files.read().clone()
    }

    fn get_file(&self, path: &str) -> Option<FileEntry> {
        self.files.read().iter().find(|f| f.path == path).cloned()
    }

    fn update_content(&self, path: &str, content: &str) -> Result<(), CatalogError> {
        let mut files = self.files.write();
        let entry = files
            .iter_mut()
            .find(|f| f.path == path)
            .ok_or_else(|| CatalogError::NotFound(path.to_string()))?;
        entry.content = content.to_string();
        Ok(())
    }
}
