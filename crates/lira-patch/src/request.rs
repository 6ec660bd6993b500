//! Generation request and result types

use lira_routing::{extension_of, FileEntry, FileKind};
use serde::{Deserialize, Serialize};

/// A request to rewrite one file toward a goal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRequest {
    /// Project-relative path of the target
    pub file_path: String,
    /// Content the change is based on
    pub current_content: String,
    /// Free-text goal
    pub goal: String,
    /// Ask for an explanation alongside the code
    pub learning_mode: bool,
    /// Role of the target, when known
    pub kind: Option<FileKind>,
    /// Catalog description of the target, when known
    pub description: Option<String>,
}

impl ChangeRequest {
    /// Create a request with learning mode off
    #[must_use]
    pub fn new(
        file_path: impl Into<String>,
        current_content: impl Into<String>,
        goal: impl Into<String>,
    ) -> Self {
        Self {
            file_path: file_path.into(),
            current_content: current_content.into(),
            goal: goal.into(),
            learning_mode: false,
            kind: None,
            description: None,
        }
    }

    /// Create a request for a catalogued file
    #[must_use]
    pub fn for_file(file: &FileEntry, goal: impl Into<String>) -> Self {
        Self::new(&file.path, &file.content, goal)
            .with_kind(file.kind)
            .with_description(&file.description)
    }

    /// Set learning mode
    #[inline]
    #[must_use]
    pub fn with_learning_mode(mut self, learning_mode: bool) -> Self {
        self.learning_mode = learning_mode;
        self
    }

    /// Set the file kind
    #[inline]
    #[must_use]
    pub fn with_kind(mut self, kind: FileKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Set the file description
    #[inline]
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Lowercased extension of the target path
    #[must_use]
    pub fn extension(&self) -> Option<String> {
        extension_of(&self.file_path)
    }

    /// Whether the goal mentions a phrase, ignoring case
    #[must_use]
    pub fn goal_mentions(&self, phrase: &str) -> bool {
        self.goal.to_lowercase().contains(phrase)
    }
}

/// Which path produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationSource {
    /// Remote model
    Remote,
    /// Local deterministic rewrite
    Fallback,
}

impl std::fmt::Display for GenerationSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Remote => f.write_str("remote"),
            Self::Fallback => f.write_str("fallback"),
        }
    }
}

/// Proposed new content for a file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeResult {
    /// Full proposed content
    pub updated_content: String,
    /// What changed, when available
    pub explanation: Option<String>,
    /// Caveats the reviewer should see
    pub warnings: Vec<String>,
    /// Whether generation produced content
    pub success: bool,
    /// Path that produced the content
    pub source: GenerationSource,
}

impl ChangeResult {
    /// Whether the local fallback produced this result
    #[inline]
    #[must_use]
    pub fn is_fallback(&self) -> bool {
        self.source == GenerationSource::Fallback
    }

    /// Whether the content differs from the base
    #[must_use]
    pub fn changes(&self, base: &str) -> bool {
        self.updated_content != base
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn for_file_copies_catalog_fields() {
        let file = FileEntry::new("backend/server.py", "HTTP routes", "app = 1", FileKind::Backend);
        let req = ChangeRequest::for_file(&file, "Add Error Handling").with_learning_mode(true);

        assert_eq!(req.current_content, "app = 1");
        assert_eq!(req.kind, Some(FileKind::Backend));
        assert_eq!(req.description.as_deref(), Some("HTTP routes"));
        assert_eq!(req.extension().as_deref(), Some("py"));
        assert!(req.goal_mentions("error handling"));
        assert!(req.learning_mode);
    }

    #[test]
    fn source_serializes_lowercase() {
        assert_eq!(serde_json::to_value(GenerationSource::Fallback).unwrap(), "fallback");
    }
}
