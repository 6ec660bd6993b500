//! Workspace configuration
//!
//! Loaded from an optional TOML file. Relative directories resolve against
//! the project root. The API key may come from `LIRA_API_KEY` instead of the
//! file.

use crate::error::ConfigError;
use lira_patch::{PatchConfig, RemoteConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable overriding `remote.api_key`
pub const API_KEY_ENV: &str = "LIRA_API_KEY";

/// Default config file name, looked up in the project root
pub const CONFIG_FILE: &str = "lira.toml";

/// XP awarded for one applied change
pub const DEFAULT_XP_PER_CHANGE: u64 = 25;

/// Lira configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiraConfig {
    /// Project directory holding `project_map.json`
    pub project_root: PathBuf,
    /// Where backups are written
    pub backup_dir: PathBuf,
    /// Where progression state is kept
    pub state_dir: PathBuf,
    /// Optional modules file
    pub modules_file: PathBuf,
    /// XP per applied change
    pub xp_per_change: u64,
    /// Learning mode unless overridden per request
    pub learning_mode: bool,
    /// Remote model; disabled without an API key
    pub remote: Option<RemoteConfig>,
}

impl Default for LiraConfig {
    fn default() -> Self {
        Self {
            project_root: PathBuf::from("."),
            backup_dir: PathBuf::from("backups"),
            state_dir: PathBuf::from(".lira"),
            modules_file: PathBuf::from(lira_routing::MODULES_FILE),
            xp_per_change: DEFAULT_XP_PER_CHANGE,
            learning_mode: false,
            remote: None,
        }
    }
}

impl LiraConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With project root
    #[inline]
    #[must_use]
    pub fn with_project_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.project_root = root.into();
        self
    }

    /// With XP per change
    #[inline]
    #[must_use]
    pub fn with_xp_per_change(mut self, xp: u64) -> Self {
        self.xp_per_change = xp;
        self
    }

    /// With learning mode default
    #[inline]
    #[must_use]
    pub fn with_learning_mode(mut self, learning_mode: bool) -> Self {
        self.learning_mode = learning_mode;
        self
    }

    /// With remote settings
    #[inline]
    #[must_use]
    pub fn with_remote(mut self, remote: RemoteConfig) -> Self {
        self.remote = Some(remote);
        self
    }

    /// Parse TOML
    ///
    /// # Errors
    /// Returns error if the text is not valid TOML for the schema or a value
    /// is out of range
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a TOML file; a missing file yields defaults
    ///
    /// # Errors
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match fs::read_to_string(path) {
            Ok(raw) => {
                tracing::debug!(path = %path.display(), "Loading configuration");
                Self::from_toml_str(&raw)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            }),
        }
    }

    /// Apply an API key from the environment, if one is given
    ///
    /// A key creates a default remote section when the file had none.
    #[must_use]
    pub fn with_api_key_override(mut self, key: Option<String>) -> Self {
        if let Some(key) = key.filter(|k| !k.trim().is_empty()) {
            let remote = self.remote.take().unwrap_or_default();
            self.remote = Some(remote.with_api_key(key));
        }
        self
    }

    /// Apply [`API_KEY_ENV`] from the process environment
    #[must_use]
    pub fn with_env(self) -> Self {
        self.with_api_key_override(std::env::var(API_KEY_ENV).ok())
    }

    /// Check value ranges
    ///
    /// # Errors
    /// Returns error if a remote timeout of zero is configured
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(remote) = &self.remote {
            if remote.timeout_secs == 0 {
                return Err(ConfigError::Invalid("remote.timeout_secs must be positive".to_string()));
            }
        }
        Ok(())
    }

    /// Remote settings, only when an API key is present
    #[must_use]
    pub fn enabled_remote(&self) -> Option<&RemoteConfig> {
        self.remote.as_ref().filter(|r| r.is_enabled())
    }

    /// Generator settings derived from the remote section
    #[must_use]
    pub fn patch_config(&self) -> PatchConfig {
        match &self.remote {
            Some(remote) => PatchConfig::default().with_timeout(remote.timeout()),
            None => PatchConfig::default(),
        }
    }

    /// Backup directory resolved against the project root
    #[must_use]
    pub fn backup_path(&self) -> PathBuf {
        self.resolve(&self.backup_dir)
    }

    /// State directory resolved against the project root
    #[must_use]
    pub fn state_path(&self) -> PathBuf {
        self.resolve(&self.state_dir)
    }

    /// Modules file resolved against the project root
    #[must_use]
    pub fn modules_path(&self) -> PathBuf {
        self.resolve(&self.modules_file)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_root.join(path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    #[test]
    fn defaults() {
        let config = LiraConfig::default();
        assert_eq!(config.xp_per_change, 25);
        assert!(config.enabled_remote().is_none());
        assert_eq!(config.backup_path(), PathBuf::from("./backups"));
    }

    #[test]
    fn parses_partial_toml() {
        let config = LiraConfig::from_toml_str(
            r#"
            project_root = "/srv/lira"
            learning_mode = true

            [remote]
            model = "gemini-pro"
            timeout_secs = 10
            "#,
        )
        .unwrap();

        assert_eq!(config.project_root, PathBuf::from("/srv/lira"));
        assert!(config.learning_mode);
        assert_eq!(config.state_path(), PathBuf::from("/srv/lira/.lira"));

        let remote = config.remote.as_ref().unwrap();
        assert_eq!(remote.model, "gemini-pro");
        assert_eq!(remote.temperature, 0.7);
        // No key yet
        assert!(config.enabled_remote().is_none());
        assert_eq!(config.patch_config().timeout, Duration::from_secs(10));
    }

    #[test]
    fn env_key_enables_remote() {
        let config = LiraConfig::default().with_api_key_override(Some("secret".to_string()));
        let remote = config.enabled_remote().unwrap();
        assert_eq!(remote.api_key.as_deref(), Some("secret"));
        assert_eq!(remote.timeout_secs, 20);

        let unchanged = LiraConfig::default().with_api_key_override(Some("  ".to_string()));
        assert!(unchanged.remote.is_none());
    }

    #[test]
    fn zero_timeout_rejected() {
        let err = LiraConfig::from_toml_str("[remote]\ntimeout_secs = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn bad_toml_rejected() {
        assert!(matches!(
            LiraConfig::from_toml_str("xp_per_change = \"lots\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = LiraConfig::load(&dir.path().join(CONFIG_FILE)).unwrap();
        assert_eq!(config, LiraConfig::default());
    }
}
