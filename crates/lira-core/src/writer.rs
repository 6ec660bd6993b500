//! File writes with backups
//!
//! [`FsFileWriter`] copies the current file to
//! `<backup_dir>/<dir>/<name>.bak.<timestamp>` before replacing it, so every
//! applied change can be rolled back. [`DryRunWriter`] only logs.

use crate::error::WriteError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

/// Where a backup was written
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupLocator {
    /// Backup file on disk
    pub path: PathBuf,
    /// When the backup was taken
    pub created_at: DateTime<Utc>,
}

impl std::fmt::Display for BackupLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

/// Writes approved content to the project
///
/// Writes are not idempotent: callers must not retry a write that may have
/// happened.
#[cfg_attr(test, mockall::automock)]
pub trait FileWriter: Send + Sync {
    /// Replace a file's content, backing up the old content first
    ///
    /// Returns the backup, or `None` if there was nothing to back up.
    ///
    /// # Errors
    /// Returns error if the backup or the write fails
    fn write(&self, path: &str, content: &str) -> Result<Option<BackupLocator>, WriteError>;

    /// Restore a file from one of its backups, returning the restored content
    ///
    /// # Errors
    /// Returns error if the backup is unreadable or belongs to another file
    fn restore(&self, path: &str, backup: &BackupLocator) -> Result<String, WriteError>;

    /// Backups of a file, newest first
    ///
    /// # Errors
    /// Returns error if the backup directory exists but cannot be read
    fn list_backups(&self, path: &str) -> Result<Vec<BackupLocator>, WriteError>;
}

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H-%M-%S-%3fZ";

/// Writer over a project directory
#[derive(Debug, Clone)]
pub struct FsFileWriter {
    root: PathBuf,
    backup_dir: PathBuf,
}

impl FsFileWriter {
    /// Create a writer for `root`, keeping backups under `backup_dir`
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, backup_dir: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            backup_dir: backup_dir.into(),
        }
    }

    /// Project root
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn target(&self, path: &str) -> Result<PathBuf, WriteError> {
        let rel = Path::new(path);
        let safe = !path.is_empty()
            && rel
                .components()
                .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if !safe {
            return Err(WriteError::InvalidPath(path.to_string()));
        }
        Ok(self.root.join(rel))
    }

    /// Backup directory and file-name prefix for a project path
    fn backup_slot(&self, path: &str) -> Result<(PathBuf, String), WriteError> {
        self.target(path)?;
        let rel = Path::new(path);
        let name = rel
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| WriteError::InvalidPath(path.to_string()))?;
        let dir = match rel.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => self.backup_dir.join(parent),
            _ => self.backup_dir.clone(),
        };
        Ok((dir, format!("{name}.bak.")))
    }

    fn create_backup(&self, path: &str, content: &str) -> Result<BackupLocator, WriteError> {
        let (dir, prefix) = self.backup_slot(path)?;
        fs::create_dir_all(&dir).map_err(|e| WriteError::io_error(&dir, e))?;

        let created_at = Utc::now();
        let stamp = created_at.format(TIMESTAMP_FORMAT).to_string();
        let mut backup = dir.join(format!("{prefix}{stamp}"));
        let mut n = 1;
        while backup.exists() {
            backup = dir.join(format!("{prefix}{stamp}-{n}"));
            n += 1;
        }

        fs::write(&backup, content).map_err(|e| WriteError::io_error(&backup, e))?;
        Ok(BackupLocator {
            path: backup,
            created_at,
        })
    }
}

fn write_atomic(target: &Path, content: &str) -> Result<(), WriteError> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(|e| WriteError::io_error(parent, e))?;
    }
    let mut tmp = target.as_os_str().to_owned();
    tmp.push(".lira-tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, content).map_err(|e| WriteError::io_error(&tmp, e))?;
    fs::rename(&tmp, target).map_err(|e| WriteError::io_error(target, e))
}

impl FileWriter for FsFileWriter {
    fn write(&self, path: &str, content: &str) -> Result<Option<BackupLocator>, WriteError> {
        let target = self.target(path)?;

        let backup = match fs::read_to_string(&target) {
            Ok(old) => Some(self.create_backup(path, &old)?),
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => return Err(WriteError::io_error(&target, e)),
        };

        write_atomic(&target, content)?;
        tracing::info!(
            path,
            backup = ?backup.as_ref().map(|b| b.path.display().to_string()),
            "File updated"
        );
        Ok(backup)
    }

    fn restore(&self, path: &str, backup: &BackupLocator) -> Result<String, WriteError> {
        let (dir, prefix) = self.backup_slot(path)?;
        let belongs = backup.path.parent() == Some(dir.as_path())
            && backup
                .path
                .file_name()
                .is_some_and(|n| n.to_string_lossy().starts_with(&prefix));
        if !belongs {
            return Err(WriteError::ForeignBackup {
                path: path.to_string(),
                backup: backup.path.clone(),
            });
        }

        let content =
            fs::read_to_string(&backup.path).map_err(|e| WriteError::io_error(&backup.path, e))?;
        write_atomic(&self.target(path)?, &content)?;
        tracing::info!(path, backup = %backup, "File restored from backup");
        Ok(content)
    }

    fn list_backups(&self, path: &str) -> Result<Vec<BackupLocator>, WriteError> {
        let (dir, prefix) = self.backup_slot(path)?;
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(WriteError::io_error(&dir, e)),
        };

        let mut names: Vec<String> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .filter(|name| name.starts_with(&prefix))
            .collect();
        names.sort_unstable_by(|a, b| b.cmp(a));

        Ok(names
            .into_iter()
            .map(|name| {
                let created_at = parse_stamp(&name[prefix.len()..]).unwrap_or_default();
                BackupLocator {
                    path: dir.join(name),
                    created_at,
                }
            })
            .collect())
    }
}

fn parse_stamp(suffix: &str) -> Option<DateTime<Utc>> {
    // Stamps are fixed-width; a `-N` collision counter may follow
    let stamp = suffix.get(..24)?;
    chrono::NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

/// Writer that changes nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunWriter;

impl FileWriter for DryRunWriter {
    fn write(&self, path: &str, content: &str) -> Result<Option<BackupLocator>, WriteError> {
        tracing::info!(path, bytes = content.len(), "[dry-run] Skipping file write");
        Ok(None)
    }

    fn restore(&self, _path: &str, _backup: &BackupLocator) -> Result<String, WriteError> {
        Err(WriteError::Unsupported("restore in dry-run mode"))
    }

    fn list_backups(&self, _path: &str) -> Result<Vec<BackupLocator>, WriteError> {
        Ok(Vec::new())
    }
}
