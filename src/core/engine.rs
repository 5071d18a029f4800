//! File update engine: copy-on-write apply with a bounded per-file backup history.
//!
//! The engine never touches disk. It reads the caller's current file mapping,
//! hands a fully replaced mapping to the caller's setter, and keeps the
//! overwritten content in memory so any recent change can be rolled back by
//! its change id. History is capped per file (oldest evicted first) and lives
//! as long as the engine instance.

use std::collections::VecDeque;

use chrono::Utc;
use indexmap::IndexMap;
use tracing::{debug, info, instrument, warn};

use crate::core::{
    model::{BackupEntry, FileMap, FileUpdateResult, generate_change_id},
    validate::{ValidationReport, validate_code},
};

/// Default number of backups retained per file.
pub const DEFAULT_BACKUP_LIMIT: usize = 10;

/// Source of the current project mapping plus its setter.
pub trait ProjectFiles {
    fn files(&self) -> &FileMap;

    /// Replace the whole mapping. Implementations may fail (e.g. a disk write).
    fn set_files(&mut self, files: FileMap) -> anyhow::Result<()>;

    /// Make sure `filename` is in the mapping if it exists in the backing
    /// store, so an overwrite sees (and backs up) its real content. Errors
    /// when the existing content cannot be represented.
    fn resolve(&mut self, _filename: &str) -> anyhow::Result<()> {
        Ok(())
    }
}

/// A bare mapping is its own project.
impl ProjectFiles for FileMap {
    fn files(&self) -> &FileMap {
        self
    }

    fn set_files(&mut self, files: FileMap) -> anyhow::Result<()> {
        *self = files;
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum UpdateError {
    #[error("failed to update project files: {0}")]
    SetFiles(#[source] anyhow::Error),
    #[error("No backups found for {filename}")]
    NoBackups { filename: String },
    #[error("Backup with ID {change_id} not found for {filename}")]
    BackupNotFound { filename: String, change_id: String },
}

/// In-memory apply/rollback engine. Construct one per editor session.
#[derive(Debug)]
pub struct FileUpdateEngine {
    backups: IndexMap<String, VecDeque<BackupEntry>>,
    backup_limit: usize,
}

impl Default for FileUpdateEngine {
    fn default() -> Self {
        Self {
            backups: IndexMap::new(),
            backup_limit: DEFAULT_BACKUP_LIMIT,
        }
    }
}

impl FileUpdateEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_backup_limit(mut self, limit: usize) -> Self {
        self.backup_limit = limit;
        self
    }

    pub fn backup_limit(&self) -> usize {
        self.backup_limit
    }

    /// Write `new_content` to `filename` through `set_files`.
    ///
    /// Existing content is recorded as a backup once the setter succeeds.
    /// Never returns `Err`; failures land in `FileUpdateResult::error`.
    #[instrument(level = "debug", skip(self, new_content, current_files, set_files))]
    pub async fn apply_file_change<S>(
        &mut self,
        filename: &str,
        new_content: &str,
        current_files: &FileMap,
        set_files: S,
    ) -> FileUpdateResult
    where
        S: FnMut(FileMap) -> anyhow::Result<()>,
    {
        match self.try_apply(filename, new_content, current_files, set_files) {
            Ok(backup) => {
                info!(filename, backed_up = backup.is_some(), "applied change");
                FileUpdateResult::ok(filename, backup)
            }
            Err(e) => {
                warn!(filename, error = %format!("{e:#}"), "apply failed");
                FileUpdateResult::failed(filename, e.to_string())
            }
        }
    }

    fn try_apply<S>(
        &mut self,
        filename: &str,
        new_content: &str,
        current_files: &FileMap,
        mut set_files: S,
    ) -> Result<Option<BackupEntry>, UpdateError>
    where
        S: FnMut(FileMap) -> anyhow::Result<()>,
    {
        let original = current_files.get(filename).cloned();

        let mut updated = current_files.clone();
        updated.insert(filename.to_string(), new_content.to_string());
        set_files(updated).map_err(UpdateError::SetFiles)?;

        // True creations have nothing to restore.
        let Some(original_content) = original else {
            return Ok(None);
        };

        let backup = BackupEntry {
            filename: filename.to_string(),
            original_content,
            timestamp: Utc::now(),
            change_id: generate_change_id(),
        };
        self.record(backup.clone());
        Ok(Some(backup))
    }

    fn record(&mut self, backup: BackupEntry) {
        let list = self
            .backups
            .entry(backup.filename.clone())
            .or_default();
        list.push_back(backup);

        while list.len() > self.backup_limit {
            if let Some(evicted) = list.pop_front() {
                debug!(
                    filename = %evicted.filename,
                    change_id = %evicted.change_id,
                    "evicted oldest backup"
                );
            }
        }
    }

    /// Restore the content captured under `change_id`. The backup is kept.
    #[instrument(level = "debug", skip(self, current_files, set_files))]
    pub async fn rollback_file<S>(
        &mut self,
        filename: &str,
        change_id: &str,
        current_files: &FileMap,
        set_files: S,
    ) -> FileUpdateResult
    where
        S: FnMut(FileMap) -> anyhow::Result<()>,
    {
        match self.try_rollback(filename, change_id, current_files, set_files) {
            Ok(()) => {
                info!(filename, change_id, "rolled back");
                FileUpdateResult::ok(filename, None)
            }
            Err(e) => {
                warn!(filename, change_id, error = %e, "rollback failed");
                FileUpdateResult::failed(filename, e.to_string())
            }
        }
    }

    fn try_rollback<S>(
        &self,
        filename: &str,
        change_id: &str,
        current_files: &FileMap,
        mut set_files: S,
    ) -> Result<(), UpdateError>
    where
        S: FnMut(FileMap) -> anyhow::Result<()>,
    {
        let list = self
            .backups
            .get(filename)
            .ok_or_else(|| UpdateError::NoBackups {
                filename: filename.to_string(),
            })?;

        let backup = list
            .iter()
            .find(|b| b.change_id == change_id)
            .ok_or_else(|| UpdateError::BackupNotFound {
                filename: filename.to_string(),
                change_id: change_id.to_string(),
            })?;

        let mut updated = current_files.clone();
        updated.insert(filename.to_string(), backup.original_content.clone());
        set_files(updated).map_err(UpdateError::SetFiles)
    }

    /// Backups for one file, oldest first.
    pub fn get_file_backups(&self, filename: &str) -> Vec<BackupEntry> {
        self.backups
            .get(filename)
            .map(|l| l.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn get_all_backups(&self) -> IndexMap<String, Vec<BackupEntry>> {
        self.backups
            .iter()
            .map(|(k, v)| (k.clone(), v.iter().cloned().collect()))
            .collect()
    }

    /// Most recent backup for a file, if any.
    pub fn latest_backup(&self, filename: &str) -> Option<&BackupEntry> {
        self.backups
            .get(filename)
            .and_then(|l| l.back())
    }

    /// Drop one file's history, or everything when `filename` is `None`.
    pub fn clear_backups(&mut self, filename: Option<&str>) {
        match filename {
            Some(f) => {
                self.backups.shift_remove(f);
            }
            None => self.backups.clear(),
        }
    }

    pub fn validate_code(&self, code: &str, filename: &str) -> ValidationReport {
        validate_code(code, filename)
    }
}
