//! Shared data model for parsed AI responses, staged changes and backups.
//!
//! Everything here is plain data. Parsing produces `ParsedChanges`, the
//! stager tracks `FileStatus`, and the update engine hands out
//! `BackupEntry` / `FileUpdateResult` values.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Project file mapping: filename -> content.
pub type FileMap = BTreeMap<String, String>;

/// One fenced code region lifted out of a response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeBlock {
    pub id: String,
    pub language: String,
    pub code: String,
    pub filename: Option<String>,
    pub start_line: Option<usize>, // 1-based, first body line
    pub end_line: Option<usize>,   // 1-based, last body line
}

/// What a `FileChange` does to its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileAction {
    Create,
    Update,
    Delete,
}

impl FileAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileAction::Create => "create",
            FileAction::Update => "update",
            FileAction::Delete => "delete",
        }
    }
}

impl std::fmt::Display for FileAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// All edits a response proposes for a single file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileChange {
    pub filename: String,
    pub action: FileAction,
    pub original_code: Option<String>,
    pub new_code: String,
    pub code_blocks: Vec<CodeBlock>,
}

impl FileChange {
    /// Language of the first contributing block, used for previews.
    pub fn language(&self) -> &str {
        self.code_blocks
            .first()
            .map(|b| b.language.as_str())
            .unwrap_or("javascript")
    }
}

/// Result of parsing one AI response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedChanges {
    pub has_changes: bool,
    pub file_changes: Vec<FileChange>,
    pub description: Option<String>,
}

impl ParsedChanges {
    pub fn find(&self, filename: &str) -> Option<&FileChange> {
        self.file_changes
            .iter()
            .find(|c| c.filename == filename)
    }

    pub fn filenames(&self) -> impl Iterator<Item = &str> {
        self.file_changes
            .iter()
            .map(|c| c.filename.as_str())
    }
}

/// Per-file state inside a staging session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    Pending,
    Applying,
    Success,
    Error,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Applying => "applying",
            ApplicationStatus::Success => "success",
            ApplicationStatus::Error => "error",
        }
    }
}

impl std::fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStatus {
    pub filename: String,
    pub status: ApplicationStatus,
    pub error: Option<String>,
}

impl FileStatus {
    pub fn pending(filename: &str) -> Self {
        Self {
            filename: filename.to_string(),
            status: ApplicationStatus::Pending,
            error: None,
        }
    }
}

/// Snapshot of a file's content taken right before it was overwritten.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupEntry {
    pub filename: String,
    pub original_content: String,
    pub timestamp: DateTime<Utc>,
    pub change_id: String,
}

/// Outcome of a single apply or rollback attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileUpdateResult {
    pub success: bool,
    pub filename: String,
    pub error: Option<String>,
    pub backup: Option<BackupEntry>,
}

impl FileUpdateResult {
    pub fn ok(filename: &str, backup: Option<BackupEntry>) -> Self {
        Self {
            success: true,
            filename: filename.to_string(),
            error: None,
            backup,
        }
    }

    pub fn failed(filename: &str, error: impl Into<String>) -> Self {
        Self {
            success: false,
            filename: filename.to_string(),
            error: Some(error.into()),
            backup: None,
        }
    }
}

/// Generate a sortable change id: UTC timestamp plus a random suffix.
pub fn generate_change_id() -> String {
    let ts = Utc::now().format("%Y%m%dT%H%M%S%.3fZ").to_string();
    let alphabet = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";
    let mut rng = rand::rng();
    let suffix: String = (0..10)
        .map(|_| {
            let idx = rng.random_range(0..alphabet.len());
            alphabet[idx] as char
        })
        .collect();
    format!("{}_{}", ts, suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn change_ids_are_unique() {
        let a = generate_change_id();
        let b = generate_change_id();
        assert_ne!(a, b);
        assert!(a.contains('_'));
    }

    #[test]
    fn enums_serialize_lowercase() {
        let s = serde_json::to_string(&FileAction::Create).unwrap();
        assert_eq!(s, "\"create\"");
        let s = serde_json::to_string(&ApplicationStatus::Applying).unwrap();
        assert_eq!(s, "\"applying\"");
    }

    #[test]
    fn parsed_changes_use_camel_case_keys() {
        let parsed = ParsedChanges::default();
        let v = serde_json::to_value(&parsed).unwrap();
        assert_eq!(v["hasChanges"], false);
        assert!(v["fileChanges"].as_array().unwrap().is_empty());
    }
}
