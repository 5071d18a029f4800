//! Small helpers shared by the subcommand handlers.

use std::{
    fs,
    io::{self, Read},
    path::Path,
};

use anyhow::{Context, Result};
use owo_colors::OwoColorize;

use crate::core::model::{ApplicationStatus, FileAction};

/// Read the AI response from a file, or stdin when the path is `-`.
pub fn read_response(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read response from stdin")?;
        return Ok(buf);
    }
    fs::read_to_string(path).with_context(|| format!("Failed to read response: {:?}", path))
}

pub fn action_label(action: FileAction, no_color: bool) -> String {
    let label = action.as_str().to_uppercase();
    if no_color {
        return label;
    }
    match action {
        FileAction::Create => label.green().to_string(),
        FileAction::Update => label.blue().to_string(),
        FileAction::Delete => label.red().to_string(),
    }
}

pub fn status_label(status: ApplicationStatus, no_color: bool) -> String {
    let (icon, text) = match status {
        ApplicationStatus::Pending => ("·", "pending"),
        ApplicationStatus::Applying => ("…", "applying"),
        ApplicationStatus::Success => ("✓", "success"),
        ApplicationStatus::Error => ("✗", "error"),
    };
    let label = format!("{} {}", icon, text);
    if no_color {
        return label;
    }
    match status {
        ApplicationStatus::Success => label.green().to_string(),
        ApplicationStatus::Error => label.red().to_string(),
        ApplicationStatus::Applying => label.cyan().to_string(),
        ApplicationStatus::Pending => label.dimmed().to_string(),
    }
}
