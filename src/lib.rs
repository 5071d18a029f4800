//! **fencepost** - Turn AI responses with fenced code into staged, reversible file changes
//!
//! Parses free-form AI text into per-file changes, stages them for review,
//! and applies them to a project mapping with per-file backup history.

/// Command-line interface with clap integration
pub mod cli;

/// Core pipeline - parse, stage, apply, roll back
pub mod core {
    /// Shared data model (changes, statuses, backups)
    pub mod model;
    pub use model::{
        ApplicationStatus, BackupEntry, CodeBlock, FileAction, FileChange, FileMap, FileStatus,
        FileUpdateResult, ParsedChanges,
    };

    /// Fenced code region scanning
    pub mod fence;

    /// Filename inference from surrounding prose
    pub mod infer;
    pub use infer::{CueStrategy, FilenameStrategy};

    /// Grouping of blocks into one change per file
    pub mod aggregate;
    pub use aggregate::{ParserOptions, parse_ai_response, parse_ai_response_with};

    /// Apply/skip review session
    pub mod stager;
    pub use stager::{ApplySummary, ChangeApplier, ChangeStager, EngineApplier, StagerSnapshot};

    /// Copy-on-write apply with bounded backup history
    pub mod engine;
    pub use engine::{FileUpdateEngine, ProjectFiles, UpdateError};

    /// Advisory static checks
    pub mod validate;
    pub use validate::{ValidationReport, validate_code};
}

/// CLI subcommand handlers
pub mod cli_ext {
    /// `parse` - show what a response proposes
    pub mod parse_cmd;

    /// `apply` - stage and apply a response to a project directory
    pub mod apply_cmd;

    /// `validate` - run the static checks on files
    pub mod validate_cmd;

    /// Interactive per-file review for `apply --interactive`
    pub mod review;

    /// `completions` - shell completion scripts
    pub mod completions_cmd;

    /// Input reading and colored labels
    pub mod render;
}

/// Infrastructure - Configuration, project I/O, logging
pub mod infra {
    /// Configuration management with TOML support
    pub mod config;
    pub use config::{Config, init as config_init, load_config};

    /// Disk-backed project mapping
    pub mod project;
    pub use project::DiskProject;

    /// tracing subscriber setup
    pub mod logging;
}

// Strategic re-exports for library consumers
pub use cli::{AppContext, Cli, Commands};
pub use core::{
    ChangeStager, EngineApplier, FileUpdateEngine, ParsedChanges, parse_ai_response,
};
pub use infra::{Config, load_config};
