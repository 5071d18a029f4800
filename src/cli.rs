use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Shared application context for global flags
#[derive(Clone, Debug)]
pub struct AppContext {
    pub quiet: bool,    // global --quiet
    pub no_color: bool, // global --no-color
    pub dry_run: bool,  // global --dry-run
    pub verbose: bool,  // global --verbose
}

#[derive(Parser)]
#[command(name = "fpost")]
#[command(about = "Turn AI responses with fenced code into staged, reversible project file changes")]
#[command(version, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Show what would be done without writing files
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Debug logging on stderr (overridden by FENCEPOST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the file changes an AI response proposes
    Parse(ParseArgs),

    /// Stage an AI response and apply the selected changes to a project
    Apply(ApplyArgs),

    /// Run advisory syntax checks on files
    Validate(ValidateArgs),

    /// Initialize a fencepost.toml config file
    Init(InitArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Parser)]
pub struct ParseArgs {
    /// File holding the AI response ("-" for stdin)
    pub response: PathBuf,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Print the proposed code under each file
    #[arg(long)]
    pub show_code: bool,
}

#[derive(Debug, Parser)]
pub struct ApplyArgs {
    /// File holding the AI response ("-" for stdin)
    pub response: PathBuf,

    /// Project directory the changes apply to
    #[arg(short, long, default_value = ".")]
    pub project: PathBuf,

    /// Skip these files (repeatable)
    #[arg(long, value_name = "FILE")]
    pub skip: Vec<String>,

    /// Apply only these files (repeatable); everything else is skipped
    #[arg(long, value_name = "FILE", conflicts_with = "skip")]
    pub only: Vec<String>,

    /// Run the static checks on each change before applying
    #[arg(long)]
    pub validate: bool,

    /// Review each file on stdin: preview, apply or skip, then optional rollback
    #[arg(short, long, conflicts_with = "format")]
    pub interactive: bool,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Debug, Parser)]
pub struct ValidateArgs {
    /// Files to check
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Directory to initialize config in
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Overwrite existing config file
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Target shell
    #[arg(value_enum)]
    pub shell: clap_complete::Shell,

    /// Write the script to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}
