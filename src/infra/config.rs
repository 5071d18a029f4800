use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::{
    cli::{AppContext, InitArgs},
    core::{aggregate::ParserOptions, engine::DEFAULT_BACKUP_LIMIT},
};

/// Config file names, checked in order; the first one found wins.
const CONFIG_FILES: [&str; 2] = ["fencepost.toml", ".fencepost.toml"];

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config
{
    /// Response parser heuristics
    pub parser: ParserOptions,

    /// Backup history settings
    pub backups: BackupConfig,

    /// Project loading settings
    pub project: ProjectConfig,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct BackupConfig
{
    pub max_per_file: usize,
}

impl Default for BackupConfig
{
    fn default() -> Self
    {
        Self { max_per_file: DEFAULT_BACKUP_LIMIT }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig
{
    /// Extra ignore globs (in addition to .gitignore)
    pub ignore_patterns: Vec<String>,

    /// Files larger than this are not loaded
    pub max_file_bytes: u64,
}

impl Default for ProjectConfig
{
    fn default() -> Self
    {
        Self {
            ignore_patterns: vec![
                "target/**".to_string(),
                "node_modules/**".to_string(),
                "dist/**".to_string(),
                "build/**".to_string(),
                ".git/**".to_string(),
            ],
            max_file_bytes: 2 * 1024 * 1024,
        }
    }
}

/// Load from the working directory's config file (if any), then `FENCEPOST__*` env vars.
pub fn load_config() -> Result<Config>
{
    load_config_from(Path::new("."))
}

pub fn load_config_from(dir: &Path) -> Result<Config>
{
    let mut builder = config::Config::builder();

    for name in &CONFIG_FILES
    {
        let path = dir.join(name);
        if path.exists()
        {
            builder = builder.add_source(config::File::from(path));
            break;
        }
    }

    // Double underscore separates sections: FENCEPOST__BACKUPS__MAX_PER_FILE=20
    builder = builder.add_source(
        config::Environment::with_prefix("FENCEPOST")
            .prefix_separator("__")
            .separator("__"),
    );

    let cfg = builder
        .build()
        .context("Failed to load configuration")?;
    let parsed: Config = cfg
        .try_deserialize()
        .context("Failed to parse configuration")?;

    Ok(parsed)
}

pub fn init(
    args: InitArgs,
    ctx: &AppContext,
) -> Result<()>
{
    let config_path = args
        .path
        .join(CONFIG_FILES[0]);

    if config_path.exists() && !args.force
    {
        anyhow::bail!(
            "Config file already exists at {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    let config = Config::default();
    let toml_string =
        toml::to_string_pretty(&config).context("Failed to serialize default config")?;

    std::fs::write(&config_path, toml_string).context("Failed to write config file")?;

    if !ctx.quiet
    {
        println!("Created config file at {}", config_path.display());
    }
    Ok(())
}
