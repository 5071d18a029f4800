//! `fpost validate`: run the advisory checks over files on disk.

use std::fs;

use anyhow::{Context, Result, bail};
use owo_colors::OwoColorize;
use serde::Serialize;

use crate::{
    cli::{AppContext, OutputFormat, ValidateArgs},
    core::validate::{ValidationReport, validate_code},
};

#[derive(Serialize)]
struct FileReport {
    file: String,
    #[serde(flatten)]
    report: ValidationReport,
}

pub fn run(args: ValidateArgs, ctx: &AppContext) -> Result<()> {
    let mut reports = Vec::with_capacity(args.files.len());
    for path in &args.files {
        let code =
            fs::read_to_string(path).with_context(|| format!("Failed to read file: {:?}", path))?;
        let file = path.to_string_lossy().to_string();
        let report = validate_code(&code, &file);
        reports.push(FileReport { file, report });
    }

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&reports)?),
        OutputFormat::Text => {
            for r in &reports {
                if r.report.is_valid {
                    if !ctx.quiet {
                        let mark = if ctx.no_color { "✓".to_string() } else { "✓".green().to_string() };
                        println!("{} {}", mark, r.file);
                    }
                    continue;
                }
                let mark = if ctx.no_color { "✗".to_string() } else { "✗".red().to_string() };
                println!("{} {}", mark, r.file);
                for err in &r.report.errors {
                    println!("    {}", err);
                }
            }
        }
    }

    let flagged = reports.iter().filter(|r| !r.report.is_valid).count();
    if flagged > 0 {
        bail!("{} of {} files have findings", flagged, reports.len());
    }
    Ok(())
}
