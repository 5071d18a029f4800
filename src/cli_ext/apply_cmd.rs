//! `fpost apply`: stage an AI response and write the selected changes,
//! either all at once or file by file with `--interactive`.

use std::io;

use anyhow::{Context, Result, bail};
use owo_colors::OwoColorize;
use serde::Serialize;
use tabled::{Table, Tabled};
use tracing::{debug, warn};

use crate::{
    cli::{AppContext, ApplyArgs, OutputFormat},
    cli_ext::{
        render::{action_label, read_response, status_label},
        review::review,
    },
    core::{
        aggregate::parse_ai_response_with,
        engine::FileUpdateEngine,
        infer::CueStrategy,
        model::FileUpdateResult,
        stager::{ApplySummary, ChangeStager, EngineApplier, StagerSnapshot},
        validate::ValidationReport,
    },
    infra::{config::load_config_from, project::DiskProject},
};

#[derive(Tabled)]
struct StatusRow {
    #[tabled(rename = "File")]
    file: String,
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Detail")]
    detail: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ApplyReport<'a> {
    dry_run: bool,
    summary: &'a ApplySummary,
    session: StagerSnapshot,
    warnings: Vec<(String, ValidationReport)>,
}

pub fn run(args: ApplyArgs, ctx: &AppContext) -> Result<()> {
    if args.interactive && args.response.as_os_str() == "-" {
        bail!("--interactive reads answers from stdin; pass the response as a file");
    }
    let cfg = load_config_from(&args.project)?;
    let text = read_response(&args.response)?;
    let parsed = parse_ai_response_with(&text, &cfg.parser, &CueStrategy::new());

    if !parsed.has_changes {
        if !ctx.quiet {
            println!("No file changes found in response");
        }
        return Ok(());
    }

    let mut project = DiskProject::load(&args.project, &cfg.project)
        .with_context(|| format!("Failed to load project {:?}", args.project))?
        .with_dry_run(ctx.dry_run);
    let mut engine = FileUpdateEngine::new().with_backup_limit(cfg.backups.max_per_file);
    let mut stager = ChangeStager::new(parsed);

    for name in &args.skip {
        if stager.parsed().find(name).is_none() {
            warn!(file = %name, "--skip names a file not in the response");
        }
        stager.skip(name);
    }
    if !args.only.is_empty() {
        let others: Vec<String> = stager
            .parsed()
            .filenames()
            .filter(|f| !args.only.iter().any(|o| o == f))
            .map(str::to_string)
            .collect();
        for name in &others {
            stager.skip(name);
        }
    }

    let warnings = if args.validate {
        check_selected(&stager, &engine)
    } else {
        Vec::new()
    };
    if matches!(args.format, OutputFormat::Text) && !ctx.quiet {
        print_preamble(&stager, &warnings, ctx);
    }

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start runtime")?;

    let (summary, restored) = if args.interactive {
        let outcome = rt.block_on(async {
            let stdin = io::stdin();
            let mut input = stdin.lock();
            let mut out = io::stdout();
            review(&mut stager, &mut engine, &mut project, &mut input, &mut out, ctx.no_color)
                .await
        })?;
        (outcome.summary, outcome.restored)
    } else {
        let summary = rt.block_on(async {
            let mut applier = EngineApplier::new(&mut engine, &mut project);
            stager.apply_all(&mut applier).await
        });
        (summary, Vec::new())
    };
    debug!(touched = ?project.touched(), "apply finished");

    match args.format {
        OutputFormat::Json => {
            let report = ApplyReport {
                dry_run: ctx.dry_run,
                summary: &summary,
                session: stager.snapshot(),
                warnings,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Text => print_table(&stager, &summary, &restored, ctx),
    }

    if !summary.failed.is_empty() {
        bail!("{}", summary.summary_line());
    }
    Ok(())
}

/// Advisory findings for every selected change that has any.
fn check_selected(
    stager: &ChangeStager,
    engine: &FileUpdateEngine,
) -> Vec<(String, ValidationReport)> {
    stager
        .parsed()
        .file_changes
        .iter()
        .filter(|c| stager.is_selected(&c.filename))
        .map(|c| (c.filename.clone(), engine.validate_code(&c.new_code, &c.filename)))
        .filter(|(_, report)| !report.is_valid)
        .collect()
}

fn print_preamble(
    stager: &ChangeStager,
    warnings: &[(String, ValidationReport)],
    ctx: &AppContext,
) {
    if let Some(desc) = &stager.parsed().description {
        println!("{}\n", desc);
    }
    for (file, report) in warnings {
        for err in &report.errors {
            let tag = if ctx.no_color {
                "warning:".to_string()
            } else {
                "warning:".yellow().bold().to_string()
            };
            println!("{} {}: {}", tag, file, err);
        }
    }
}

fn print_table(
    stager: &ChangeStager,
    summary: &ApplySummary,
    restored: &[String],
    ctx: &AppContext,
) {
    let rows: Vec<StatusRow> = stager
        .parsed()
        .file_changes
        .iter()
        .map(|change| {
            let st = stager.status(&change.filename);
            let result = summary
                .results
                .iter()
                .find(|r| r.filename == change.filename);
            StatusRow {
                file: change.filename.clone(),
                action: action_label(change.action, ctx.no_color),
                status: st
                    .map(|s| status_label(s.status, ctx.no_color))
                    .unwrap_or_default(),
                detail: detail(
                    result,
                    summary.skipped.contains(&change.filename),
                    restored.contains(&change.filename),
                ),
            }
        })
        .collect();

    println!("{}", Table::new(rows));

    if !ctx.quiet {
        let line = summary.summary_line();
        if ctx.dry_run {
            println!("{} (dry run, nothing written)", line);
        } else if ctx.no_color || summary.failed.is_empty() {
            println!("{}", line);
        } else {
            println!("{}", line.red());
        }
    }
}

fn detail(result: Option<&FileUpdateResult>, skipped: bool, restored: bool) -> String {
    if skipped {
        return "skipped".to_string();
    }
    if restored {
        return "rolled back".to_string();
    }
    match result {
        Some(r) if !r.success => r.error.clone().unwrap_or_default(),
        Some(r) if r.backup.is_some() => "updated".to_string(),
        Some(_) => "new file".to_string(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_text() {
        assert_eq!(detail(None, true, false), "skipped");
        assert_eq!(
            detail(Some(&FileUpdateResult::failed("a.js", "boom")), false, false),
            "boom"
        );
        assert_eq!(
            detail(Some(&FileUpdateResult::ok("a.js", None)), false, false),
            "new file"
        );
        assert_eq!(
            detail(Some(&FileUpdateResult::ok("a.js", None)), false, true),
            "rolled back"
        );
    }
}
