//! `fpost parse`: show what an AI response proposes without touching anything.

use anyhow::Result;
use owo_colors::OwoColorize;

use crate::{
    cli::{AppContext, OutputFormat, ParseArgs},
    cli_ext::render::{action_label, read_response},
    core::{
        aggregate::parse_ai_response_with,
        infer::CueStrategy,
        model::{FileChange, ParsedChanges},
    },
    infra::config::load_config,
};

pub fn run(args: ParseArgs, ctx: &AppContext) -> Result<()> {
    let cfg = load_config()?;
    let text = read_response(&args.response)?;
    let parsed = parse_ai_response_with(&text, &cfg.parser, &CueStrategy::new());

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&parsed)?),
        OutputFormat::Text => print_text(&parsed, args.show_code, ctx),
    }
    Ok(())
}

fn print_text(parsed: &ParsedChanges, show_code: bool, ctx: &AppContext) {
    if !parsed.has_changes {
        if !ctx.quiet {
            println!("No file changes found in response");
        }
        return;
    }

    if !ctx.quiet {
        if let Some(desc) = &parsed.description {
            println!("{}", desc);
        }
        let n = parsed.file_changes.len();
        println!("{} file{} affected", n, if n == 1 { "" } else { "s" });
    }

    for change in &parsed.file_changes {
        println!("  {}", describe(change, ctx.no_color));
        if show_code {
            for line in change.new_code.lines() {
                println!("      {}", line);
            }
        }
    }
}

fn describe(change: &FileChange, no_color: bool) -> String {
    let blocks = change.code_blocks.len();
    let name = if no_color {
        change.filename.clone()
    } else {
        change.filename.bold().to_string()
    };

    let span = match (
        change.code_blocks.first().and_then(|b| b.start_line),
        change.code_blocks.last().and_then(|b| b.end_line),
    ) {
        (Some(s), Some(e)) => format!(", lines {}-{}", s, e),
        _ => String::new(),
    };

    format!(
        "{:<8} {} ({} block{}, {}{})",
        action_label(change.action, no_color),
        name,
        blocks,
        if blocks == 1 { "" } else { "s" },
        change.language(),
        span
    )
}
