//! Interactive per-file review for `fpost apply --interactive`.
//!
//! Walks the staged files in document order: shows what each change does
//! to the current content, asks apply / skip / quit, and applies accepted
//! files one at a time. Afterwards any overwritten file can be rolled back
//! from the session's backups before the process exits.

use std::io::{BufRead, Write};

use anyhow::Result;
use owo_colors::OwoColorize;
use similar::{ChangeTag, TextDiff};

use crate::{
    cli_ext::render::action_label,
    core::{
        engine::{FileUpdateEngine, ProjectFiles},
        model::FileChange,
        stager::{ApplySummary, ChangeStager, EngineApplier},
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    Apply,
    Skip,
    Quit,
}

pub fn parse_answer(line: &str) -> Option<Answer> {
    match line.trim().to_lowercase().as_str() {
        "y" | "yes" | "a" | "apply" => Some(Answer::Apply),
        "n" | "no" | "s" | "skip" => Some(Answer::Skip),
        "q" | "quit" => Some(Answer::Quit),
        _ => None,
    }
}

/// What the review did, for the final table.
#[derive(Debug, Default)]
pub struct ReviewOutcome {
    pub summary: ApplySummary,
    /// Files restored from backup after being applied
    pub restored: Vec<String>,
}

/// Unified diff of current vs proposed content, or the proposed body for
/// a file that does not exist yet.
pub fn preview(change: &FileChange, current: Option<&str>, no_color: bool) -> String {
    let mut out = String::new();

    let Some(old) = current else {
        let n = change.new_code.lines().count();
        out.push_str(&format!("  new file, {} line{}\n", n, if n == 1 { "" } else { "s" }));
        for line in change.new_code.lines() {
            out.push_str(&paint(format!("+{}", line), ChangeTag::Insert, no_color));
            out.push('\n');
        }
        return out;
    };

    if old == change.new_code {
        out.push_str("  (identical to current content)\n");
        return out;
    }

    out.push_str(&format!("--- a/{}\n", change.filename));
    out.push_str(&format!("+++ b/{} (proposed)\n", change.filename));

    let diff = TextDiff::from_lines(old, change.new_code.as_str());
    for hunk in diff
        .unified_diff()
        .context_radius(3)
        .iter_hunks()
    {
        out.push_str(&format!("{}\n", hunk.header()));
        for c in hunk.iter_changes() {
            let sign = match c.tag() {
                ChangeTag::Delete => "-",
                ChangeTag::Insert => "+",
                ChangeTag::Equal => " ",
            };
            let line = format!("{}{}", sign, c.value().trim_end_matches(['\r', '\n']));
            out.push_str(&paint(line, c.tag(), no_color));
            out.push('\n');
        }
    }
    out
}

fn paint(line: String, tag: ChangeTag, no_color: bool) -> String {
    if no_color {
        return line;
    }
    match tag {
        ChangeTag::Insert => line.green().to_string(),
        ChangeTag::Delete => line.red().to_string(),
        ChangeTag::Equal => line,
    }
}

/// Ask until a valid answer arrives. End of input counts as quit.
fn prompt<R: BufRead, W: Write>(input: &mut R, out: &mut W, question: &str) -> Result<Answer> {
    loop {
        write!(out, "{}", question)?;
        out.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            writeln!(out)?;
            return Ok(Answer::Quit);
        }
        match parse_answer(&line) {
            Some(a) => return Ok(a),
            None => writeln!(out, "Please answer y, n or q.")?,
        }
    }
}

/// Run one review session to completion and close the stager.
///
/// Files already deselected (e.g. by `--skip`) are not offered.
pub async fn review<P, R, W>(
    stager: &mut ChangeStager,
    engine: &mut FileUpdateEngine,
    project: &mut P,
    input: &mut R,
    out: &mut W,
    no_color: bool,
) -> Result<ReviewOutcome>
where
    P: ProjectFiles,
    R: BufRead,
    W: Write,
{
    let mut outcome = ReviewOutcome::default();
    let mut restorable: Vec<String> = Vec::new();
    let mut quit = false;

    let names: Vec<String> = stager
        .parsed()
        .filenames()
        .map(str::to_string)
        .collect();

    for name in &names {
        if quit || !stager.is_selected(name) {
            stager.skip(name);
            outcome.summary.skipped.push(name.clone());
            continue;
        }
        let Some(change) = stager.parsed().find(name).cloned() else {
            continue;
        };

        if let Err(e) = project.resolve(name) {
            writeln!(out, "warning: {:#}", e)?;
        }
        let current = project.files().get(name).cloned();

        writeln!(out, "\n{} {}", action_label(change.action, no_color), name)?;
        write!(out, "{}", preview(&change, current.as_deref(), no_color))?;

        match prompt(input, out, &format!("Apply {}? [y]es/[n]o/[q]uit: ", name))? {
            Answer::Apply => {
                let res = {
                    let mut applier = EngineApplier::new(&mut *engine, &mut *project);
                    stager.apply_one(name, &mut applier).await
                };
                let Some(res) = res else { continue };

                if res.success {
                    writeln!(out, "  applied {}", name)?;
                    if res.backup.is_some() {
                        restorable.push(name.clone());
                    }
                    outcome.summary.succeeded.push(name.clone());
                } else {
                    let err = res.error.clone().unwrap_or_else(|| "Unknown error".into());
                    writeln!(out, "  failed: {}", err)?;
                    outcome.summary.failed.push((name.clone(), err));
                }
                outcome.summary.results.push(res);
            }
            Answer::Skip => {
                stager.skip(name);
                outcome.summary.skipped.push(name.clone());
            }
            Answer::Quit => {
                stager.skip(name);
                outcome.summary.skipped.push(name.clone());
                quit = true;
            }
        }
    }

    if !restorable.is_empty() && !quit {
        outcome.restored = rollback_loop(engine, project, input, out, &restorable).await?;
    }

    stager.close();
    Ok(outcome)
}

/// Offer rollbacks by filename until an empty line or end of input.
async fn rollback_loop<P, R, W>(
    engine: &mut FileUpdateEngine,
    project: &mut P,
    input: &mut R,
    out: &mut W,
    restorable: &[String],
) -> Result<Vec<String>>
where
    P: ProjectFiles,
    R: BufRead,
    W: Write,
{
    let mut restored = Vec::new();
    writeln!(
        out,
        "\nOverwritten: {}\nRoll back a file by name, or press enter to finish.",
        restorable.join(", ")
    )?;

    loop {
        write!(out, "rollback> ")?;
        out.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            writeln!(out)?;
            break;
        }
        let name = line.trim();
        if name.is_empty() {
            break;
        }

        let Some(backup) = engine.latest_backup(name).cloned() else {
            writeln!(out, "  no backup kept for {}", name)?;
            continue;
        };

        let current = project.files().clone();
        let res = engine
            .rollback_file(name, &backup.change_id, &current, |m| project.set_files(m))
            .await;
        if res.success {
            writeln!(out, "  restored {}", name)?;
            restored.push(name.to_string());
        } else {
            writeln!(out, "  rollback failed: {}", res.error.unwrap_or_default())?;
        }
    }
    Ok(restored)
}
