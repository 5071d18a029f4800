//! Response parsing: fenced blocks -> inferred filenames -> one change per file.
//!
//! Never fails. A response without fenced code simply yields
//! `has_changes == false`.

use std::collections::HashSet;

use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::core::{
    fence::{FencedRegion, extract_fences},
    infer::{CueStrategy, FilenameStrategy, preceding_lines},
    model::{CodeBlock, FileAction, FileChange, ParsedChanges},
};

/// Tunables for the response parser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserOptions {
    /// Lines above a fence scanned for a filename cue
    pub context_lines: usize,
    /// Language tag for fences that declare none
    pub default_language: String,
    /// Description is cut to this many characters
    pub description_max_chars: usize,
    /// Used when the response has no prose line
    pub fallback_description: String,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            context_lines: 5,
            default_language: "javascript".to_string(),
            description_max_chars: 100,
            fallback_description: "AI suggested code changes".to_string(),
        }
    }
}

/// Parse with default options and the cue-based filename strategy.
pub fn parse_ai_response(text: &str) -> ParsedChanges {
    parse_ai_response_with(text, &ParserOptions::default(), &CueStrategy::new())
}

/// Parse with explicit options and filename strategy.
#[instrument(level = "debug", skip_all, fields(len = text.len()))]
pub fn parse_ai_response_with(
    text: &str,
    opts: &ParserOptions,
    strategy: &dyn FilenameStrategy,
) -> ParsedChanges {
    let regions = extract_fences(text, &opts.default_language);

    // Group named blocks by filename in encounter order; keep unnamed ones apart.
    let mut groups: IndexMap<String, Vec<CodeBlock>> = IndexMap::new();
    let mut unknown: Vec<CodeBlock> = Vec::new();

    for region in &regions {
        let preceding = preceding_lines(text, region.start_offset, opts.context_lines);
        let block = to_block(region, strategy.infer(&preceding));
        match block.filename.clone() {
            Some(name) => groups.entry(name).or_default().push(block),
            None => unknown.push(block),
        }
    }

    let lower = text.to_lowercase();
    let mut file_changes = Vec::with_capacity(groups.len() + unknown.len());

    for (filename, blocks) in groups {
        let new_code = blocks
            .iter()
            .map(|b| b.code.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        let action = if mentions_creation(&lower, &filename) {
            FileAction::Create
        } else {
            FileAction::Update
        };
        file_changes.push(FileChange {
            filename,
            action,
            original_code: None,
            new_code,
            code_blocks: blocks,
        });
    }

    let mut taken: HashSet<String> = file_changes
        .iter()
        .map(|c| c.filename.clone())
        .collect();

    for block in unknown {
        let filename = unique_name(sniff_filename(&block), &mut taken);
        file_changes.push(FileChange {
            filename,
            action: FileAction::Create,
            original_code: None,
            new_code: block.code.clone(),
            code_blocks: vec![block],
        });
    }

    debug!(
        blocks = regions.len(),
        files = file_changes.len(),
        "parsed AI response"
    );

    ParsedChanges {
        has_changes: !file_changes.is_empty(),
        file_changes,
        description: Some(extract_description(text, opts)),
    }
}

fn to_block(region: &FencedRegion, filename: Option<String>) -> CodeBlock {
    CodeBlock {
        id: block_id(&region.code, region.start_offset),
        language: region.language.clone(),
        code: region.code.clone(),
        filename,
        start_line: Some(region.start_line),
        end_line: Some(region.end_line),
    }
}

/// Deterministic per-response id: xxh64 of the body, seeded by its offset.
fn block_id(code: &str, offset: usize) -> String {
    let h = xxhash_rust::xxh64::xxh64(code.as_bytes(), offset as u64);
    format!("blk_{:016x}", h)
}

/// `create <name>`, `create file|component: <name>`, or a bare "new file".
fn mentions_creation(lower_text: &str, filename: &str) -> bool {
    let name = filename.to_lowercase();
    if lower_text.contains(&format!("create {}", name)) || lower_text.contains("new file") {
        return true;
    }
    let pattern = format!(
        r"create\s+(?:file|component):\s*{}",
        regex::escape(&name)
    );
    Regex::new(&pattern)
        .map(|re| re.is_match(lower_text))
        .unwrap_or(false)
}

/// Content-sniffed name for a block with no filename cue.
fn sniff_filename(block: &CodeBlock) -> &'static str {
    if block.language == "tsx" || block.code.contains("React") {
        "component.tsx"
    } else if block.language == "css" {
        "styles.css"
    } else if block.code.contains("export") || block.code.contains("function") {
        "utility.ts"
    } else {
        "unknown.js"
    }
}

/// `base`, or `stem-N.ext` for the first free N >= 2.
fn unique_name(base: &str, taken: &mut HashSet<String>) -> String {
    let mut name = base.to_string();
    let mut n = 2;
    while taken.contains(&name) {
        name = match base.rfind('.') {
            Some(dot) => format!("{}-{}{}", &base[..dot], n, &base[dot..]),
            None => format!("{}-{}", base, n),
        };
        n += 1;
    }
    taken.insert(name.clone());
    name
}

/// First prose line outside fences that is not a heading, truncated.
fn extract_description(text: &str, opts: &ParserOptions) -> String {
    let mut in_fence = false;

    for line in text.lines() {
        let t = line.trim();
        if t.starts_with("```") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence || t.is_empty() || t.starts_with('#') {
            continue;
        }

        if t.chars().count() > opts.description_max_chars {
            let cut: String = t.chars().take(opts.description_max_chars).collect();
            return format!("{}...", cut);
        }
        return t.to_string();
    }

    opts.fallback_description.clone()
}
