//! Fenced code region scanning.
//!
//! Finds every ```` ```lang ```` … ```` ``` ```` region in free-form text, in
//! document order. Pure and restartable: the same input always produces the
//! same regions.

use std::sync::LazyLock;

use regex::Regex;

/// Opening fence with optional word tag, newline, lazy body, closing fence.
static FENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```(\w+)?\r?\n(.*?)```").expect("fence pattern"));

/// A fenced region with its trimmed body and location in the source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FencedRegion {
    pub language: String,
    pub code: String,
    /// Byte offset of the opening fence.
    pub start_offset: usize,
    /// 1-based line of the first non-blank body line.
    pub start_line: usize,
    /// 1-based line of the last non-blank body line.
    pub end_line: usize,
}

/// Extract all non-empty fenced regions. Untagged fences get `default_language`.
pub fn extract_fences(text: &str, default_language: &str) -> Vec<FencedRegion> {
    let mut out = Vec::new();

    for caps in FENCE_RE.captures_iter(text) {
        let (Some(whole), Some(body)) = (caps.get(0), caps.get(2)) else {
            continue;
        };

        let code = body.as_str().trim();
        if code.is_empty() {
            continue;
        }

        let language = caps
            .get(1)
            .map(|m| m.as_str().to_string())
            .unwrap_or_else(|| default_language.to_string());

        // Locate the trimmed body inside the raw body to get line numbers.
        let lead = body.as_str().len() - body.as_str().trim_start().len();
        let code_start = body.start() + lead;
        let start_line = line_of(text, code_start);
        let end_line = start_line + code.matches('\n').count();

        out.push(FencedRegion {
            language,
            code: code.to_string(),
            start_offset: whole.start(),
            start_line,
            end_line,
        });
    }

    out
}

/// 1-based line number of a byte offset.
fn line_of(text: &str, offset: usize) -> usize {
    text.as_bytes()[..offset]
        .iter()
        .filter(|&&b| b == b'\n')
        .count()
        + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_tagged_and_untagged_blocks() {
        let text = "intro\n```rust\nfn a() {}\n```\nmid\n```\nlet x = 1;\n```\n";
        let regions = extract_fences(text, "javascript");

        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].language, "rust");
        assert_eq!(regions[0].code, "fn a() {}");
        assert_eq!(regions[1].language, "javascript");
        assert_eq!(regions[1].code, "let x = 1;");
    }

    #[test]
    fn drops_blank_bodies() {
        let text = "```js\n   \n\n```\n```css\nbody {}\n```";
        let regions = extract_fences(text, "javascript");
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].language, "css");
    }

    #[test]
    fn records_offsets_and_lines() {
        let text = "line one\nline two\n```js\n\nfoo();\nbar();\n```";
        let regions = extract_fences(text, "javascript");
        assert_eq!(regions.len(), 1);
        let r = &regions[0];
        assert_eq!(r.start_offset, text.find("```").unwrap());
        assert_eq!(r.start_line, 5);
        assert_eq!(r.end_line, 6);
    }

    #[test]
    fn tolerates_crlf_after_tag() {
        let text = "```ts\r\nconst a = 1;\r\n```";
        let regions = extract_fences(text, "javascript");
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].code, "const a = 1;");
    }

    #[test]
    fn no_fences_no_regions() {
        assert!(extract_fences("plain text, no fences", "javascript").is_empty());
    }

    #[test]
    fn unterminated_fence_is_ignored() {
        assert!(extract_fences("```js\nlet a = 1;\n", "javascript").is_empty());
    }
}
