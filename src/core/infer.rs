//! Filename inference from the prose right above a fenced block.
//!
//! This is the one fuzzy step of the parser, so it sits behind the
//! [`FilenameStrategy`] trait and can be swapped or tuned on its own.

use regex::Regex;

/// Guesses a filename from the lines preceding a code block.
pub trait FilenameStrategy {
    /// `preceding` is in document order (farthest first). Returns the
    /// inferred filename, or `None` when no cue is found.
    fn infer(&self, preceding: &[&str]) -> Option<String>;
}

/// Default strategy: three cue patterns, nearest line wins.
///
/// - `file: x` / `filename: x` / `path: x`
/// - `create file: x` / `create component: x`
/// - `update file: x` / `update component: x`
pub struct CueStrategy {
    label_re: Regex,
    create_re: Regex,
    update_re: Regex,
}

impl CueStrategy {
    pub fn new() -> Self {
        // Literal patterns; compilation cannot fail.
        Self {
            label_re: Regex::new(r"(?i)(?:file|filename|path):\s*([^\n]+)").expect("label cue"),
            create_re: Regex::new(r"(?i)create\s+(?:file|component):\s*([^\n]+)")
                .expect("create cue"),
            update_re: Regex::new(r"(?i)update\s+(?:file|component):\s*([^\n]+)")
                .expect("update cue"),
        }
    }

    fn match_line(&self, line: &str) -> Option<String> {
        [&self.label_re, &self.create_re, &self.update_re]
            .iter()
            .find_map(|re| re.captures(line))
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|name| !name.is_empty())
    }
}

impl Default for CueStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl FilenameStrategy for CueStrategy {
    fn infer(&self, preceding: &[&str]) -> Option<String> {
        preceding
            .iter()
            .rev()
            .find_map(|line| self.match_line(line))
    }
}

/// The last `window` newline-separated pieces of `text[..offset]`.
///
/// The final piece is whatever sits on the fence's own line before the
/// backticks (usually empty).
pub fn preceding_lines(text: &str, offset: usize, window: usize) -> Vec<&str> {
    let before = &text[..offset];
    let pieces: Vec<&str> = before.split('\n').collect();
    let skip = pieces.len().saturating_sub(window);
    pieces[skip..].to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_cue_is_found() {
        let s = CueStrategy::new();
        assert_eq!(
            s.infer(&["Here you go.", "File: src/game.js", ""]),
            Some("src/game.js".to_string())
        );
    }

    #[test]
    fn create_and_update_cues() {
        let s = CueStrategy::new();
        assert_eq!(
            s.infer(&["Create component: Button.tsx"]),
            Some("Button.tsx".to_string())
        );
        assert_eq!(
            s.infer(&["update file:   player.js  "]),
            Some("player.js".to_string())
        );
    }

    #[test]
    fn nearest_line_wins() {
        let s = CueStrategy::new();
        let lines = ["file: far.js", "some words", "path: near.js"];
        assert_eq!(s.infer(&lines), Some("near.js".to_string()));
    }

    #[test]
    fn no_cue_no_name() {
        let s = CueStrategy::new();
        assert_eq!(s.infer(&["just an explanation", "and more"]), None);
        assert_eq!(s.infer(&["file:   "]), None);
    }

    #[test]
    fn window_limits_lookback() {
        let text = "file: old.js\n1\n2\n3\n4\n5\n```js\nx\n```";
        let offset = text.find("```").unwrap();
        let lines = preceding_lines(text, offset, 5);
        assert_eq!(lines, vec!["2", "3", "4", "5", ""]);
        assert_eq!(CueStrategy::new().infer(&lines), None);
    }

    #[test]
    fn window_shorter_than_text() {
        let text = "file: a.js\n```js\nx\n```";
        let offset = text.find("```").unwrap();
        let lines = preceding_lines(text, offset, 5);
        assert_eq!(lines, vec!["file: a.js", ""]);
    }
}
