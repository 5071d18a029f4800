//! Heuristic static checks on proposed code.
//!
//! Advisory only: findings are returned as messages and never block an apply.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

static OPEN_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^/][^>]*[^/]>").expect("open tag pattern"));
static CLOSE_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"</[^>]+>").expect("close tag pattern"));
static SELF_CLOSE_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*/>").expect("self-closing tag pattern"));

pub const UNCLOSED_TAGS: &str = "Potential unclosed JSX tags detected";
pub const MISSING_REACT_IMPORT: &str = "JSX detected but React import missing";
pub const UNBALANCED_BRACES: &str = "Unbalanced braces detected";
pub const UNBALANCED_PARENS: &str = "Unbalanced parentheses detected";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: Vec<String>,
}

/// Files whose contents may contain JSX markup.
pub fn is_markup_file(filename: &str) -> bool {
    filename.ends_with(".tsx") || filename.ends_with(".jsx")
}

pub fn validate_code(code: &str, filename: &str) -> ValidationReport {
    let mut errors = Vec::new();

    if is_markup_file(filename) {
        let open = OPEN_TAG_RE.find_iter(code).count();
        let close = CLOSE_TAG_RE.find_iter(code).count();
        let self_close = SELF_CLOSE_TAG_RE.find_iter(code).count();
        if open != close + self_close {
            errors.push(UNCLOSED_TAGS.to_string());
        }

        if code.contains('<') && code.contains('>') && !code.contains("import React") {
            errors.push(MISSING_REACT_IMPORT.to_string());
        }
    }

    if count(code, '{') != count(code, '}') {
        errors.push(UNBALANCED_BRACES.to_string());
    }
    if count(code, '(') != count(code, ')') {
        errors.push(UNBALANCED_PARENS.to_string());
    }

    ValidationReport {
        is_valid: errors.is_empty(),
        errors,
    }
}

fn count(code: &str, c: char) -> usize {
    code.chars().filter(|&x| x == c).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn balanced_script_is_valid() {
        let r = validate_code("function a(b) { return (b + 1); }", "a.js");
        assert!(r.is_valid);
        assert!(r.errors.is_empty());
    }

    #[test]
    fn reports_brace_and_paren_imbalance() {
        let r = validate_code("function a(b { return 1;", "a.js");
        assert!(!r.is_valid);
        assert_eq!(r.errors, vec![UNBALANCED_BRACES, UNBALANCED_PARENS]);
    }

    #[test]
    fn markup_checks_only_for_jsx_like_files() {
        let code = "const A = () => <div><span>hi</span>";
        let r = validate_code(code, "A.js");
        assert!(r.is_valid);

        let r = validate_code(code, "A.tsx");
        assert!(r.errors.contains(&UNCLOSED_TAGS.to_string()));
        assert!(r.errors.contains(&MISSING_REACT_IMPORT.to_string()));
    }

    #[test]
    fn well_formed_component_passes() {
        let code = "import React from 'react';\n\
                    export const A = () => <div><span>hi</span></div>;";
        let r = validate_code(code, "A.jsx");
        assert!(r.is_valid, "unexpected findings: {:?}", r.errors);
    }
}
