//! Mechanical rewrites for the most common JavaScript warnings.

use super::Language;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

#[allow(clippy::expect_used)]
static VAR_DECLARATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bvar\s+").expect("Hardcoded var pattern should be valid"));

/// Rewrites every `==` to `===` and `!=` to `!==`, leaving strict and
/// relational operators alone. Runs of `=` are consumed whole, so adjacent
/// comparisons are each rewritten.
fn strict_equality(code: &str) -> String {
    let bytes = code.as_bytes();
    let mut out = String::with_capacity(code.len() + 8);
    let mut copied = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'!' if bytes.get(i + 1) == Some(&b'=') => {
                let run = equals_run(bytes, i + 1);
                if run == 1 {
                    out.push_str(&code[copied..i]);
                    out.push_str("!==");
                    copied = i + 2;
                }
                i += 1 + run;
            }
            b'=' => {
                let run = equals_run(bytes, i);
                let relational = i > 0 && matches!(bytes[i - 1], b'<' | b'>');
                if run == 2 && !relational {
                    out.push_str(&code[copied..i]);
                    out.push_str("===");
                    copied = i + 2;
                }
                i += run;
            }
            _ => i += 1,
        }
    }
    out.push_str(&code[copied..]);
    out
}

fn equals_run(bytes: &[u8], start: usize) -> usize {
    bytes[start..].iter().take_while(|b| **b == b'=').count()
}

/// Result of the rule-based fixer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleFixOutcome {
    /// Input code.
    pub original_code: String,
    /// Code after all rewrites.
    pub fixed_code: String,
    /// Descriptions of the rewrites that changed something.
    pub fixes_applied: Vec<String>,
    /// `fixes_applied.len()`.
    pub fix_count: usize,
}

/// Applies `var` → `let` and loose → strict equality rewrites.
///
/// CSS input is returned unchanged.
pub fn apply_rule_fixes(code: &str, language: Language) -> RuleFixOutcome {
    let mut fixed = code.to_string();
    let mut fixes = Vec::new();

    if language == Language::JavaScript {
        let rewritten = VAR_DECLARATION.replace_all(&fixed, "let ").into_owned();
        if rewritten != fixed {
            fixes.push("Replaced 'var' declarations with 'let'".to_string());
            fixed = rewritten;
        }

        let strict = strict_equality(&fixed);
        if strict != fixed {
            fixes.push("Replaced loose equality with strict equality".to_string());
            fixed = strict;
        }
    }

    RuleFixOutcome {
        original_code: code.to_string(),
        fix_count: fixes.len(),
        fixed_code: fixed,
        fixes_applied: fixes,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_var_and_equality_rewritten() {
        let outcome = apply_rule_fixes("var x = 1;\nif (x == 1 && y != 2) {}", Language::JavaScript);
        assert_eq!(outcome.fixed_code, "let x = 1;\nif (x === 1 && y !== 2) {}");
        assert_eq!(outcome.fix_count, 2);
    }

    #[test]
    fn test_chained_comparisons_all_rewritten() {
        let outcome = apply_rule_fixes("if (a==b==c) {}", Language::JavaScript);
        assert_eq!(outcome.fixed_code, "if (a===b===c) {}");

        let outcome = apply_rule_fixes("x!=y!=z || p==q", Language::JavaScript);
        assert_eq!(outcome.fixed_code, "x!==y!==z || p===q");
    }

    #[test]
    fn test_operators_at_edges() {
        assert_eq!(strict_equality("==a"), "===a");
        assert_eq!(strict_equality("a=="), "a===");
        assert_eq!(strict_equality("a!="), "a!==");
        assert_eq!(strict_equality("const f = (x) => x == 'é';"), "const f = (x) => x === 'é';");
    }

    #[test]
    fn test_strict_operators_untouched() {
        let code = "if (a === b || c !== d || e <= f || g >= h || i = j) {}";
        let outcome = apply_rule_fixes(code, Language::JavaScript);
        assert_eq!(outcome.fixed_code, code);
        assert!(outcome.fixes_applied.is_empty());
    }

    #[test]
    fn test_identifiers_containing_var_untouched() {
        let outcome = apply_rule_fixes("const variance = 2;", Language::JavaScript);
        assert_eq!(outcome.fix_count, 0);
    }

    #[test]
    fn test_css_unchanged() {
        let outcome = apply_rule_fixes("a { color: red }", Language::Css);
        assert_eq!(outcome.fixed_code, outcome.original_code);
    }
}
