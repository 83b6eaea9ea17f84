//! Style suggestions and a 0–100 quality score on top of the syntax check.

use super::syntax::check_syntax;
use super::{source_lines, Language, SyntaxCheckResult};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Lines longer than this many characters get a suggestion.
pub const MAX_LINE_LENGTH: usize = 120;

const ERROR_PENALTY: i64 = 20;
const WARNING_PENALTY: i64 = 5;
const SUGGESTION_PENALTY: i64 = 3;

#[allow(clippy::expect_used)] // Static initialization with a hardcoded pattern
static FUNCTION_KEYWORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bfunction\b").expect("Hardcoded function pattern should be valid")
});

/// Result of the lint tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LintReport {
    /// The underlying syntax check.
    pub syntax_result: SyntaxCheckResult,
    /// Style suggestions, in a fixed order.
    pub suggestions: Vec<String>,
    /// Quality score in `[0, 100]`.
    pub score: u32,
}

/// Runs the syntax check and adds style suggestions.
pub fn lint(code: &str, language: Language) -> LintReport {
    let syntax_result = check_syntax(code, language);
    let mut suggestions = Vec::new();

    if language == Language::JavaScript {
        let declares_function = FUNCTION_KEYWORD.is_match(code) || code.contains("=>");
        let strict = code.contains("'use strict'") || code.contains("\"use strict\"");
        if declares_function && !strict {
            suggestions.push("Add 'use strict' at the top of the module".to_string());
        }
        if code.contains("function ") && !code.contains("=>") {
            suggestions.push("Prefer arrow functions for short callbacks".to_string());
        }
    }

    if source_lines(code)
        .iter()
        .any(|line| line.chars().count() > MAX_LINE_LENGTH)
    {
        suggestions.push(format!(
            "Split lines longer than {MAX_LINE_LENGTH} characters"
        ));
    }

    let score = score(&syntax_result, suggestions.len());
    LintReport {
        syntax_result,
        suggestions,
        score,
    }
}

/// `100 - 20·errors - 5·warnings - 3·suggestions`, clamped to `[0, 100]`.
pub fn score(syntax: &SyntaxCheckResult, suggestion_count: usize) -> u32 {
    let penalty = ERROR_PENALTY * count(syntax.errors.len())
        + WARNING_PENALTY * count(syntax.warnings.len())
        + SUGGESTION_PENALTY * count(suggestion_count);
    // Clamped into 0..=100, so the cast is lossless.
    (100 - penalty).clamp(0, 100) as u32
}

fn count(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX / 64)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_var_equality_console_scores_85() {
        let report = lint(
            "var x = 1; if (x == 1) { console.log('hi') }",
            Language::JavaScript,
        );
        assert!(report.suggestions.is_empty());
        assert_eq!(report.syntax_result.warnings.len(), 3);
        assert_eq!(report.score, 85);
    }

    #[test]
    fn test_strict_mode_and_arrow_suggestions() {
        let report = lint("function go() {\n  return 1;\n}", Language::JavaScript);
        assert_eq!(report.suggestions.len(), 2);
        assert_eq!(report.score, 94);

        let report = lint(
            "'use strict';\nconst go = () => 1;",
            Language::JavaScript,
        );
        assert!(report.suggestions.is_empty());
        assert_eq!(report.score, 100);
    }

    #[test]
    fn test_long_line_suggestion() {
        let code = format!("const s = '{}';", "x".repeat(130));
        let report = lint(&code, Language::JavaScript);
        assert_eq!(report.suggestions.len(), 1);
        assert!(report.suggestions[0].contains("120"));
    }

    #[test]
    fn test_score_clamps_at_zero() {
        let code = "{{{{{{\n".to_string() + &"var a = 1;\n".repeat(30);
        let report = lint(&code, Language::JavaScript);
        assert_eq!(report.score, 0);
    }

    #[test]
    fn test_css_has_no_javascript_suggestions() {
        let report = lint("body { color: red; }", Language::Css);
        assert!(report.suggestions.is_empty());
        assert_eq!(report.score, 100);
    }
}
