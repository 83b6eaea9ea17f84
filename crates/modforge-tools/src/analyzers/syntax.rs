//! Bracket-balance scanner and line heuristics for JavaScript and CSS.

use super::{column_at, source_lines, CodeError, CodeWarning, ErrorSeverity, Language, SyntaxCheckResult};
use regex::Regex;
use std::sync::LazyLock;

#[allow(clippy::expect_used)] // Static initialization with a hardcoded pattern
static LOOSE_EQUALITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[^=!<>])(==|!=)(?:[^=]|$)").expect("Hardcoded equality pattern should be valid")
});

/// Checks `code` in the given language.
pub fn check_syntax(code: &str, language: Language) -> SyntaxCheckResult {
    match language {
        Language::JavaScript => check_javascript(code),
        Language::Css => check_css(code),
    }
}

/// Running bracket counters; positive means unclosed openers.
#[derive(Debug, Default)]
struct Balance {
    braces: i64,
    parens: i64,
    brackets: i64,
}

impl Balance {
    fn track(&mut self, c: char) {
        match c {
            '{' => self.braces += 1,
            '}' => self.braces -= 1,
            '(' => self.parens += 1,
            ')' => self.parens -= 1,
            '[' => self.brackets += 1,
            ']' => self.brackets -= 1,
            _ => {}
        }
    }
}

/// Lexer state carried across lines, so block comments and template
/// literals may span several of them.
#[derive(Debug, Default)]
struct JsScanner {
    balance: Balance,
    string_quote: Option<char>,
    in_block_comment: bool,
}

impl JsScanner {
    fn scan_line(&mut self, line: &str) {
        let chars: Vec<char> = line.chars().collect();
        let mut i = 0;
        while i < chars.len() {
            let c = chars[i];
            let next = chars.get(i + 1).copied();

            if self.string_quote.is_none() {
                if c == '/' && next == Some('/') && !self.in_block_comment {
                    break;
                }
                if c == '/' && next == Some('*') && !self.in_block_comment {
                    self.in_block_comment = true;
                    i += 2;
                    continue;
                }
                if self.in_block_comment && c == '*' && next == Some('/') {
                    self.in_block_comment = false;
                    i += 2;
                    continue;
                }
            }

            if self.in_block_comment {
                i += 1;
                continue;
            }

            if matches!(c, '"' | '\'' | '`') && !is_escaped(&chars, i) {
                match self.string_quote {
                    None => self.string_quote = Some(c),
                    Some(open) if open == c => self.string_quote = None,
                    Some(_) => {}
                }
            } else if self.string_quote.is_none() {
                self.balance.track(c);
            }
            i += 1;
        }
    }
}

/// True when the character at `index` is preceded by an odd run of backslashes.
fn is_escaped(chars: &[char], index: usize) -> bool {
    chars[..index]
        .iter()
        .rev()
        .take_while(|&&c| c == '\\')
        .count()
        % 2
        == 1
}

fn balance_error(last_line: usize, count: i64, noun: &str, open: char, close: char) -> Option<CodeError> {
    if count == 0 {
        return None;
    }
    let detail = if count > 0 {
        format!("{count} unclosed '{open}'")
    } else {
        format!("{} unmatched '{close}'", -count)
    };
    Some(CodeError {
        line: last_line,
        column: 0,
        message: format!("Unbalanced {noun}: {detail} (net count {count:+})"),
        severity: ErrorSeverity::Error,
        rule: Some(format!("balanced-{noun}")),
        suggestion: Some(format!("Check that every '{open}' has a matching '{close}'")),
    })
}

/// Brace/paren/bracket balance plus per-line warnings for JavaScript.
pub fn check_javascript(code: &str) -> SyntaxCheckResult {
    let lines = source_lines(code);
    let mut scanner = JsScanner::default();
    let mut warnings = Vec::new();

    for (index, line) in lines.iter().enumerate() {
        scanner.scan_line(line);
        javascript_line_warnings(line, index + 1, &mut warnings);
    }

    let last = lines.len();
    let b = &scanner.balance;
    let errors = [
        balance_error(last, b.braces, "braces", '{', '}'),
        balance_error(last, b.parens, "parentheses", '(', ')'),
        balance_error(last, b.brackets, "brackets", '[', ']'),
    ]
    .into_iter()
    .flatten()
    .collect();

    SyntaxCheckResult::new(errors, warnings)
}

fn warning(line_no: usize, column: usize, message: &str, rule: &str) -> CodeWarning {
    CodeWarning {
        line: line_no,
        column,
        message: message.to_string(),
        rule: Some(rule.to_string()),
    }
}

fn javascript_line_warnings(line: &str, line_no: usize, out: &mut Vec<CodeWarning>) {
    let trimmed = line.trim();

    if trimmed.starts_with("var ") {
        let column = line.find("var").map_or(1, |at| column_at(line, at));
        out.push(warning(line_no, column, "Use 'let' or 'const' instead of 'var'", "no-var"));
    }

    if let Some(op) = LOOSE_EQUALITY.captures(line).and_then(|caps| caps.get(1)) {
        out.push(warning(
            line_no,
            column_at(line, op.start()),
            "Use strict equality ('===' / '!==') instead of loose equality",
            "eqeqeq",
        ));
    }

    let calls = [
        ("eval(", "Avoid eval(); it executes arbitrary strings as code", "no-eval"),
        ("document.write(", "Avoid document.write(); modify the DOM instead", "no-document-write"),
        ("console.log(", "Remove console.log() from production code", "no-console"),
    ];
    for (needle, message, rule) in calls {
        if let Some(at) = line.find(needle) {
            out.push(warning(line_no, column_at(line, at), message, rule));
        }
    }
}

/// Brace balance plus per-line warnings for CSS.
pub fn check_css(code: &str) -> SyntaxCheckResult {
    let lines = source_lines(code);
    let mut braces: i64 = 0;
    let mut in_comment = false;
    let mut warnings = Vec::new();

    for (index, line) in lines.iter().enumerate() {
        let chars: Vec<char> = line.chars().collect();
        let mut i = 0;
        while i < chars.len() {
            let next = chars.get(i + 1).copied();
            match chars[i] {
                '/' if next == Some('*') && !in_comment => {
                    in_comment = true;
                    i += 2;
                    continue;
                }
                '*' if next == Some('/') && in_comment => {
                    in_comment = false;
                    i += 2;
                    continue;
                }
                '{' if !in_comment => braces += 1,
                '}' if !in_comment => braces -= 1,
                _ => {}
            }
            i += 1;
        }
        css_line_warnings(line, index + 1, &mut warnings);
    }

    let errors = balance_error(lines.len(), braces, "braces", '{', '}')
        .into_iter()
        .collect();
    SyntaxCheckResult::new(errors, warnings)
}

fn css_line_warnings(line: &str, line_no: usize, out: &mut Vec<CodeWarning>) {
    let trimmed = line.trim();

    let looks_like_declaration = !trimmed.is_empty()
        && trimmed.contains(':')
        && !trimmed.starts_with('@')
        && !trimmed.starts_with("/*")
        && !trimmed.ends_with("*/")
        && !trimmed.ends_with('{')
        && !trimmed.ends_with('}')
        && !trimmed.ends_with(',');
    if looks_like_declaration && !trimmed.ends_with(';') {
        out.push(warning(
            line_no,
            line.chars().count(),
            "Declaration is missing a trailing ';'",
            "declaration-block-trailing-semicolon",
        ));
    }

    if let Some(at) = line.find("!important") {
        out.push(warning(
            line_no,
            column_at(line, at),
            "Avoid '!important'; raise selector specificity instead",
            "declaration-no-important",
        ));
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn rules(result: &SyntaxCheckResult) -> Vec<&str> {
        result
            .warnings
            .iter()
            .filter_map(|w| w.rule.as_deref())
            .collect()
    }

    #[test]
    fn test_balanced_code_is_valid() {
        let code = "function f(a) {\n  return [a, (a + 1)];\n}\n";
        let result = check_javascript(code);
        assert!(result.valid);
        assert!(result.errors.is_empty());
    }

    #[test]
    fn test_unclosed_brace_reports_positive_count_on_last_line() {
        let result = check_javascript("if (x) {\n  go();\n");
        assert!(!result.valid);
        assert_eq!(result.errors.len(), 1);
        let err = &result.errors[0];
        assert_eq!(err.line, 3);
        assert_eq!(err.column, 0);
        assert!(err.message.contains("+1"));
        assert!(err.suggestion.is_some());
    }

    #[test]
    fn test_extra_closing_paren_reports_negative_count() {
        let result = check_javascript("go());");
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].message.contains("-1"));
        assert!(result.errors[0].message.contains("parentheses"));
    }

    #[test]
    fn test_brackets_in_strings_and_comments_ignored() {
        let code = "const s = \"{(\"; // }\n/* ] [ \n ) */ const t = '}';\nconst u = `${a}`;";
        let result = check_javascript(code);
        assert!(result.valid, "unexpected errors: {:?}", result.errors);
    }

    #[test]
    fn test_escaped_quotes_do_not_close_strings() {
        let result = check_javascript(r#"const s = "a \" { b";"#);
        assert!(result.valid);
        let result = check_javascript(r#"const s = "a \\" + f(;"#);
        assert!(!result.valid);
    }

    #[test]
    fn test_mixed_quotes_do_not_toggle() {
        let result = check_javascript(r#"const s = "it's { fine";"#);
        assert!(result.valid);
    }

    #[test]
    fn test_template_literal_spans_lines() {
        let result = check_javascript("const html = `\n<div>{\n`;");
        assert!(result.valid);
    }

    #[test]
    fn test_line_warnings() {
        let result = check_javascript("var x = 1; if (x == 1) { console.log('hi') }");
        assert_eq!(rules(&result), vec!["no-var", "eqeqeq", "no-console"]);
        assert_eq!(result.warnings[0].column, 1);
        assert_eq!(result.warnings[1].column, 18);
    }

    #[test]
    fn test_strict_equality_not_flagged() {
        let result = check_javascript("if (a === b && c !== d && e <= f) {}");
        assert!(rules(&result).is_empty());
    }

    #[test]
    fn test_loose_inequality_flagged_once_per_line() {
        let result = check_javascript("if (a != b || c == d) {}");
        assert_eq!(rules(&result), vec!["eqeqeq"]);
    }

    #[test]
    fn test_eval_and_document_write_warnings() {
        let result = check_javascript("eval(code);\ndocument.write('<p>');");
        assert_eq!(rules(&result), vec!["no-eval", "no-document-write"]);
        assert_eq!(result.warnings[1].line, 2);
    }

    #[test]
    fn test_css_missing_semicolon_and_important() {
        let css = "body {\n  color: red\n  margin: 0 !important;\n}";
        let result = check_css(css);
        assert!(result.valid);
        assert_eq!(
            rules(&result),
            vec!["declaration-block-trailing-semicolon", "declaration-no-important"]
        );
        assert_eq!(result.warnings[0].line, 2);
    }

    #[test]
    fn test_css_selectors_and_at_rules_not_flagged() {
        let css = "a:hover,\na:focus {\n  color: red;\n}\n@media (max-width: 600px) {\n}";
        let result = check_css(css);
        assert!(result.valid);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_css_unbalanced_braces() {
        let result = check_css("/* { */ div { color: red;");
        assert!(!result.valid);
        assert_eq!(result.errors.len(), 1);
    }

    #[test]
    fn test_valid_iff_no_errors() {
        for code in ["", "}", "{[(", "let a = [1, 2];", "/* unterminated"] {
            let result = check_javascript(code);
            assert_eq!(result.valid, result.errors.is_empty());
        }
    }
}
