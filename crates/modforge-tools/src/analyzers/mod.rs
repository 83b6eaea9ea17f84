//! Pattern-level static analyzers backing the catalog tools.
//!
//! Every analyzer is a pure, synchronous function over source text. None of
//! them parse JavaScript or CSS; they scan lines with small state machines
//! and regular expressions.

pub mod config;
pub mod fix;
pub mod lint;
pub mod security;
pub mod syntax;

use modforge_core::{ModforgeError, ModforgeResult};
use serde::{Deserialize, Serialize};

/// Source language understood by the analyzers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// JavaScript.
    JavaScript,
    /// CSS.
    Css,
}

impl Language {
    /// Parses a language tag, accepting `js` as an alias.
    pub fn parse(tag: &str) -> ModforgeResult<Self> {
        match tag.trim().to_lowercase().as_str() {
            "javascript" | "js" => Ok(Language::JavaScript),
            "css" => Ok(Language::Css),
            _ => Err(ModforgeError::UnsupportedLanguage(tag.to_string())),
        }
    }

    /// Canonical tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::JavaScript => "javascript",
            Language::Css => "css",
        }
    }
}

/// Severity of a code finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorSeverity {
    /// Must be fixed.
    Error,
    /// Should be fixed.
    Warning,
    /// Optional improvement.
    Info,
    /// Hint.
    Hint,
}

/// A positioned finding. Lines and columns are 1-based; column 0 means the
/// finding applies to the line as a whole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeError {
    /// 1-based line number.
    pub line: usize,
    /// 1-based column, or 0 for the whole line.
    pub column: usize,
    /// Human-readable description.
    pub message: String,
    /// Severity.
    pub severity: ErrorSeverity,
    /// Stable rule identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule: Option<String>,
    /// Suggested remediation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

/// A positioned warning; implicitly of [`ErrorSeverity::Warning`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeWarning {
    /// 1-based line number.
    pub line: usize,
    /// 1-based column.
    pub column: usize,
    /// Human-readable description.
    pub message: String,
    /// Stable rule identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule: Option<String>,
}

/// Result of the syntax check tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntaxCheckResult {
    /// True iff `errors` is empty.
    pub valid: bool,
    /// Blocking findings.
    pub errors: Vec<CodeError>,
    /// Non-blocking findings.
    pub warnings: Vec<CodeWarning>,
}

impl SyntaxCheckResult {
    /// Builds a result, deriving `valid` from the error list.
    pub fn new(errors: Vec<CodeError>, warnings: Vec<CodeWarning>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
            warnings,
        }
    }
}

/// Splits source into lines the way editors number them: a trailing newline
/// yields a final empty line and `\r\n` endings are normalized.
pub(crate) fn source_lines(code: &str) -> Vec<&str> {
    code.split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .collect()
}

/// 1-based column of a byte offset within a line.
pub(crate) fn column_at(line: &str, byte_offset: usize) -> usize {
    line.get(..byte_offset)
        .map_or(0, |prefix| prefix.chars().count())
        + 1
}
