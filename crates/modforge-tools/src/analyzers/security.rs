//! Ordered regex rules flagging risky browser APIs.

use super::source_lines;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Risk of a finding; ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    /// Worth knowing about.
    Low,
    /// Review before shipping.
    Medium,
    /// Makes the module unsafe.
    High,
    /// Makes the module unsafe.
    Critical,
}

/// One security finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityIssue {
    /// Stable identifier of the rule that matched.
    #[serde(rename = "type")]
    pub rule_id: String,
    /// What the pattern indicates.
    pub description: String,
    /// 1-based line of the match.
    #[serde(default)]
    pub line: Option<usize>,
    /// Severity of the rule.
    pub severity: RiskLevel,
    /// How to avoid the pattern.
    pub recommendation: String,
}

/// Result of the security scan tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityScanResult {
    /// False iff any issue is HIGH or CRITICAL.
    pub safe: bool,
    /// Findings in line order, then rule order.
    pub issues: Vec<SecurityIssue>,
    /// Highest severity observed; LOW when there are no issues.
    pub risk_level: RiskLevel,
}

struct SecurityRule {
    id: &'static str,
    pattern: Regex,
    severity: RiskLevel,
    description: &'static str,
    recommendation: &'static str,
}

fn rule(
    id: &'static str,
    pattern: &str,
    severity: RiskLevel,
    description: &'static str,
    recommendation: &'static str,
) -> SecurityRule {
    #[allow(clippy::expect_used)] // Hardcoded rule table
    let pattern = RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .expect("Hardcoded security pattern should be valid");
    SecurityRule {
        id,
        pattern,
        severity,
        description,
        recommendation,
    }
}

static RULES: LazyLock<Vec<SecurityRule>> = LazyLock::new(|| {
    vec![
        rule(
            "eval",
            r"eval\s*\(",
            RiskLevel::High,
            "eval() executes arbitrary strings as code",
            "Parse data with JSON.parse or call functions directly",
        ),
        rule(
            "inner-html",
            r"innerHTML\s*=",
            RiskLevel::High,
            "Assigning innerHTML can inject untrusted markup (XSS)",
            "Use textContent or build nodes with createElement",
        ),
        rule(
            "document-write",
            r"document\.write\s*\(",
            RiskLevel::Medium,
            "document.write() can overwrite the page and inject markup",
            "Insert nodes with appendChild or insertAdjacentElement",
        ),
        rule(
            "dynamic-function",
            r"new\s+Function\s*\(",
            RiskLevel::Medium,
            "new Function() compiles strings into code",
            "Define the function statically",
        ),
        rule(
            "location-redirect",
            r"location\s*=|location\.href\s*=",
            RiskLevel::Low,
            "Assigning location navigates the page",
            "Validate the target URL before redirecting",
        ),
        rule(
            "web-storage",
            r"localStorage|sessionStorage",
            RiskLevel::Low,
            "Web storage is readable by every script on the origin",
            "Do not store credentials or personal data in web storage",
        ),
        rule(
            "network-request",
            r"XMLHttpRequest|fetch\s*\(",
            RiskLevel::Low,
            "The module performs network requests",
            "Only contact trusted endpoints and validate responses",
        ),
        rule(
            "post-message",
            r"postMessage\s*\(",
            RiskLevel::Low,
            "postMessage crosses window boundaries",
            "Specify an explicit target origin and check event.origin",
        ),
        rule(
            "template-injection",
            r"\$\{.*\}",
            RiskLevel::Low,
            "Template interpolation may embed untrusted values",
            "Escape interpolated values before inserting them into markup",
        ),
        rule(
            "base64",
            r"atob\s*\(|btoa\s*\(",
            RiskLevel::Low,
            "Base64 encoding is sometimes used to hide payloads",
            "Keep encoded data readable or document its purpose",
        ),
    ]
});

/// Scans `code` line by line against the rule table.
///
/// Each rule reports at most once per line; different rules matching the
/// same line each report.
pub fn scan_security(code: &str) -> SecurityScanResult {
    let mut issues = Vec::new();
    for (index, line) in source_lines(code).into_iter().enumerate() {
        for rule in RULES.as_slice() {
            if rule.pattern.is_match(line) {
                issues.push(SecurityIssue {
                    rule_id: rule.id.to_string(),
                    description: rule.description.to_string(),
                    line: Some(index + 1),
                    severity: rule.severity,
                    recommendation: rule.recommendation.to_string(),
                });
            }
        }
    }

    let risk_level = issues
        .iter()
        .map(|issue| issue.severity)
        .max()
        .unwrap_or(RiskLevel::Low);
    SecurityScanResult {
        safe: risk_level < RiskLevel::High,
        issues,
        risk_level,
    }
}
