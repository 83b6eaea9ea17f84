//! Validation of module configuration item descriptors.

use super::ErrorSeverity;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One problem found in a configuration item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// Path of the offending item or field.
    pub field: String,
    /// Human-readable description.
    pub message: String,
    /// ERROR makes the configuration invalid; WARNING does not.
    pub severity: ErrorSeverity,
}

/// Result of the config validation tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigValidationResult {
    /// True iff no issue has ERROR severity.
    pub valid: bool,
    /// Issues in item order.
    pub issues: Vec<ValidationIssue>,
}

fn non_blank<'a>(item: &'a Map<String, Value>, name: &str) -> Option<&'a str> {
    item.get(name)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
}

/// Validates config item descriptors against the supplied values.
///
/// `items` are loosely typed JSON objects as produced by the model;
/// `values` maps config keys to user-supplied values.
pub fn validate_config(items: &[Value], values: &Map<String, Value>) -> ConfigValidationResult {
    let mut issues = Vec::new();

    for (index, item) in items.iter().enumerate() {
        let Some(item) = item.as_object() else {
            issues.push(ValidationIssue {
                field: format!("config_items[{index}]"),
                message: "Config item must be an object".to_string(),
                severity: ErrorSeverity::Error,
            });
            continue;
        };

        let key = non_blank(item, "key");
        let name = non_blank(item, "name");

        if key.is_none() {
            issues.push(ValidationIssue {
                field: "config_item".to_string(),
                message: "Config item is missing a key".to_string(),
                severity: ErrorSeverity::Error,
            });
        }

        if name.is_none() {
            issues.push(ValidationIssue {
                field: format!("config_item.{}", key.unwrap_or_default()),
                message: "Config item is missing a display name".to_string(),
                severity: ErrorSeverity::Warning,
            });
        }

        let required = item.get("required").and_then(Value::as_bool).unwrap_or(false);
        if let Some(key) = key {
            let supplied = values.get(key).is_some_and(|v| !v.is_null());
            if required && !supplied {
                issues.push(ValidationIssue {
                    field: key.to_string(),
                    message: format!(
                        "Required config item '{}' has no value",
                        name.unwrap_or(key)
                    ),
                    severity: ErrorSeverity::Error,
                });
            }
        }
    }

    ConfigValidationResult {
        valid: !issues.iter().any(|i| i.severity == ErrorSeverity::Error),
        issues,
    }
}
