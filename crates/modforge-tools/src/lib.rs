//! Tool catalog, static analyzers and tool executor for Modforge.
//!
//! The catalog is a process-wide immutable table built on first use. Each
//! entry maps to a synchronous analyzer (or, for `create_module`, to the
//! configured [`modforge_core::ModuleStore`]). The [`ToolExecutor`] wraps
//! every outcome, including panics, in a [`modforge_core::ToolCallResult`].

/// Pattern-level analyzers.
pub mod analyzers;
/// Sequential tool chains.
pub mod chain;
/// Tool definitions and schema export.
pub mod catalog;
/// Tool dispatch.
pub mod executor;
/// Built-in templates and snippets.
pub mod library;

pub use analyzers::config::{ConfigValidationResult, ValidationIssue};
pub use analyzers::fix::RuleFixOutcome;
pub use analyzers::lint::LintReport;
pub use analyzers::security::{RiskLevel, SecurityIssue, SecurityScanResult};
pub use analyzers::{CodeError, CodeWarning, ErrorSeverity, Language, SyntaxCheckResult};
pub use catalog::{ParamType, ToolCategory, ToolDefinition, ToolParameter};
pub use chain::ToolChainEvent;
pub use executor::{code_arguments, CreateModuleOutcome, ToolExecutor};
