use crate::analyzers::config::validate_config;
use crate::analyzers::fix::apply_rule_fixes;
use crate::analyzers::lint::lint;
use crate::analyzers::security::scan_security;
use crate::analyzers::syntax::check_syntax;
use crate::analyzers::Language;
use crate::catalog;
use crate::library::{find_snippets, find_templates};
use futures_util::FutureExt;
use modforge_core::{
    ConfigItemDescriptor, GeneratedModuleData, ModforgeError, ModforgeResult, ModuleStore,
    ToolArguments, ToolCallRequest, ToolCallResult,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn, Instrument};

/// Payload of a successful `create_module` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateModuleOutcome {
    /// Id assigned by the store.
    pub module_id: String,
    /// Stored module name.
    pub name: String,
    /// Confirmation text.
    pub message: String,
}

/// Dispatches catalog tool calls to their implementations.
///
/// `execute` never fails: unknown tools, bad arguments, analyzer errors and
/// panics all become a failed [`ToolCallResult`] carrying the request's
/// call id.
#[derive(Clone, Default)]
pub struct ToolExecutor {
    store: Option<Arc<dyn ModuleStore>>,
}

impl ToolExecutor {
    /// An executor without a module store; `create_module` will fail.
    pub fn new() -> Self {
        Self { store: None }
    }

    /// An executor that persists modules through `store`.
    pub fn with_store(store: Arc<dyn ModuleStore>) -> Self {
        Self { store: Some(store) }
    }

    /// Runs one tool call and times it.
    pub async fn execute(&self, request: &ToolCallRequest) -> ToolCallResult {
        let span = tracing::info_span!(
            "tool.execute",
            tool = %request.tool_name,
            call_id = %request.call_id
        );
        let start = Instant::now();
        let outcome = AssertUnwindSafe(self.dispatch(request))
            .catch_unwind()
            .instrument(span.clone())
            .await;
        let elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
        let _enter = span.enter();

        match outcome {
            Ok(Ok(value)) => {
                info!(elapsed_ms, "Tool completed");
                ToolCallResult::success(request, value, elapsed_ms)
            }
            Ok(Err(err)) => {
                warn!(elapsed_ms, error = %err, "Tool failed");
                ToolCallResult::failure(request, err.to_string(), elapsed_ms)
            }
            Err(panic) => {
                let err = ModforgeError::Analyzer(panic_message(panic.as_ref()));
                error!(elapsed_ms, error = %err, "Tool panicked");
                ToolCallResult::failure(request, err.to_string(), elapsed_ms)
            }
        }
    }

    async fn dispatch(&self, request: &ToolCallRequest) -> ModforgeResult<Value> {
        let definition = catalog::get(&request.tool_name)
            .ok_or_else(|| ModforgeError::UnknownTool(request.tool_name.clone()))?;
        let args = &request.arguments;
        definition.validate(args)?;
        debug!(arguments = args.iter().count(), "Dispatching tool");

        match definition.name.as_str() {
            catalog::SYNTAX_CHECK => {
                let result = check_syntax(args.require_str("code")?, language_arg(args)?);
                to_payload(&result)
            }
            catalog::LINT_CODE => to_payload(&lint(args.require_str("code")?, language_arg(args)?)),
            catalog::SECURITY_SCAN => to_payload(&scan_security(args.require_str("code")?)),
            catalog::FIX_ERROR => {
                let outcome = apply_rule_fixes(args.require_str("code")?, language_arg(args)?);
                to_payload(&outcome)
            }
            catalog::VALIDATE_CONFIG => {
                let items = args.opt_array("config_items")?.cloned().unwrap_or_default();
                let values = args.opt_object("config_values")?.cloned().unwrap_or_default();
                to_payload(&validate_config(&items, &values))
            }
            catalog::GET_TEMPLATES => {
                let keywords = args.opt_string_list("keywords")?;
                to_payload(&find_templates(args.opt_str("category")?, &keywords))
            }
            catalog::GET_SNIPPETS => {
                let query = args.require_str("query")?;
                to_payload(&find_snippets(query, args.opt_str("category")?))
            }
            catalog::CREATE_MODULE => to_payload(&self.create_module(args).await?),
            other => Err(ModforgeError::UnknownTool(other.to_string())),
        }
    }

    async fn create_module(&self, args: &ToolArguments) -> ModforgeResult<CreateModuleOutcome> {
        let store = self
            .store
            .as_ref()
            .ok_or_else(|| ModforgeError::Store("no module store configured".into()))?;

        let mut draft = GeneratedModuleData::from_code(
            args.require_str("js_code")?,
            args.opt_str("css_code")?.unwrap_or_default(),
        );
        draft.name = args.require_str("name")?.to_string();
        draft.description = args.require_str("description")?.to_string();
        draft.category = args.require_str("category")?.to_string();
        draft.icon = args.opt_str("icon")?.unwrap_or("📦").to_string();
        if let Some(run_at) = args.opt_str("run_at")? {
            draft.run_at = run_at.to_string();
        }
        draft.url_matches = args.opt_string_list("url_matches")?;
        draft.config_items = args
            .opt_array("config_items")?
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| serde_json::from_value::<ConfigItemDescriptor>(item.clone()).ok())
                    .collect()
            })
            .unwrap_or_default();

        let saved = store.add_module(draft.to_extension_module()).await?;
        info!(module_id = %saved.id, name = %saved.name, "Module created");
        Ok(CreateModuleOutcome {
            message: format!("Module '{}' created", saved.name),
            module_id: saved.id,
            name: saved.name,
        })
    }
}

fn language_arg(args: &ToolArguments) -> ModforgeResult<Language> {
    Language::parse(args.opt_str("language")?.unwrap_or("javascript"))
}

fn to_payload<T: Serialize>(value: &T) -> ModforgeResult<Value> {
    Ok(serde_json::to_value(value)?)
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "tool panicked".to_string()
    }
}

/// Builds `{"code": .., "language": ..}` arguments for the analysis tools.
pub fn code_arguments(code: &str, language: Language) -> ToolArguments {
    let mut map = Map::new();
    map.insert("code".into(), Value::String(code.to_string()));
    map.insert("language".into(), Value::String(language.as_str().to_string()));
    ToolArguments::from(map)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::analyzers::security::SecurityScanResult;
    use crate::analyzers::SyntaxCheckResult;
    use modforge_core::InMemoryModuleStore;
    use serde_json::json;

    #[tokio::test]
    async fn test_syntax_check_roundtrip() {
        let executor = ToolExecutor::new();
        let request = ToolCallRequest::new(
            catalog::SYNTAX_CHECK,
            code_arguments("if (a) {", Language::JavaScript),
        );
        let result = executor.execute(&request).await;
        assert!(result.success);
        assert_eq!(result.call_id, request.call_id);
        let syntax: SyntaxCheckResult = result.decode().unwrap();
        assert!(!syntax.valid);
    }

    #[tokio::test]
    async fn test_unknown_tool_fails_softly() {
        let executor = ToolExecutor::new();
        let request = ToolCallRequest::new("rm_rf", ToolArguments::new());
        let result = executor.execute(&request).await;
        assert!(!result.success);
        assert_eq!(result.call_id, request.call_id);
        assert_eq!(result.error.as_deref(), Some("Unknown tool: rm_rf"));
    }

    #[tokio::test]
    async fn test_missing_and_mistyped_arguments() {
        let executor = ToolExecutor::new();
        let missing = ToolCallRequest::new(catalog::SECURITY_SCAN, ToolArguments::new());
        let result = executor.execute(&missing).await;
        assert!(result.error.unwrap().contains("Missing required argument: code"));

        let mistyped = ToolCallRequest::new(
            catalog::SECURITY_SCAN,
            ToolArguments::new().with("code", json!(["eval(x)"])),
        );
        let result = executor.execute(&mistyped).await;
        assert!(result.error.unwrap().contains("expected string"));
    }

    #[tokio::test]
    async fn test_unsupported_language() {
        let executor = ToolExecutor::new();
        let request = ToolCallRequest::new(
            catalog::LINT_CODE,
            ToolArguments::new().with("code", "x").with("language", "python"),
        );
        let result = executor.execute(&request).await;
        assert!(!result.success);
        assert!(result.error.unwrap().contains("python"));
    }

    #[tokio::test]
    async fn test_security_scan_payload() {
        let executor = ToolExecutor::new();
        let request = ToolCallRequest::new(
            catalog::SECURITY_SCAN,
            ToolArguments::new().with("code", "eval(userInput)"),
        );
        let scan: SecurityScanResult = executor.execute(&request).await.decode().unwrap();
        assert!(!scan.safe);
    }

    #[tokio::test]
    async fn test_create_module_without_store() {
        let executor = ToolExecutor::new();
        let request = ToolCallRequest::new(
            catalog::CREATE_MODULE,
            ToolArguments::new()
                .with("name", "Hider")
                .with("description", "Hides ads")
                .with("category", "CONTENT_FILTER")
                .with("js_code", "'use strict';"),
        );
        let result = executor.execute(&request).await;
        assert!(!result.success);
        assert!(result.error.unwrap().starts_with("Store error"));
    }

    #[tokio::test]
    async fn test_create_module_with_store() {
        let store = Arc::new(InMemoryModuleStore::new());
        let executor = ToolExecutor::with_store(store.clone());
        let request = ToolCallRequest::new(
            catalog::CREATE_MODULE,
            ToolArguments::new()
                .with("name", "Hider")
                .with("description", "Hides ads")
                .with("category", "content_filter")
                .with("js_code", "'use strict';")
                .with("url_matches", json!(["*://example.com/*"]))
                .with("config_items", json!([{"key": "sel", "name": "Selector"}])),
        );
        let result = executor.execute(&request).await;
        assert!(result.success, "{:?}", result.error);
        let outcome: CreateModuleOutcome = result.decode().unwrap();
        let stored = store.get_module(&outcome.module_id).await.unwrap().unwrap();
        assert_eq!(stored.icon, "📦");
        assert_eq!(stored.config_items.len(), 1);
        assert_eq!(stored.url_matches, vec!["*://example.com/*"]);
    }

    #[test]
    fn test_panic_message_variants() {
        let boxed: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(boxed.as_ref()), "boom");
        let boxed: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(boxed.as_ref()), "bang");
        let boxed: Box<dyn Any + Send> = Box::new(42_u8);
        assert_eq!(panic_message(boxed.as_ref()), "tool panicked");
    }
}
