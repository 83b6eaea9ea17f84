use anyhow::{anyhow, Context};
use modforge_agent::ProviderSettings;
use modforge_tools::analyzers::config::validate_config;
use modforge_tools::{catalog, ConfigValidationResult, Language};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::path::Path;

/// Function schemas for every tool, or for the one named.
pub fn tool_schemas(name: Option<&str>) -> anyhow::Result<Value> {
    match name {
        Some(name) => catalog::get(name)
            .map(catalog::ToolDefinition::to_function_schema)
            .ok_or_else(|| anyhow!("unknown tool '{name}'")),
        None => Ok(Value::Array(catalog::function_schemas())),
    }
}

/// Language from the flag, or from the file extension (`.css` is CSS,
/// everything else JavaScript).
pub fn resolve_language(path: &Path, explicit: Option<&str>) -> anyhow::Result<Language> {
    if let Some(tag) = explicit {
        return Ok(Language::parse(tag)?);
    }
    let is_css = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("css"));
    Ok(if is_css {
        Language::Css
    } else {
        Language::JavaScript
    })
}

#[derive(Deserialize)]
struct ConfigDocument {
    #[serde(default, alias = "configItems")]
    config_items: Vec<Value>,
    #[serde(default, alias = "configValues")]
    config_values: Map<String, Value>,
}

/// Validates a `{config_items, config_values}` JSON document.
pub fn validate_config_document(text: &str) -> anyhow::Result<ConfigValidationResult> {
    const SHAPE: &str = "expected {\"config_items\": [...], \"config_values\": {...}}";
    let value: Value = serde_json::from_str(text).context(SHAPE)?;
    if !value.is_object() {
        return Err(anyhow!("config document is not a JSON object; {SHAPE}"));
    }
    let document: ConfigDocument = serde_json::from_value(value).context(SHAPE)?;
    Ok(validate_config(&document.config_items, &document.config_values))
}

/// Configured models and the engine's selection.
pub fn model_report(settings: &ProviderSettings) -> Value {
    let models: Vec<Value> = settings
        .models
        .iter()
        .map(|m| {
            json!({
                "id": m.id,
                "name": m.display_name(),
                "model_id": m.model_id,
                "credentials_id": m.credentials_id,
                "capabilities": m.capabilities,
            })
        })
        .collect();

    let selection = match settings.select_model(None) {
        Ok(resolved) => json!({
            "model": resolved.model.id,
            "provider": resolved.credentials.provider,
        }),
        Err(e) => json!({
            "error": e.to_string(),
            "code": e.code(),
        }),
    };

    json!({
        "credentials": settings.credentials.len(),
        "models": models,
        "default_model_id": settings.default_model_id,
        "selected": selection,
    })
}
