use modforge_core::{GeneratedModuleData, ModforgeError, ModforgeResult};
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

#[allow(clippy::expect_used)]
static JSON_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```json\s*([\s\S]*?)\s*```").expect("valid regex"));

#[allow(clippy::expect_used)]
static JS_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"```(?:javascript|js)\b\s*([\s\S]*?)\s*```").expect("valid regex")
});

#[allow(clippy::expect_used)]
static CSS_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```css\s*([\s\S]*?)\s*```").expect("valid regex"));

/// Extracts a module draft from a development reply.
///
/// Tries a fenced JSON block, then the whole trimmed reply as JSON, then bare
/// fenced JavaScript (and optional CSS) blocks.
pub fn parse_module_response(response: &str) -> ModforgeResult<GeneratedModuleData> {
    let candidate = JSON_BLOCK
        .captures(response)
        .and_then(|c| c.get(1))
        .map_or_else(|| response.trim(), |m| m.as_str());

    match parse_module_json(candidate) {
        Ok(module) => Ok(module),
        Err(json_err) => extract_code_blocks(response).ok_or_else(|| {
            ModforgeError::Parse(format!(
                "could not parse the generated module ({json_err})"
            ))
        }),
    }
}

fn parse_module_json(text: &str) -> Result<GeneratedModuleData, String> {
    let value: Value = serde_json::from_str(text).map_err(|e| e.to_string())?;
    if !value.is_object() {
        return Err("module JSON is not an object".to_string());
    }
    serde_json::from_value(value).map_err(|e| e.to_string())
}

fn extract_code_blocks(response: &str) -> Option<GeneratedModuleData> {
    let js = first_group(&JS_BLOCK, response).filter(|js| !js.trim().is_empty())?;
    let css = first_group(&CSS_BLOCK, response).unwrap_or_default();
    Some(GeneratedModuleData::from_code(js, css))
}

fn first_group<'a>(pattern: &Regex, text: &'a str) -> Option<&'a str> {
    pattern
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Extracts the candidate fix from a repair reply.
///
/// Uses the first fenced JavaScript block, or the whole reply when there is
/// none. Returns `None` for blank code.
pub fn extract_fixed_code(reply: &str) -> Option<String> {
    let code = first_group(&JS_BLOCK, reply).unwrap_or(reply).trim();
    (!code.is_empty()).then(|| code.to_string())
}
