#![allow(clippy::unwrap_used, clippy::expect_used)]

use modforge_core::*;
use serde_json::json;
use std::sync::Arc;

// ---------------------------------------------------------------------------
// 1. Model JSON -> draft -> persisted module
// ---------------------------------------------------------------------------

#[tokio::test]
async fn model_json_to_stored_module() {
    let raw = json!({
        "name": "Dark Reader",
        "description": "Darkens every page",
        "icon": "🌙",
        "category": "THEME",
        "run_at": "DOCUMENT_START",
        "js_code": "'use strict';\nconst root = document.documentElement;",
        "css_code": "html { filter: invert(1); }",
        "config_items": [
            {
                "key": "strength",
                "name": "Strength",
                "description": "Filter strength",
                "type": "RANGE",
                "defaultValue": "1",
                "options": []
            }
        ],
        "url_matches": ["*://*/*"]
    });

    let draft: GeneratedModuleData = serde_json::from_value(raw).unwrap();
    assert_eq!(draft.category(), ModuleCategory::Theme);
    assert_eq!(draft.run_at(), RunAt::DocumentStart);

    let store: Arc<dyn ModuleStore> = Arc::new(InMemoryModuleStore::new());
    let saved = store
        .add_module(draft.with_security_safe(true).to_extension_module())
        .await
        .unwrap();

    assert_eq!(saved.name, "Dark Reader");
    assert_eq!(saved.icon, "🌙");
    assert_eq!(saved.config_items[0].item_type, ConfigItemType::Range);
    assert_eq!(saved.url_matches, vec!["*://*/*"]);

    let listed = store.list_modules().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, saved.id);
}

// ---------------------------------------------------------------------------
// 2. Tool request/result correlation through serde
// ---------------------------------------------------------------------------

#[test]
fn tool_request_result_roundtrip() {
    let request = ToolCallRequest::new(
        "syntax_check",
        ToolArguments::new().with("code", "let a = 1;").with("language", "javascript"),
    );
    let result = ToolCallResult::success(&request, json!({"valid": true}), 2);

    let json = serde_json::to_string(&result).unwrap();
    let back: ToolCallResult = serde_json::from_str(&json).unwrap();
    assert_eq!(back.call_id, request.call_id);
    assert_eq!(back, result);

    #[derive(serde::Deserialize)]
    struct Verdict {
        valid: bool,
    }
    assert!(back.decode::<Verdict>().unwrap().valid);
}

// ---------------------------------------------------------------------------
// 3. Conversation entries carry tool traffic and modules
// ---------------------------------------------------------------------------

#[test]
fn agent_message_with_tool_results() {
    let request = ToolCallRequest::new("security_scan", ToolArguments::new().with("code", "x"));
    let result = ToolCallResult::failure(&request, "Analyzer error: boom", 1);
    let msg = AgentMessage::tool("security_scan failed", vec![result]);

    assert_eq!(msg.role, Role::Tool);
    assert_eq!(msg.tool_results.len(), 1);
    assert!(!msg.tool_results[0].success);

    let module = GeneratedModuleData::from_code("let a;", "");
    let reply = AgentMessage::assistant("done").with_module(module);
    let json = serde_json::to_value(&reply).unwrap();
    assert_eq!(json["role"], "assistant");
    assert_eq!(json["generated_module"]["name"], "AI Generated Module");
}

// ---------------------------------------------------------------------------
// 4. Error taxonomy
// ---------------------------------------------------------------------------

#[test]
fn error_codes_and_from_impls() {
    let parse: ModforgeError = serde_json::from_str::<serde_json::Value>("{")
        .unwrap_err()
        .into();
    assert_eq!(parse.code(), "JSON_ERROR");

    let io: ModforgeError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
    assert!(io.to_string().contains("gone"));
    assert!(!io.is_configuration());

    assert_eq!(ModforgeError::UnknownTool("x".into()).to_string(), "Unknown tool: x");
}
