#![allow(clippy::unwrap_used, clippy::expect_used)]

use async_trait::async_trait;
use futures_util::StreamExt;
use modforge_agent::*;
use modforge_core::{ChatMessage, ModforgeError, ModforgeResult, Role};
use modforge_session::{AgentState, ToolStatus};
use modforge_tools::{catalog, Language};
use serde_json::json;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

// ---------------------------------------------------------------------------
// Scripted model client
// ---------------------------------------------------------------------------

enum StreamScript {
    Events(Vec<ModelStreamEvent>),
    /// Opens a stream that never produces anything.
    Hang,
}

#[derive(Default)]
struct ScriptedClient {
    streams: Mutex<VecDeque<StreamScript>>,
    replies: Mutex<VecDeque<ModforgeResult<String>>>,
    stream_calls: AtomicUsize,
    chat_calls: AtomicUsize,
    held: Mutex<Vec<mpsc::Sender<ModelStreamEvent>>>,
    last_messages: Mutex<Vec<ChatMessage>>,
}

impl ScriptedClient {
    fn new() -> Self {
        Self::default()
    }

    fn stream(self, script: StreamScript) -> Self {
        self.streams.lock().unwrap().push_back(script);
        self
    }

    fn reply(self, reply: ModforgeResult<String>) -> Self {
        self.replies.lock().unwrap().push_back(reply);
        self
    }

    fn chat_calls(&self) -> usize {
        self.chat_calls.load(Ordering::SeqCst)
    }

    fn stream_calls(&self) -> usize {
        self.stream_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ModelClient for ScriptedClient {
    async fn chat(
        &self,
        _credentials: &ApiCredentials,
        _model_id: &str,
        messages: &[ChatMessage],
    ) -> ModforgeResult<String> {
        self.chat_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_messages.lock().unwrap() = messages.to_vec();
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ModforgeError::Model("no scripted reply".into())))
    }

    async fn chat_stream(
        &self,
        _credentials: &ApiCredentials,
        _model_id: &str,
        messages: &[ChatMessage],
    ) -> ModforgeResult<mpsc::Receiver<ModelStreamEvent>> {
        self.stream_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_messages.lock().unwrap() = messages.to_vec();
        let script = self
            .streams
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(StreamScript::Events(Vec::new()));
        let (tx, rx) = mpsc::channel(32);
        match script {
            StreamScript::Events(events) => {
                for event in events {
                    tx.try_send(event).unwrap();
                }
            }
            StreamScript::Hang => self.held.lock().unwrap().push(tx),
        }
        Ok(rx)
    }
}

fn settings() -> ProviderSettings {
    ProviderSettings {
        credentials: vec![ApiCredentials {
            id: "key".into(),
            provider: "openrouter".into(),
            api_key: "sk-test".into(),
            base_url: None,
        }],
        models: vec![SavedModel {
            id: "m1".into(),
            model_id: "coder-1".into(),
            credentials_id: "key".into(),
            alias: None,
            capabilities: vec![ModelCapability::ModuleDevelopment],
        }],
        default_model_id: None,
    }
}

fn module_reply(js_code: &str) -> String {
    let module = json!({
        "name": "Hide Banners",
        "description": "Hides cookie banners",
        "icon": "🍪",
        "category": "CONTENT_FILTER",
        "run_at": "DOCUMENT_END",
        "js_code": js_code,
        "css_code": "",
        "config_items": [],
        "url_matches": []
    });
    format!("```json\n{module}\n```")
}

/// Streams `text` in two content chunks, preceded by a thinking segment.
fn streamed(text: &str) -> StreamScript {
    let split = text.len() / 2;
    let split = (split..=text.len())
        .find(|i| text.is_char_boundary(*i))
        .unwrap();
    let (first, second) = text.split_at(split);
    StreamScript::Events(vec![
        ModelStreamEvent::Started,
        ModelStreamEvent::Thinking {
            delta: "planning".into(),
        },
        ModelStreamEvent::Content {
            delta: first.into(),
            accumulated: first.into(),
        },
        ModelStreamEvent::Content {
            delta: second.into(),
            accumulated: text.into(),
        },
        ModelStreamEvent::Done {
            full_text: text.into(),
        },
    ])
}

fn engine(client: &Arc<ScriptedClient>, config: AgentConfig) -> AgentEngine {
    AgentEngine::new(client.clone(), settings(), config)
}

fn error_code(outcome: &DevelopOutcome) -> Option<&str> {
    outcome.error.as_ref().and_then(|e| e.code.as_deref())
}

const VALID_JS: &str = "'use strict';\nconst banner = document.querySelector('.cookie');\nif (banner) { banner.remove(); }";
const BROKEN_JS: &str = "function hide() {\n  document.body.classList.add('x');";

// ---------------------------------------------------------------------------
// 1. Happy path
// ---------------------------------------------------------------------------

#[tokio::test]
async fn streamed_run_completes_with_scanned_module() {
    let client = Arc::new(ScriptedClient::new().stream(streamed(&module_reply(VALID_JS))));
    let engine = engine(&client, AgentConfig::default());

    let outcome = engine
        .develop_to_end(DevelopRequest::new("hide cookie banners"))
        .await;

    assert!(outcome.is_success(), "{:?}", outcome.error);
    assert_eq!(
        outcome.states(),
        vec![
            AgentState::Thinking,
            AgentState::Generating,
            AgentState::SyntaxChecking,
            AgentState::SecurityScanning,
            AgentState::Completed,
        ]
    );
    let module = outcome.module.clone().unwrap();
    assert_eq!(module.name, "Hide Banners");
    assert_eq!(module.security_safe, Some(true));
    assert!(matches!(outcome.events.last(), Some(AgentEvent::Completed { .. })));
    assert!(outcome
        .events
        .iter()
        .any(|e| matches!(e, AgentEvent::Thinking { accumulated, .. } if accumulated == "planning")));
    assert_eq!(client.chat_calls(), 0);
    assert_eq!(client.stream_calls(), 1);

    let snapshot = engine.session().snapshot();
    assert_eq!(snapshot.state, AgentState::Completed);
    assert_eq!(snapshot.memory.fix_attempt_count, 0);
    assert_eq!(snapshot.memory.tool_call_history.len(), 2);
    let last = snapshot.memory.conversation_history.last().unwrap();
    assert_eq!(last.role, Role::Assistant);
    assert_eq!(last.generated_module.as_ref(), Some(&module));
    assert_eq!(last.thoughts.as_deref(), Some("planning"));
}

#[tokio::test]
async fn tool_start_precedes_matching_complete() {
    let client = Arc::new(ScriptedClient::new().stream(streamed(&module_reply(VALID_JS))));
    let outcome = engine(&client, AgentConfig::default())
        .develop_to_end(DevelopRequest::new("x"))
        .await;

    let mut open = Vec::new();
    for event in &outcome.events {
        match event {
            AgentEvent::ToolStart { info } => {
                assert_eq!(info.status, ToolStatus::Executing);
                open.push(info.call_id.clone());
            }
            AgentEvent::ToolComplete { info } => {
                assert_eq!(open.pop().as_deref(), Some(info.call_id.as_str()));
                assert_eq!(info.status, ToolStatus::Success);
            }
            _ => {}
        }
    }
    assert!(open.is_empty());
}

#[tokio::test]
async fn prompt_carries_requirement_and_hints() {
    let client = Arc::new(ScriptedClient::new().stream(streamed(&module_reply(VALID_JS))));
    engine(&client, AgentConfig::default())
        .develop_to_end(
            DevelopRequest::new("hide cookie banners")
                .with_category(modforge_core::ModuleCategory::ContentFilter)
                .with_existing_code("let old = 1;"),
        )
        .await;

    let messages = client.last_messages.lock().unwrap().clone();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, Role::System);
    assert!(messages[0].content.contains("## Target Category"));
    assert_eq!(messages[1].role, Role::User);
    assert!(messages[1].content.contains("hide cookie banners"));
    assert!(messages[1].content.contains("let old = 1;"));
}

#[tokio::test]
async fn buffered_mode_emits_no_deltas() {
    let client = Arc::new(ScriptedClient::new().reply(Ok(module_reply(VALID_JS))));
    let config = AgentConfig {
        delivery: DeliveryMode::Buffered,
        ..AgentConfig::default()
    };
    let outcome = engine(&client, config)
        .develop_to_end(DevelopRequest::new("x"))
        .await;

    assert!(outcome.is_success());
    assert_eq!(client.stream_calls(), 0);
    assert_eq!(client.chat_calls(), 1);
    assert!(!outcome
        .events
        .iter()
        .any(|e| matches!(e, AgentEvent::Thinking { .. } | AgentEvent::Content { .. })));
}

// ---------------------------------------------------------------------------
// 2. Auto-fix loop
// ---------------------------------------------------------------------------

#[tokio::test]
async fn fix_loop_stops_after_three_attempts() {
    let broken_reply = format!("```javascript\n{BROKEN_JS}\n```");
    let client = Arc::new(
        ScriptedClient::new()
            .stream(streamed(&module_reply(BROKEN_JS)))
            .reply(Ok(broken_reply.clone()))
            .reply(Ok(broken_reply.clone()))
            .reply(Ok(broken_reply.clone()))
            .reply(Ok(broken_reply)),
    );
    let engine = engine(&client, AgentConfig::default());
    let outcome = engine.develop_to_end(DevelopRequest::new("x")).await;

    assert_eq!(client.chat_calls(), 3);
    assert_eq!(error_code(&outcome), Some(codes::MAX_FIX_ATTEMPTS_REACHED));
    let report = outcome.error.clone().unwrap();
    assert!(report.recoverable);
    assert!(report.message.contains("  - Line 2: "));
    assert!(outcome.module.is_none());

    let states = outcome.states();
    assert_eq!(
        states.iter().filter(|s| **s == AgentState::Fixing).count(),
        3
    );
    assert_eq!(
        states.iter().filter(|s| **s == AgentState::SyntaxChecking).count(),
        4
    );
    assert_eq!(states.last(), Some(&AgentState::Error));
    assert!(states.contains(&AgentState::SecurityScanning));

    let snapshot = engine.session().snapshot();
    assert_eq!(snapshot.memory.fix_attempt_count, 3);
    assert!(snapshot.memory.last_error.is_none());
    assert_eq!(snapshot.state, AgentState::Error);
    assert_eq!(snapshot.memory.syntax_check_results().len(), 4);
    let draft = snapshot.memory.current_module.unwrap();
    assert!(draft.security_safe.is_some());
}

#[tokio::test]
async fn fix_loop_recovers_on_second_attempt() {
    let client = Arc::new(
        ScriptedClient::new()
            .stream(streamed(&module_reply(BROKEN_JS)))
            .reply(Ok(format!("```js\n{BROKEN_JS}\n```")))
            .reply(Ok(format!(
                "Here is the fix:\n```javascript\n{BROKEN_JS}\n}}\n```"
            ))),
    );
    let engine = engine(&client, AgentConfig::default());
    let outcome = engine.develop_to_end(DevelopRequest::new("x")).await;

    assert!(outcome.is_success(), "{:?}", outcome.error);
    assert_eq!(client.chat_calls(), 2);
    assert_eq!(engine.session().read(|m| m.fix_attempt_count), 2);
    assert!(outcome.module.unwrap().js_code.ends_with('}'));
    let drafts = outcome
        .events
        .iter()
        .filter(|e| matches!(e, AgentEvent::ModuleGenerated { .. }))
        .count();
    assert_eq!(drafts, 3);

    let repair_prompt = client.last_messages.lock().unwrap().clone();
    assert!(repair_prompt[1].content.contains("attempt 2/3"));
}

#[tokio::test]
async fn failed_fix_call_ends_run() {
    let client = Arc::new(
        ScriptedClient::new()
            .stream(streamed(&module_reply(BROKEN_JS)))
            .reply(Err(ModforgeError::Model("HTTP 503".into()))),
    );
    let engine = engine(&client, AgentConfig::default());
    let outcome = engine.develop_to_end(DevelopRequest::new("x")).await;

    assert_eq!(client.chat_calls(), 1);
    assert_eq!(error_code(&outcome), Some(codes::AUTO_FIX_FAILED));
    assert!(outcome.error.as_ref().unwrap().recoverable);
    assert_eq!(engine.state(), AgentState::Error);
    let last_error = engine.session().read(|m| m.last_error.clone()).unwrap();
    assert!(last_error.contains("HTTP 503"));
}

#[tokio::test]
async fn blank_fix_reply_ends_run() {
    let client = Arc::new(
        ScriptedClient::new()
            .stream(streamed(&module_reply(BROKEN_JS)))
            .reply(Ok("   ".into())),
    );
    let outcome = engine(&client, AgentConfig::default())
        .develop_to_end(DevelopRequest::new("x"))
        .await;
    assert_eq!(error_code(&outcome), Some(codes::AUTO_FIX_FAILED));
    assert_eq!(client.chat_calls(), 1);
}

#[tokio::test]
async fn custom_fix_bound_is_respected() {
    let client = Arc::new(
        ScriptedClient::new()
            .stream(streamed(&module_reply(BROKEN_JS)))
            .reply(Ok(BROKEN_JS.into())),
    );
    let config = AgentConfig {
        max_fix_attempts: 1,
        ..AgentConfig::default()
    };
    let outcome = engine(&client, config)
        .develop_to_end(DevelopRequest::new("x"))
        .await;
    assert_eq!(client.chat_calls(), 1);
    assert_eq!(error_code(&outcome), Some(codes::MAX_FIX_ATTEMPTS_REACHED));
}

// ---------------------------------------------------------------------------
// 3. Failure paths
// ---------------------------------------------------------------------------

#[tokio::test]
async fn missing_credentials_is_unrecoverable() {
    let client = Arc::new(ScriptedClient::new());
    let engine = AgentEngine::new(client.clone(), ProviderSettings::default(), AgentConfig::default());
    let outcome = engine.develop_to_end(DevelopRequest::new("x")).await;

    let report = outcome.error.clone().unwrap();
    assert_eq!(report.code.as_deref(), Some("NO_API_KEY"));
    assert!(!report.recoverable);
    assert_eq!(outcome.states(), vec![AgentState::Thinking, AgentState::Error]);
    assert_eq!(client.stream_calls(), 0);
    assert!(engine.session().read(|m| m.last_error.is_some()));
}

#[tokio::test]
async fn unparseable_reply_keeps_raw_response() {
    let client = Arc::new(ScriptedClient::new().stream(streamed("Sorry, I can't do that.")));
    let engine = engine(&client, AgentConfig::default());
    let outcome = engine.develop_to_end(DevelopRequest::new("x")).await;

    let report = outcome.error.unwrap();
    assert_eq!(report.code.as_deref(), Some("PARSE_ERROR"));
    assert!(report.recoverable);
    assert_eq!(report.raw_response.as_deref(), Some("Sorry, I can't do that."));
    assert_eq!(engine.state(), AgentState::Error);
}

#[tokio::test]
async fn stream_error_reports_partial_content() {
    let client = Arc::new(ScriptedClient::new().stream(StreamScript::Events(vec![
        ModelStreamEvent::Content {
            delta: "```json".into(),
            accumulated: "```json".into(),
        },
        ModelStreamEvent::Error {
            message: "connection reset".into(),
        },
    ])));
    let outcome = engine(&client, AgentConfig::default())
        .develop_to_end(DevelopRequest::new("x"))
        .await;

    let report = outcome.error.unwrap();
    assert_eq!(report.code.as_deref(), Some("MODEL_ERROR"));
    assert!(report.message.contains("connection reset"));
    assert_eq!(report.raw_response.as_deref(), Some("```json"));
}

#[tokio::test]
async fn unfinished_stream_is_empty_response() {
    let client = Arc::new(ScriptedClient::new().stream(StreamScript::Events(vec![
        ModelStreamEvent::Started,
        ModelStreamEvent::Content {
            delta: "{".into(),
            accumulated: "{".into(),
        },
    ])));
    let outcome = engine(&client, AgentConfig::default())
        .develop_to_end(DevelopRequest::new("x"))
        .await;
    assert_eq!(error_code(&outcome), Some(codes::EMPTY_RESPONSE));
}

#[tokio::test(start_paused = true)]
async fn stalled_stream_times_out() {
    let client = Arc::new(ScriptedClient::new().stream(StreamScript::Hang));
    let config = AgentConfig {
        stream_timeout_secs: 5,
        ..AgentConfig::default()
    };
    let outcome = engine(&client, config)
        .develop_to_end(DevelopRequest::new("x"))
        .await;
    let report = outcome.error.unwrap();
    assert_eq!(report.code.as_deref(), Some("TIMEOUT"));
    assert!(report.recoverable);
}

// ---------------------------------------------------------------------------
// 4. Cancellation and generations
// ---------------------------------------------------------------------------

async fn wait_for_state(stream: &mut DevelopStream, wanted: AgentState) {
    while let Some(event) = stream.next().await {
        if matches!(event, AgentEvent::StateChange { state } if state == wanted) {
            return;
        }
    }
    panic!("stream ended before reaching {wanted}");
}

#[tokio::test]
async fn dropping_the_stream_abandons_the_run() {
    let client = Arc::new(ScriptedClient::new().stream(StreamScript::Hang));
    let engine = engine(&client, AgentConfig::default());
    let mut stream = engine.develop(DevelopRequest::new("x"));
    wait_for_state(&mut stream, AgentState::Generating).await;
    drop(stream);

    for _ in 0..100 {
        if engine.state() == AgentState::Idle {
            break;
        }
        tokio::task::yield_now().await;
    }
    assert_eq!(engine.state(), AgentState::Idle);
    assert_eq!(client.chat_calls(), 0);
}

#[tokio::test]
async fn cancel_stops_the_run() {
    let client = Arc::new(ScriptedClient::new().stream(StreamScript::Hang));
    let engine = engine(&client, AgentConfig::default());
    let mut stream = engine.develop(DevelopRequest::new("x"));
    wait_for_state(&mut stream, AgentState::Generating).await;

    stream.cancel();
    assert_eq!(engine.state(), AgentState::Idle);
    assert!(stream.next().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn newer_run_detaches_older_one() {
    let client = Arc::new(
        ScriptedClient::new()
            .stream(StreamScript::Hang)
            .stream(streamed(&module_reply(VALID_JS))),
    );
    let engine = engine(&client, AgentConfig::default());

    let mut first = engine.develop(DevelopRequest::new("first"));
    wait_for_state(&mut first, AgentState::Generating).await;

    let second = engine.develop_to_end(DevelopRequest::new("second")).await;
    assert!(second.is_success());

    // The stalled first run times out, but may no longer touch the session.
    let first = first.collect_outcome().await;
    assert_eq!(error_code(&first), Some("TIMEOUT"));

    let snapshot = engine.session().snapshot();
    assert_eq!(snapshot.state, AgentState::Completed);
    assert!(snapshot.memory.last_error.is_none());
    assert_eq!(snapshot.memory.iteration_count, 2);
    assert_eq!(snapshot.memory.current_requirement, "second");
}

#[tokio::test]
async fn reset_clears_session() {
    let client = Arc::new(ScriptedClient::new().stream(streamed(&module_reply(VALID_JS))));
    let engine = engine(&client, AgentConfig::default());
    engine.develop_to_end(DevelopRequest::new("x")).await;

    engine.reset();
    assert_eq!(engine.state(), AgentState::Idle);
    assert!(engine
        .session()
        .read(|m| m.conversation_history.is_empty() && m.current_module.is_none()));
}

// ---------------------------------------------------------------------------
// 5. Rule-based repair
// ---------------------------------------------------------------------------

fn tool_events(outcome: &DevelopOutcome) -> Vec<(&'static str, String, ToolStatus)> {
    outcome
        .events
        .iter()
        .filter_map(|e| match e {
            AgentEvent::ToolStart { info } => Some(("start", info.tool_name.clone(), info.status)),
            AgentEvent::ToolComplete { info } => {
                Some(("complete", info.tool_name.clone(), info.status))
            }
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn repair_of_valid_code_completes_without_model() {
    let client = Arc::new(ScriptedClient::new());
    let engine = engine(&client, AgentConfig::default());
    let outcome = engine
        .syntax_check_and_fix(VALID_JS, Language::JavaScript)
        .collect_outcome()
        .await;

    assert!(outcome.is_success(), "{:?}", outcome.error);
    assert!(outcome.module.is_none());
    assert_eq!(
        outcome.states(),
        vec![AgentState::SyntaxChecking, AgentState::Completed]
    );
    assert_eq!(
        tool_events(&outcome),
        vec![
            ("start", catalog::SYNTAX_CHECK.to_string(), ToolStatus::Executing),
            ("complete", catalog::SYNTAX_CHECK.to_string(), ToolStatus::Success),
        ]
    );
    assert_eq!(engine.state(), AgentState::Completed);
    assert_eq!(client.chat_calls() + client.stream_calls(), 0);
}

#[tokio::test]
async fn repair_reports_chain_failure() {
    let client = Arc::new(ScriptedClient::new());
    let config = AgentConfig {
        max_fix_attempts: 2,
        ..AgentConfig::default()
    };
    let engine = engine(&client, config);
    let outcome = engine
        .syntax_check_and_fix("var a = 1; if (a == 1) {", Language::JavaScript)
        .collect_outcome()
        .await;

    assert!(!outcome.is_success());
    let report = outcome.error.clone().unwrap();
    assert_eq!(report.code.as_deref(), Some(codes::TOOL_CHAIN_FAILED));
    assert!(report.recoverable);
    assert_eq!(
        outcome.states(),
        vec![
            AgentState::SyntaxChecking,
            AgentState::Fixing,
            AgentState::SyntaxChecking,
            AgentState::Fixing,
            AgentState::SyntaxChecking,
            AgentState::Error,
        ]
    );

    let tools = tool_events(&outcome);
    assert_eq!(tools.len(), 10);
    for pair in tools.chunks(2) {
        assert_eq!(pair[0].0, "start");
        assert_eq!(pair[1].0, "complete");
        assert_eq!(pair[0].1, pair[1].1);
    }
    assert_eq!(tools[2].1, catalog::FIX_ERROR);

    let (history, last_error) = engine
        .session()
        .read(|m| (m.tool_call_history.clone(), m.last_error.clone()));
    assert_eq!(history.len(), 5);
    assert!(history.iter().all(|c| c.status == ToolStatus::Success));
    assert_eq!(last_error.as_deref(), Some(report.message.as_str()));
    assert_eq!(engine.state(), AgentState::Error);
}

#[tokio::test]
async fn repair_feeds_fixed_code_into_next_check() {
    let client = Arc::new(ScriptedClient::new());
    let config = AgentConfig {
        max_fix_attempts: 1,
        ..AgentConfig::default()
    };
    let outcome = engine(&client, config)
        .syntax_check_and_fix("var a = 1; if (a == 1) {", Language::JavaScript)
        .collect_outcome()
        .await;

    let checked: Vec<_> = outcome
        .events
        .iter()
        .filter_map(|e| match e {
            AgentEvent::ToolStart { info } if info.tool_name == catalog::SYNTAX_CHECK => {
                info.arguments.get("code").cloned()
            }
            _ => None,
        })
        .collect();
    assert_eq!(
        checked,
        vec![
            json!("var a = 1; if (a == 1) {"),
            json!("let a = 1; if (a === 1) {"),
        ]
    );
    assert_eq!(error_code(&outcome), Some(codes::TOOL_CHAIN_FAILED));
}
