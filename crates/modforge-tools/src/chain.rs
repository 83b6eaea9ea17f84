//! Sequential tool chains with result passing between steps.

use crate::analyzers::fix::RuleFixOutcome;
use crate::analyzers::{Language, SyntaxCheckResult};
use crate::catalog;
use crate::executor::{code_arguments, ToolExecutor};
use futures_util::stream::{self, Stream};
use modforge_core::{ToolCallRequest, ToolCallResult};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::VecDeque;
use tracing::{debug, info, warn};

const PLACEHOLDER: &str = "{{previous_result}}";
const FIELD_PREFIX: &str = "{{previous_result.";

/// Progress of a tool chain.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolChainEvent {
    /// The chain is about to run `total_tools` tools.
    ChainStarted {
        /// Number of requests in the chain.
        total_tools: usize,
    },
    /// A tool is starting, with placeholders already substituted.
    ToolStarted {
        /// Position in the chain.
        index: usize,
        /// The request as executed.
        request: ToolCallRequest,
    },
    /// A tool finished.
    ToolCompleted {
        /// Position in the chain.
        index: usize,
        /// Its result.
        result: ToolCallResult,
    },
    /// Every tool ran.
    ChainCompleted {
        /// Results in chain order.
        results: Vec<ToolCallResult>,
    },
    /// A tool failed and the chain stopped.
    ChainFailed {
        /// Position of the failed tool.
        failed_index: usize,
        /// Failure description.
        error: String,
        /// Results up to and including the failure.
        completed_results: Vec<ToolCallResult>,
    },
}

/// Runs steps and queues their events for the stream.
struct StepRecorder {
    executor: ToolExecutor,
    next_index: usize,
    results: Vec<ToolCallResult>,
    pending: VecDeque<ToolChainEvent>,
    finished: bool,
}

impl StepRecorder {
    fn new(executor: ToolExecutor) -> Self {
        Self {
            executor,
            next_index: 0,
            results: Vec::new(),
            pending: VecDeque::new(),
            finished: false,
        }
    }

    async fn run(&mut self, request: ToolCallRequest) -> (usize, ToolCallResult) {
        let index = self.next_index;
        self.next_index += 1;
        self.pending.push_back(ToolChainEvent::ToolStarted {
            index,
            request: request.clone(),
        });
        let result = self.executor.execute(&request).await;
        self.results.push(result.clone());
        self.pending.push_back(ToolChainEvent::ToolCompleted {
            index,
            result: result.clone(),
        });
        (index, result)
    }

    fn complete(&mut self) {
        info!(tools = self.results.len(), "Tool chain completed");
        let results = std::mem::take(&mut self.results);
        self.finish(ToolChainEvent::ChainCompleted { results });
    }

    fn fail(&mut self, failed_index: usize, error: String) {
        warn!(failed_index, %error, "Tool chain failed");
        let completed_results = std::mem::take(&mut self.results);
        self.finish(ToolChainEvent::ChainFailed {
            failed_index,
            error,
            completed_results,
        });
    }

    fn finish(&mut self, event: ToolChainEvent) {
        self.pending.push_back(event);
        self.finished = true;
    }
}

struct ChainState {
    steps: StepRecorder,
    requests: VecDeque<ToolCallRequest>,
    stop_on_failure: bool,
    started: bool,
    previous: Option<Value>,
}

impl ChainState {
    async fn advance(&mut self) {
        if !self.started {
            self.started = true;
            if self.requests.is_empty() {
                self.steps.complete();
            } else {
                info!(total_tools = self.requests.len(), "Tool chain started");
                self.steps.pending.push_back(ToolChainEvent::ChainStarted {
                    total_tools: self.requests.len(),
                });
            }
            return;
        }

        let Some(request) = self.requests.pop_front() else {
            self.steps.complete();
            return;
        };

        let request = match &self.previous {
            Some(previous) => substitute_previous_result(request, previous),
            None => request,
        };
        let (index, result) = self.steps.run(request).await;

        if !result.success && self.stop_on_failure {
            let error = result
                .error
                .unwrap_or_else(|| "tool execution failed".to_string());
            self.steps.fail(index, error);
            return;
        }
        self.previous = result.result;
    }
}

struct FixChainState {
    steps: StepRecorder,
    code: String,
    language: Language,
    max_attempts: u32,
    attempts: u32,
    started: bool,
}

impl FixChainState {
    /// One check, followed by one fix when the check found errors.
    async fn advance(&mut self) {
        if !self.started {
            self.started = true;
            let total_tools = self.max_attempts as usize * 2 + 1;
            info!(
                total_tools,
                language = self.language.as_str(),
                "Check-and-fix chain started"
            );
            self.steps
                .pending
                .push_back(ToolChainEvent::ChainStarted { total_tools });
            return;
        }

        let check = ToolCallRequest::new(
            catalog::SYNTAX_CHECK,
            code_arguments(&self.code, self.language),
        );
        let (check_index, result) = self.steps.run(check).await;
        if !result.success {
            let error = result
                .error
                .unwrap_or_else(|| "syntax check failed".to_string());
            self.steps.fail(check_index, error);
            return;
        }
        let errors = match result.decode::<SyntaxCheckResult>() {
            Some(check) if !check.valid => check.errors,
            _ => {
                self.steps.complete();
                return;
            }
        };

        if self.attempts >= self.max_attempts {
            self.steps.fail(
                check_index,
                format!(
                    "Reached the maximum of {} fix attempts; {} syntax errors remain",
                    self.max_attempts,
                    errors.len()
                ),
            );
            return;
        }
        self.attempts += 1;
        debug!(attempt = self.attempts, errors = errors.len(), "Applying rule-based fixes");

        let reported: Vec<Value> = errors
            .iter()
            .map(|e| json!({"line": e.line, "message": e.message, "suggestion": e.suggestion}))
            .collect();
        let fix = ToolCallRequest::new(
            catalog::FIX_ERROR,
            code_arguments(&self.code, self.language).with("errors", reported),
        );
        let (fix_index, result) = self.steps.run(fix).await;
        if !result.success {
            let error = result
                .error
                .unwrap_or_else(|| "automatic fix failed".to_string());
            self.steps.fail(fix_index, error);
            return;
        }
        if let Some(outcome) = result.decode::<RuleFixOutcome>() {
            self.code = outcome.fixed_code;
        }
    }
}

impl ToolExecutor {
    /// Runs `requests` in order as a lazy event stream.
    ///
    /// String arguments equal to `{{previous_result}}` are replaced by the
    /// previous tool's payload, and `{{previous_result.<path>}}` by one field
    /// of it. A failed step with `stop_on_failure == false` passes no payload
    /// on, so the next step's placeholders stay as written.
    pub fn execute_chain(
        &self,
        requests: Vec<ToolCallRequest>,
        stop_on_failure: bool,
    ) -> impl Stream<Item = ToolChainEvent> + Send + 'static {
        let state = ChainState {
            steps: StepRecorder::new(self.clone()),
            requests: requests.into(),
            stop_on_failure,
            started: false,
            previous: None,
        };
        stream::unfold(state, |mut state| async move {
            loop {
                if let Some(event) = state.steps.pending.pop_front() {
                    return Some((event, state));
                }
                if state.steps.finished {
                    return None;
                }
                state.advance().await;
            }
        })
    }

    /// Alternates `syntax_check` and the rule-based `fix_error` tool until
    /// the code is valid or `max_attempts` fixes have been applied.
    ///
    /// Ends with `ChainCompleted` once a check passes, or `ChainFailed` when
    /// a tool fails or errors remain after the last attempt. Step indices
    /// count every executed tool.
    pub fn syntax_check_and_fix_chain(
        &self,
        code: &str,
        language: Language,
        max_attempts: u32,
    ) -> impl Stream<Item = ToolChainEvent> + Send + 'static {
        let state = FixChainState {
            steps: StepRecorder::new(self.clone()),
            code: code.to_string(),
            language,
            max_attempts,
            attempts: 0,
            started: false,
        };
        stream::unfold(state, |mut state| async move {
            loop {
                if let Some(event) = state.steps.pending.pop_front() {
                    return Some((event, state));
                }
                if state.steps.finished {
                    return None;
                }
                state.advance().await;
            }
        })
    }
}

/// Replaces previous-result placeholders in the request's string arguments.
pub fn substitute_previous_result(mut request: ToolCallRequest, previous: &Value) -> ToolCallRequest {
    for (_, value) in request.arguments.iter_mut() {
        let replacement = match value {
            Value::String(text) => substitute(text, previous),
            _ => None,
        };
        if let Some(replacement) = replacement {
            *value = replacement;
        }
    }
    request
}

fn substitute(text: &str, previous: &Value) -> Option<Value> {
    if text == PLACEHOLDER {
        return Some(previous.clone());
    }
    if let Some(path) = text
        .strip_prefix(FIELD_PREFIX)
        .and_then(|rest| rest.strip_suffix("}}"))
    {
        return Some(field_at(previous, path).cloned().unwrap_or(Value::Null));
    }
    if text.contains(PLACEHOLDER) {
        let rendered = match previous {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        return Some(Value::String(text.replace(PLACEHOLDER, &rendered)));
    }
    None
}

/// Follows a dotted path through objects and array indices.
fn field_at<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(value, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}
