use crate::tool_call::ToolCallInfo;
use modforge_core::{
    AgentMessage, ChatMessage, GeneratedModuleData, ModforgeError, ModforgeResult, ToolCallResult,
};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// Default bound on model repair calls per develop run.
pub const DEFAULT_MAX_FIX_ATTEMPTS: u32 = 3;

const SYNTAX_CHECK_TOOL: &str = "syntax_check";
const RECENT_TOOL_CALLS: usize = 5;

/// Mutable per-session state of one agent conversation.
///
/// Only the task running the current develop invocation writes to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkingMemory {
    /// Conversation in chronological order.
    pub conversation_history: Vec<AgentMessage>,
    /// Latest module draft.
    pub current_module: Option<GeneratedModuleData>,
    /// Requirement of the current run.
    pub current_requirement: String,
    /// Number of develop runs started on this session.
    pub iteration_count: u32,
    /// Tool calls in issue order; call ids are unique.
    pub tool_call_history: Vec<ToolCallInfo>,
    /// Repair calls made in the current run.
    pub fix_attempt_count: u32,
    /// Upper bound for `fix_attempt_count`.
    pub max_fix_attempts: u32,
    /// Last unexpected failure, if any.
    pub last_error: Option<String>,
}

impl Default for WorkingMemory {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FIX_ATTEMPTS)
    }
}

impl WorkingMemory {
    /// Empty memory with the given fix bound.
    pub fn new(max_fix_attempts: u32) -> Self {
        Self {
            conversation_history: Vec::new(),
            current_module: None,
            current_requirement: String::new(),
            iteration_count: 0,
            tool_call_history: Vec::new(),
            fix_attempt_count: 0,
            max_fix_attempts,
            last_error: None,
        }
    }

    /// Starts a new run: records the requirement as a user message and
    /// resets the per-run counters.
    pub fn begin_requirement(&mut self, requirement: &str) {
        self.current_requirement = requirement.to_string();
        self.fix_attempt_count = 0;
        self.last_error = None;
        self.increment_iteration();
        self.add_user_message(requirement);
    }

    #[allow(missing_docs)]
    pub fn add_user_message(&mut self, content: &str) {
        self.conversation_history.push(AgentMessage::user(content));
    }

    #[allow(missing_docs)]
    pub fn add_system_message(&mut self, content: &str) {
        self.conversation_history.push(AgentMessage::system(content));
    }

    /// Appends an assistant message, usually carrying the final module.
    pub fn add_assistant_message(&mut self, message: AgentMessage) {
        self.conversation_history.push(message);
    }

    /// Appends a tool message summarizing `results`.
    pub fn add_tool_message(&mut self, content: &str, results: Vec<ToolCallResult>) {
        self.conversation_history
            .push(AgentMessage::tool(content, results));
    }

    /// Records a new tool call. Fails if the call id is already known.
    pub fn record_tool_call(&mut self, info: ToolCallInfo) -> ModforgeResult<()> {
        if self.find_tool_call(&info.call_id).is_some() {
            return Err(ModforgeError::Session(format!(
                "duplicate tool call id {}",
                info.call_id
            )));
        }
        self.tool_call_history.push(info);
        Ok(())
    }

    /// Moves a recorded call to EXECUTING. Returns false for unknown ids.
    pub fn mark_tool_call_executing(&mut self, call_id: &str) -> bool {
        match self.tool_call_history.iter_mut().find(|c| c.call_id == call_id) {
            Some(entry) => {
                *entry = entry.executing();
                true
            }
            None => false,
        }
    }

    /// Finishes a recorded call with its result. Returns the updated entry.
    pub fn complete_tool_call(&mut self, result: &ToolCallResult) -> Option<ToolCallInfo> {
        let entry = self
            .tool_call_history
            .iter_mut()
            .find(|c| c.call_id == result.call_id)?;
        *entry = ToolCallInfo::from_result(entry, result);
        Some(entry.clone())
    }

    /// Looks up a recorded call.
    pub fn find_tool_call(&self, call_id: &str) -> Option<&ToolCallInfo> {
        self.tool_call_history.iter().find(|c| c.call_id == call_id)
    }

    /// Replaces the current draft.
    pub fn update_module(&mut self, module: GeneratedModuleData) {
        self.current_module = Some(module);
    }

    /// History as role/content pairs, limited to the most recent
    /// `max_messages` entries.
    pub fn context_for_model(&self, max_messages: usize) -> Vec<ChatMessage> {
        let skip = self.conversation_history.len().saturating_sub(max_messages);
        self.conversation_history
            .iter()
            .skip(skip)
            .map(AgentMessage::to_chat)
            .collect()
    }

    /// Tool results attached to the latest message.
    pub fn recent_tool_results(&self) -> &[ToolCallResult] {
        self.conversation_history
            .last()
            .map_or(&[], |m| m.tool_results.as_slice())
    }

    /// The last five tool calls.
    pub fn recent_tool_calls(&self) -> &[ToolCallInfo] {
        let skip = self.tool_call_history.len().saturating_sub(RECENT_TOOL_CALLS);
        &self.tool_call_history[skip..]
    }

    #[allow(missing_docs)]
    pub fn can_attempt_fix(&self) -> bool {
        self.fix_attempt_count < self.max_fix_attempts
    }

    #[allow(missing_docs)]
    pub fn increment_fix_attempt(&mut self) {
        self.fix_attempt_count += 1;
    }

    #[allow(missing_docs)]
    pub fn reset_fix_attempts(&mut self) {
        self.fix_attempt_count = 0;
    }

    #[allow(missing_docs)]
    pub fn increment_iteration(&mut self) {
        self.iteration_count += 1;
    }

    #[allow(missing_docs)]
    pub fn has_syntax_check_been_called(&self) -> bool {
        self.tool_call_history
            .iter()
            .any(|c| c.tool_name == SYNTAX_CHECK_TOOL)
    }

    #[allow(missing_docs)]
    pub fn syntax_check_results(&self) -> Vec<&ToolCallInfo> {
        self.tool_call_history
            .iter()
            .filter(|c| c.tool_name == SYNTAX_CHECK_TOOL)
            .collect()
    }

    /// Clears everything except the fix bound.
    pub fn reset(&mut self) {
        *self = Self::new(self.max_fix_attempts);
    }

    /// Multi-line debug summary.
    pub fn summary(&self) -> String {
        let requirement: String = self.current_requirement.chars().take(100).collect();
        let ellipsis = if self.current_requirement.chars().count() > 100 {
            "..."
        } else {
            ""
        };
        let mut out = String::new();
        let _ = writeln!(out, "=== Working Memory ===");
        let _ = writeln!(out, "Requirement: {requirement}{ellipsis}");
        let _ = writeln!(out, "Messages: {}", self.conversation_history.len());
        let _ = writeln!(out, "Tool calls: {}", self.tool_call_history.len());
        let _ = writeln!(out, "Iterations: {}", self.iteration_count);
        let _ = writeln!(
            out,
            "Fix attempts: {}/{}",
            self.fix_attempt_count, self.max_fix_attempts
        );
        let _ = writeln!(
            out,
            "Current module: {}",
            self.current_module.as_ref().map_or("None", |m| m.name.as_str())
        );
        let _ = writeln!(
            out,
            "Last error: {}",
            self.last_error.as_deref().unwrap_or("None")
        );
        out
    }
}
