use modforge_core::{GeneratedModuleData, ModforgeError};
use modforge_session::{AgentState, ToolCallInfo};
use serde::{Deserialize, Serialize};

/// Error codes reported by the engine itself (as opposed to
/// [`ModforgeError::code`]).
pub mod codes {
    /// The model stream produced no usable content.
    pub const EMPTY_RESPONSE: &str = "EMPTY_RESPONSE";
    /// The draft still fails the syntax check after every fix attempt.
    pub const MAX_FIX_ATTEMPTS_REACHED: &str = "MAX_FIX_ATTEMPTS_REACHED";
    /// A repair call failed or returned nothing usable.
    pub const AUTO_FIX_FAILED: &str = "AUTO_FIX_FAILED";
    /// The check-and-fix tool chain failed or gave up.
    pub const TOOL_CHAIN_FAILED: &str = "TOOL_CHAIN_FAILED";
    /// The engine task stopped without reporting an outcome.
    pub const INTERRUPTED: &str = "INTERRUPTED";
}

/// Terminal failure of a develop run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorReport {
    /// Human-readable description.
    pub message: String,
    /// Stable error code.
    #[serde(default)]
    pub code: Option<String>,
    /// False for configuration problems the caller must fix first.
    pub recoverable: bool,
    /// Model output associated with the failure, if any.
    #[serde(default)]
    pub raw_response: Option<String>,
}

impl ErrorReport {
    /// A recoverable report with a code.
    pub fn recoverable(message: impl Into<String>, code: &str) -> Self {
        Self {
            message: message.into(),
            code: Some(code.to_string()),
            recoverable: true,
            raw_response: None,
        }
    }

    /// Attaches model output; empty text is ignored.
    pub fn with_raw_response(mut self, raw: impl Into<String>) -> Self {
        let raw = raw.into();
        if !raw.is_empty() {
            self.raw_response = Some(raw);
        }
        self
    }
}

impl From<&ModforgeError> for ErrorReport {
    fn from(err: &ModforgeError) -> Self {
        Self {
            message: err.to_string(),
            code: Some(err.code().to_string()),
            recoverable: !err.is_configuration(),
            raw_response: None,
        }
    }
}

/// Lifecycle events of one develop run, in emission order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum AgentEvent {
    StateChange {
        state: AgentState,
    },
    Thinking {
        delta: String,
        accumulated: String,
    },
    Content {
        delta: String,
        accumulated: String,
    },
    /// Always precedes the `ToolComplete` with the same call id.
    ToolStart {
        info: ToolCallInfo,
    },
    ToolComplete {
        info: ToolCallInfo,
    },
    /// A new draft: the parsed model output or a fixed revision of it.
    ModuleGenerated {
        module: GeneratedModuleData,
    },
    Completed {
        module: GeneratedModuleData,
    },
    Error(ErrorReport),
}

impl AgentEvent {
    /// True for the events that end a run.
    pub fn is_terminal(&self) -> bool {
        matches!(self, AgentEvent::Completed { .. } | AgentEvent::Error(_))
    }

    /// Short tag used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            AgentEvent::StateChange { .. } => "state_change",
            AgentEvent::Thinking { .. } => "thinking",
            AgentEvent::Content { .. } => "content",
            AgentEvent::ToolStart { .. } => "tool_start",
            AgentEvent::ToolComplete { .. } => "tool_complete",
            AgentEvent::ModuleGenerated { .. } => "module_generated",
            AgentEvent::Completed { .. } => "completed",
            AgentEvent::Error(_) => "error",
        }
    }
}
