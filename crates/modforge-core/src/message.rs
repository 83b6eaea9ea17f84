use crate::module::GeneratedModuleData;
use crate::tool::{ToolCallRequest, ToolCallResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The role of the participant that authored a message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// A human end-user.
    User,
    /// The AI assistant.
    Assistant,
    /// A system-level instruction or prompt.
    System,
    /// Output produced by a tool invocation.
    Tool,
}

impl Role {
    /// Wire name used by the model client contract.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
            Role::Tool => "tool",
        }
    }
}

/// A role/content pair sent to the model client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Author role.
    pub role: Role,
    /// Message text.
    pub content: String,
}

impl ChatMessage {
    /// Creates a chat message with the given role.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Creates a [`Role::System`] chat message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Creates a [`Role::User`] chat message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Creates a [`Role::Assistant`] chat message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// One entry of a session's conversation history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentMessage {
    /// Unique identifier for this message.
    pub id: Uuid,
    /// The role of the message author.
    pub role: Role,
    /// The textual content of the message.
    pub content: String,
    /// Reasoning text the model streamed before its answer, if any.
    #[serde(default)]
    pub thoughts: Option<String>,
    /// Tool calls issued while producing this message.
    #[serde(default)]
    pub tool_calls: Vec<ToolCallRequest>,
    /// Results of those tool calls.
    #[serde(default)]
    pub tool_results: Vec<ToolCallResult>,
    /// Module produced by this turn, if any.
    #[serde(default)]
    pub generated_module: Option<GeneratedModuleData>,
    /// UTC timestamp of when the message was created.
    pub timestamp: DateTime<Utc>,
}

impl AgentMessage {
    /// Creates a new message with the given role and content.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            content: content.into(),
            thoughts: None,
            tool_calls: Vec::new(),
            tool_results: Vec::new(),
            generated_module: None,
            timestamp: Utc::now(),
        }
    }

    /// Creates a new message with [`Role::User`].
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Creates a new message with [`Role::Assistant`].
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Creates a new message with [`Role::System`].
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Creates a new message with [`Role::Tool`] carrying tool results.
    pub fn tool(content: impl Into<String>, results: Vec<ToolCallResult>) -> Self {
        Self {
            tool_results: results,
            ..Self::new(Role::Tool, content)
        }
    }

    /// Attaches a generated module to the message.
    pub fn with_module(mut self, module: GeneratedModuleData) -> Self {
        self.generated_module = Some(module);
        self
    }

    /// Attaches streamed reasoning to the message.
    pub fn with_thoughts(mut self, thoughts: impl Into<String>) -> Self {
        self.thoughts = Some(thoughts.into());
        self
    }

    /// Projects the message onto the model client contract.
    pub fn to_chat(&self) -> ChatMessage {
        ChatMessage::new(self.role, self.content.clone())
    }
}
