use modforge_core::{ChatMessage, Role};

/// Message list for one model call: a system prompt followed by a bounded
/// window of conversation turns.
pub struct ContextWindow {
    messages: Vec<ChatMessage>,
    system_prompt: Option<String>,
    max_messages: usize,
}

impl ContextWindow {
    /// Empty window keeping at most `max_messages` turns.
    pub fn new(max_messages: usize) -> Self {
        Self {
            messages: Vec::new(),
            system_prompt: None,
            max_messages,
        }
    }

    #[allow(missing_docs)]
    pub fn set_system_prompt(&mut self, prompt: impl Into<String>) {
        self.system_prompt = Some(prompt.into());
    }

    #[allow(missing_docs)]
    pub fn system_prompt(&self) -> Option<&str> {
        self.system_prompt.as_deref()
    }

    /// Appends a turn, dropping the oldest ones past the limit. System turns
    /// are ignored; the window has exactly one system prompt.
    pub fn push(&mut self, message: ChatMessage) {
        if message.role == Role::System {
            return;
        }
        self.messages.push(message);
        self.truncate();
    }

    fn truncate(&mut self) {
        if self.messages.len() > self.max_messages {
            let excess = self.messages.len() - self.max_messages;
            self.messages.drain(..excess);
        }
    }

    /// Rough token estimate (4 bytes per token).
    pub fn estimated_tokens(&self) -> usize {
        let system = self.system_prompt.as_ref().map_or(0, |s| s.len() / 4);
        let turns: usize = self.messages.iter().map(|m| m.content.len() / 4).sum();
        system + turns
    }

    /// The messages to send: system prompt first, then the window.
    pub fn into_messages(self) -> Vec<ChatMessage> {
        self.system_prompt
            .map(ChatMessage::system)
            .into_iter()
            .chain(self.messages)
            .collect()
    }
}
