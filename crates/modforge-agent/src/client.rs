use crate::config::ApiCredentials;
use async_trait::async_trait;
use modforge_core::{ChatMessage, ModforgeResult};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Events produced by a streaming chat completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ModelStreamEvent {
    /// The provider accepted the request.
    Started,
    /// A fragment of reasoning text.
    Thinking {
        /// New text.
        delta: String,
    },
    /// A fragment of answer text.
    Content {
        /// New text.
        delta: String,
        /// All answer text so far.
        accumulated: String,
    },
    /// The completion finished.
    Done {
        /// Complete answer text.
        full_text: String,
    },
    /// The provider reported a failure mid-stream.
    Error {
        #[allow(missing_docs)]
        message: String,
    },
}

/// Contract the engine needs from a language model provider.
///
/// Implementations own transport, authentication and provider wire formats.
/// A client-side timeout should be reported as
/// [`modforge_core::ModforgeError::Timeout`].
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Single-shot completion returning the answer text.
    async fn chat(
        &self,
        credentials: &ApiCredentials,
        model_id: &str,
        messages: &[ChatMessage],
    ) -> ModforgeResult<String>;

    /// Streaming completion.
    ///
    /// The stream ends after `Done` or `Error`; a channel that closes without
    /// either is treated as an unfinished response.
    async fn chat_stream(
        &self,
        credentials: &ApiCredentials,
        model_id: &str,
        messages: &[ChatMessage],
    ) -> ModforgeResult<mpsc::Receiver<ModelStreamEvent>>;
}
