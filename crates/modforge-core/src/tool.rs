use crate::args::ToolArguments;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A request to invoke one catalog tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Name of the tool to invoke.
    pub tool_name: String,
    /// Named arguments for the tool.
    pub arguments: ToolArguments,
    /// Unique identifier of this call, generated at creation.
    pub call_id: String,
}

impl ToolCallRequest {
    /// Creates a request with a fresh call id.
    pub fn new(tool_name: impl Into<String>, arguments: ToolArguments) -> Self {
        Self {
            tool_name: tool_name.into(),
            arguments,
            call_id: Uuid::new_v4().to_string(),
        }
    }
}

/// The outcome of executing a [`ToolCallRequest`].
///
/// Exactly one result exists per request; `call_id` always equals the
/// request's `call_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallResult {
    /// The id of the request this result corresponds to.
    pub call_id: String,
    /// Name of the tool that ran.
    pub tool_name: String,
    /// Whether the tool ran to completion.
    pub success: bool,
    /// Tool-specific payload; opaque to the executor.
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    /// Failure description when `success` is false.
    #[serde(default)]
    pub error: Option<String>,
    /// Wall-clock execution time.
    #[serde(default)]
    pub execution_time_ms: u64,
}

impl ToolCallResult {
    /// Creates a successful result.
    pub fn success(
        request: &ToolCallRequest,
        result: serde_json::Value,
        execution_time_ms: u64,
    ) -> Self {
        Self {
            call_id: request.call_id.clone(),
            tool_name: request.tool_name.clone(),
            success: true,
            result: Some(result),
            error: None,
            execution_time_ms,
        }
    }

    /// Creates a failed result.
    pub fn failure(
        request: &ToolCallRequest,
        error: impl Into<String>,
        execution_time_ms: u64,
    ) -> Self {
        Self {
            call_id: request.call_id.clone(),
            tool_name: request.tool_name.clone(),
            success: false,
            result: None,
            error: Some(error.into()),
            execution_time_ms,
        }
    }

    /// Decodes the payload into a concrete result type.
    ///
    /// Returns `None` for failed calls or payloads of a different shape.
    pub fn decode<T: DeserializeOwned>(&self) -> Option<T> {
        self.result
            .as_ref()
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }
}
