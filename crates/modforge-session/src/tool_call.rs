use crate::state::ToolStatus;
use chrono::{DateTime, Utc};
use modforge_core::{ToolArguments, ToolCallRequest, ToolCallResult};
use serde::{Deserialize, Serialize};

/// A tool call as tracked in working memory and shown to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallInfo {
    /// Correlates with the request and result.
    pub call_id: String,
    /// Catalog name.
    pub tool_name: String,
    /// Arguments as issued.
    pub arguments: ToolArguments,
    /// Current lifecycle status.
    pub status: ToolStatus,
    /// Result payload once finished.
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    /// Error text if the call failed.
    #[serde(default)]
    pub error: Option<String>,
    /// Execution time once finished.
    #[serde(default)]
    pub execution_time_ms: u64,
    /// When the call was recorded.
    pub started_at: DateTime<Utc>,
}

impl ToolCallInfo {
    /// A PENDING entry for `request`.
    pub fn from_request(request: &ToolCallRequest) -> Self {
        Self {
            call_id: request.call_id.clone(),
            tool_name: request.tool_name.clone(),
            arguments: request.arguments.clone(),
            status: ToolStatus::Pending,
            result: None,
            error: None,
            execution_time_ms: 0,
            started_at: Utc::now(),
        }
    }

    /// Copy moved to EXECUTING.
    pub fn executing(&self) -> Self {
        Self {
            status: ToolStatus::Executing,
            ..self.clone()
        }
    }

    /// Copy finished with `result`.
    pub fn from_result(original: &ToolCallInfo, result: &ToolCallResult) -> Self {
        Self {
            status: if result.success {
                ToolStatus::Success
            } else {
                ToolStatus::Failed
            },
            result: result.result.clone(),
            error: result.error.clone(),
            execution_time_ms: result.execution_time_ms,
            ..original.clone()
        }
    }
}
