//! Per-session state for the Modforge agent: working memory, the pipeline
//! state machine and shared session handles with stale-write protection.

/// Shared session handles and generation tokens.
pub mod handle;
/// Working memory.
pub mod memory;
/// Snapshot persistence.
pub mod snapshot;
/// Pipeline and tool-call states.
pub mod state;
/// Tracked tool calls.
pub mod tool_call;

pub use handle::{GenerationToken, SessionHandle, SessionSnapshot};
pub use memory::{WorkingMemory, DEFAULT_MAX_FIX_ATTEMPTS};
pub use snapshot::{FileMemorySnapshotStore, MemorySnapshotStore};
pub use state::{AgentState, ToolStatus};
pub use tool_call::ToolCallInfo;
