//! Core types and error definitions for Modforge.
//!
//! This crate provides the foundational types shared by every Modforge crate:
//! the error taxonomy, chat and agent messages, tool call requests and
//! results, and the extension module data model.
//!
//! # Main types
//!
//! - [`ModforgeError`]: Unified error enum for all Modforge subsystems.
//! - [`ModforgeResult`]: Convenience alias for `Result<T, ModforgeError>`.
//! - [`ToolArguments`]: Typed accessors over a tool call's JSON arguments.
//! - [`ToolCallRequest`] / [`ToolCallResult`]: Correlated tool invocation pair.
//! - [`AgentMessage`]: One entry of a session's conversation history.
//! - [`GeneratedModuleData`]: A module draft produced by the model.
//! - [`ModuleStore`]: Persistence contract for finished modules.

/// Typed access to tool call arguments.
pub mod args;
/// Error taxonomy.
pub mod error;
/// Chat and conversation messages.
pub mod message;
/// Module drafts, persisted modules and their enums.
pub mod module;
/// Module store contract and an in-memory implementation.
pub mod store;
/// Tool call request/result types.
pub mod tool;

pub use args::{json_type_name, ToolArguments};
pub use error::{ModforgeError, ModforgeResult};
pub use message::{AgentMessage, ChatMessage, Role};
pub use module::{
    ConfigItemDescriptor, ConfigItemType, ExtensionModule, GeneratedModuleData, ModuleCategory,
    ModuleConfigItem, RunAt,
};
pub use store::{InMemoryModuleStore, ModuleStore};
pub use tool::{ToolCallRequest, ToolCallResult};
