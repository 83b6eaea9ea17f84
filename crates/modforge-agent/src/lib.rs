//! The Modforge agent engine.
//!
//! [`AgentEngine::develop`] turns a natural-language requirement into an
//! extension module: it prompts the model, parses the reply, runs the syntax
//! check with a bounded repair loop, scans the result for risky patterns and
//! reports every step as an [`AgentEvent`].

/// Model client contract.
pub mod client;
/// Engine settings, credentials and model selection.
pub mod config;
/// Context window for model calls.
pub mod context;
/// The develop pipeline.
pub mod engine;
/// Lifecycle events.
pub mod event;
/// Model reply parsing.
pub mod parser;
pub mod prompts;

pub use client::{ModelClient, ModelStreamEvent};
pub use config::{
    AgentConfig, ApiCredentials, DeliveryMode, ModelCapability, ModforgeSettings,
    ProviderSettings, ResolvedModel, SavedModel,
};
pub use context::ContextWindow;
pub use engine::{AgentEngine, DevelopOutcome, DevelopRequest, DevelopStream};
pub use event::{codes, AgentEvent, ErrorReport};
pub use parser::{extract_fixed_code, parse_module_response};
