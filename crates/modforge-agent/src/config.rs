use modforge_core::{ModforgeError, ModforgeResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// How model output reaches the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMode {
    /// Streaming completion; thinking and content deltas are forwarded.
    #[default]
    Streamed,
    /// One non-streaming completion; only the final result is reported.
    Buffered,
}

/// Tuning knobs for the agent engine.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_max_fix_attempts")]
    pub max_fix_attempts: u32,
    #[serde(default = "default_max_history_messages")]
    pub max_history_messages: usize,
    #[serde(default = "default_stream_timeout_secs")]
    pub stream_timeout_secs: u64,
    #[serde(default = "default_fix_timeout_secs")]
    pub fix_timeout_secs: u64,
    #[serde(default)]
    pub delivery: DeliveryMode,
    /// Capacity of the event channel between the engine task and the caller.
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

fn default_max_fix_attempts() -> u32 {
    3
}

fn default_max_history_messages() -> usize {
    40
}

fn default_stream_timeout_secs() -> u64 {
    120
}

fn default_fix_timeout_secs() -> u64 {
    60
}

fn default_event_buffer() -> usize {
    64
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_fix_attempts: default_max_fix_attempts(),
            max_history_messages: default_max_history_messages(),
            stream_timeout_secs: default_stream_timeout_secs(),
            fix_timeout_secs: default_fix_timeout_secs(),
            delivery: DeliveryMode::default(),
            event_buffer: default_event_buffer(),
        }
    }
}

#[allow(missing_docs)]
impl AgentConfig {
    pub fn stream_timeout(&self) -> Duration {
        Duration::from_secs(self.stream_timeout_secs)
    }

    pub fn fix_timeout(&self) -> Duration {
        Duration::from_secs(self.fix_timeout_secs)
    }
}

/// Credentials for one model provider account.
#[allow(missing_docs)]
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiCredentials {
    pub id: String,
    pub provider: String,
    pub api_key: String,
    #[serde(default)]
    pub base_url: Option<String>,
}

impl fmt::Debug for ApiCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiCredentials")
            .field("id", &self.id)
            .field("provider", &self.provider)
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// What a saved model has been tagged as able to do.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ModelCapability {
    Text,
    Code,
    FunctionCall,
    LongContext,
    Image,
    Audio,
    Video,
    /// Eligible for module development by default.
    ModuleDevelopment,
}

/// A model the user picked and bound to credentials.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedModel {
    pub id: String,
    /// Provider-side model identifier.
    pub model_id: String,
    pub credentials_id: String,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub capabilities: Vec<ModelCapability>,
}

impl SavedModel {
    #[allow(missing_docs)]
    pub fn supports(&self, capability: ModelCapability) -> bool {
        self.capabilities.contains(&capability)
    }

    /// Alias if set, otherwise the provider model id.
    pub fn display_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.model_id)
    }
}

/// A model together with the credentials it will be called with.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedModel {
    pub model: SavedModel,
    pub credentials: ApiCredentials,
}

/// Credentials and models available to the engine.
#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderSettings {
    #[serde(default)]
    pub credentials: Vec<ApiCredentials>,
    #[serde(default)]
    pub models: Vec<SavedModel>,
    #[serde(default)]
    pub default_model_id: Option<String>,
}

impl ProviderSettings {
    /// Picks the model for a develop run.
    ///
    /// Order: the explicitly requested model, the default model if it is
    /// capable of module development, the first capable model, the default
    /// model, the first saved model.
    pub fn select_model(&self, preferred: Option<&SavedModel>) -> ModforgeResult<ResolvedModel> {
        if self.credentials.is_empty() {
            return Err(ModforgeError::NoApiKey);
        }
        let model = preferred
            .cloned()
            .or_else(|| self.pick_saved_model().cloned())
            .ok_or(ModforgeError::NoModel)?;
        let credentials = self
            .credentials
            .iter()
            .find(|c| c.id == model.credentials_id)
            .cloned()
            .ok_or_else(|| ModforgeError::NoApiKeyForModel(model.display_name().to_string()))?;
        Ok(ResolvedModel { model, credentials })
    }

    fn pick_saved_model(&self) -> Option<&SavedModel> {
        let is_default = |m: &&SavedModel| Some(&m.id) == self.default_model_id.as_ref();
        let capable = |m: &&SavedModel| m.supports(ModelCapability::ModuleDevelopment);
        self.models
            .iter()
            .filter(capable)
            .find(is_default)
            .or_else(|| self.models.iter().find(capable))
            .or_else(|| self.models.iter().find(is_default))
            .or_else(|| self.models.first())
    }
}

/// Everything a `modforge.toml` file may contain.
#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModforgeSettings {
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub providers: ProviderSettings,
}

impl ModforgeSettings {
    /// Parses settings from TOML text.
    pub fn from_toml_str(text: &str) -> ModforgeResult<Self> {
        toml::from_str(text).map_err(|e| ModforgeError::Config(e.to_string()))
    }

    /// Loads settings from `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> ModforgeResult<Self> {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::from_toml_str(&text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }
}
