use thiserror::Error;

/// A convenience `Result` alias using [`ModforgeError`].
pub type ModforgeResult<T> = Result<T, ModforgeError>;

/// Top-level error type for Modforge.
///
/// Static-analysis findings (syntax errors, security issues) are never
/// represented here; they are ordinary data flowing through the fix loop.
#[derive(Error, Debug)]
pub enum ModforgeError {
    /// The requested tool is not in the catalog.
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// A required tool argument was not supplied.
    #[error("Missing required argument: {0}")]
    MissingArgument(String),

    /// A tool argument was supplied with the wrong JSON type.
    #[error("Argument '{name}' has type {found}, expected {expected}")]
    InvalidArgumentType {
        /// Argument name.
        name: String,
        /// Type the tool declares for the argument.
        expected: String,
        /// Type actually supplied.
        found: String,
    },

    /// The analyzer does not understand the requested language.
    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    /// No credentials are configured at all.
    #[error("No API key configured; add one in the AI settings")]
    NoApiKey,

    /// The selected model points at credentials that do not exist.
    #[error("No API key found for model '{0}'")]
    NoApiKeyForModel(String),

    /// No saved model is eligible for module development.
    #[error("No model configured; add and save a model in the AI settings")]
    NoModel,

    /// The model client reported a failure (HTTP, stream, provider error).
    #[error("Model error: {0}")]
    Model(String),

    /// A model call did not finish in time.
    #[error("Model call timed out after {0}s")]
    Timeout(u64),

    /// Model output did not have the expected shape.
    #[error("Parse error: {0}")]
    Parse(String),

    /// A static analyzer failed unexpectedly.
    #[error("Analyzer error: {0}")]
    Analyzer(String),

    /// The module store rejected or could not persist a module.
    #[error("Store error: {0}")]
    Store(String),

    /// Working memory persistence or lookup failed.
    #[error("Session error: {0}")]
    Session(String),

    /// Configuration parsing or validation failed.
    #[error("Config error: {0}")]
    Config(String),

    /// The caller abandoned the operation.
    #[error("Operation cancelled")]
    Cancelled,

    /// A JSON serialization or deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ModforgeError {
    /// Configuration errors are terminal for an invocation and never retried.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            ModforgeError::NoApiKey
                | ModforgeError::NoApiKeyForModel(_)
                | ModforgeError::NoModel
                | ModforgeError::Config(_)
        )
    }

    /// Stable code reported alongside lifecycle error events.
    pub fn code(&self) -> &'static str {
        match self {
            ModforgeError::UnknownTool(_) => "UNKNOWN_TOOL",
            ModforgeError::MissingArgument(_) => "MISSING_ARGUMENT",
            ModforgeError::InvalidArgumentType { .. } => "INVALID_ARGUMENT_TYPE",
            ModforgeError::UnsupportedLanguage(_) => "UNSUPPORTED_LANGUAGE",
            ModforgeError::NoApiKey => "NO_API_KEY",
            ModforgeError::NoApiKeyForModel(_) => "NO_API_KEY_FOR_MODEL",
            ModforgeError::NoModel => "NO_MODEL",
            ModforgeError::Model(_) => "MODEL_ERROR",
            ModforgeError::Timeout(_) => "TIMEOUT",
            ModforgeError::Parse(_) => "PARSE_ERROR",
            ModforgeError::Analyzer(_) => "ANALYZER_ERROR",
            ModforgeError::Store(_) => "STORE_ERROR",
            ModforgeError::Session(_) => "SESSION_ERROR",
            ModforgeError::Config(_) => "CONFIG_ERROR",
            ModforgeError::Cancelled => "CANCELLED",
            ModforgeError::Json(_) => "JSON_ERROR",
            ModforgeError::Io(_) => "IO_ERROR",
        }
    }
}
