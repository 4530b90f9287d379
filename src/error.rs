//! Error types for Palaver.

use thiserror::Error;

/// Library-level error type for Palaver operations.
///
/// Tool failures are normally turned into text before they reach the
/// conversation, so `Tool` only escapes a tool's own `invoke`. `Model` is the
/// one variant that aborts a turn outright.
#[derive(Error, Debug)]
pub enum PalaverError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Tool failed: {0}")]
    Tool(String),

    #[error("Model error: {0}")]
    Model(String),

    #[error("Conversation store error: {0}")]
    Store(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl PalaverError {
    /// Whether the caller is at fault (maps to a 4xx response).
    pub fn is_client_error(&self) -> bool {
        matches!(self, PalaverError::InvalidInput(_))
    }
}

/// Result type alias for Palaver operations.
pub type Result<T> = std::result::Result<T, PalaverError>;
