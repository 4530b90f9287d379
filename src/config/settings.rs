//! Configuration settings for Palaver.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Gemini's OpenAI-compatible chat completions endpoint.
pub const GEMINI_OPENAI_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/openai";

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub server: ServerSettings,
    pub model: ModelSettings,
    pub agent: AgentSettings,
    pub store: StoreSettings,
    pub mail: MailSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Host to bind to.
    pub host: String,
    /// Port to bind to.
    pub port: u16,
    /// Directory holding the UI bundle served at `/`.
    pub static_dir: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            static_dir: "static".to_string(),
        }
    }
}

/// Language model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    /// Model name passed to the chat completions endpoint.
    pub name: String,
    /// Base URL of an OpenAI-compatible API.
    pub api_base: String,
    /// Sampling temperature. Provider default when unset.
    pub temperature: Option<f32>,
    /// Timeout for a single completion call, in seconds.
    pub timeout_secs: u64,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            name: "gemini-2.0-flash".to_string(),
            api_base: GEMINI_OPENAI_BASE.to_string(),
            temperature: None,
            timeout_secs: 120,
        }
    }
}

/// Orchestration loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    /// Maximum model calls in one turn.
    pub max_iterations: usize,
    /// Timeout for a single tool invocation, in seconds.
    pub tool_timeout_secs: u64,
    /// Number of results requested from the search API.
    pub search_max_results: u32,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            tool_timeout_secs: 60,
            search_max_results: 4,
        }
    }
}

/// Conversation store bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// Maximum number of live threads (0 = unbounded).
    pub max_threads: usize,
    /// Threads idle for longer than this are dropped (0 = never).
    pub idle_ttl_secs: u64,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            max_threads: 1000,
            idle_ttl_secs: 86_400,
        }
    }
}

/// Outgoing mail relay settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MailSettings {
    /// SMTP relay host (implicit TLS).
    pub smtp_host: String,
    /// SMTP relay port.
    pub smtp_port: u16,
}

impl Default for MailSettings {
    fn default() -> Self {
        Self {
            smtp_host: "smtp.gmail.com".to_string(),
            smtp_port: 465,
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("palaver")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded static asset directory.
    pub fn static_dir(&self) -> PathBuf {
        Self::expand_path(&self.server.static_dir)
    }

    /// Prompt templates with this configuration's overrides applied.
    pub fn load_prompts(&self) -> crate::error::Result<super::Prompts> {
        super::Prompts::load(
            self.prompts.custom_dir.as_deref(),
            Some(&self.prompts.variables),
        )
    }
}

/// Secrets read from the process environment.
///
/// Every field is optional: missing weather or mail credentials degrade the
/// matching tool, a missing model key fails each turn.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub search_api_key: Option<String>,
    pub weather_api_key: Option<String>,
    pub model_api_key: Option<String>,
    pub mail_address: Option<String>,
    pub mail_app_password: Option<String>,
}

impl Credentials {
    pub const SEARCH_API_KEY: &'static str = "TAVILY_API_KEY";
    pub const WEATHER_API_KEY: &'static str = "OPENWEATHER_API_KEY";
    pub const MODEL_API_KEY: &'static str = "GOOGLE_API_KEY";
    pub const MODEL_API_KEY_FALLBACK: &'static str = "OPENAI_API_KEY";
    pub const MAIL_ADDRESS: &'static str = "GMAIL_ADDRESS";
    pub const MAIL_APP_PASSWORD: &'static str = "GMAIL_APP_PASSWORD";

    /// Read credentials from the environment, loading `.env` first if present.
    pub fn from_env() -> Self {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!("Loaded environment from {}", path.display());
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build credentials from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            search_api_key: get(Self::SEARCH_API_KEY),
            weather_api_key: get(Self::WEATHER_API_KEY),
            model_api_key: get(Self::MODEL_API_KEY).or_else(|| get(Self::MODEL_API_KEY_FALLBACK)),
            mail_address: get(Self::MAIL_ADDRESS),
            mail_app_password: get(Self::MAIL_APP_PASSWORD),
        }
    }
}
