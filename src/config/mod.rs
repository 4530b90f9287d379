//! Configuration module for Palaver.
//!
//! Handles loading application settings, environment credentials and prompt templates.

mod prompts;
mod settings;

pub use prompts::Prompts;
pub use settings::{
    AgentSettings, Credentials, GeneralSettings, MailSettings, ModelSettings, PromptSettings,
    ServerSettings, Settings, StoreSettings, GEMINI_OPENAI_BASE,
};
