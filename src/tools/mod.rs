//! Tool definitions and the registry the agent dispatches through.
//!
//! Every capability offered to the model implements [`Tool`]. The registry
//! is filled once at startup and then only read. Failures inside a tool are
//! returned as text so the model can see them and react.

mod email;
mod search;
mod weather;
mod website;
mod youtube;

pub use email::SendEmailTool;
pub use search::SearchTool;
pub use weather::{GetWeatherTool, SummarizeWeatherTool};
pub use website::GenerateWebsiteTool;
pub use youtube::{extract_video_id, format_timestamp, YoutubeTranscriptTool};

use crate::config::{Credentials, Prompts, Settings};
use crate::error::{PalaverError, Result};
use crate::model::LanguageModel;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// A tool declaration as shown to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON Schema for the argument object.
    pub parameters: serde_json::Value,
}

/// What a tool hands back.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    Text(String),
    Json(serde_json::Value),
}

impl ToolOutput {
    pub fn text(content: impl Into<String>) -> Self {
        ToolOutput::Text(content.into())
    }

    /// A model-visible failure.
    pub fn error(message: impl std::fmt::Display) -> Self {
        ToolOutput::Text(format!("Error: {}", message))
    }

    /// Serialized form stored as the tool-result message content.
    pub fn render(&self) -> String {
        match self {
            ToolOutput::Text(text) => text.clone(),
            ToolOutput::Json(value) => value.to_string(),
        }
    }
}

impl std::fmt::Display for ToolOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.render())
    }
}

/// A capability the model may call.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique name the model uses to call this tool.
    fn name(&self) -> &str;

    /// Description sent to the model.
    fn description(&self) -> &str;

    /// JSON Schema describing the arguments.
    fn parameters_schema(&self) -> serde_json::Value;

    /// Run the tool.
    async fn invoke(&self, arguments: serde_json::Value) -> Result<ToolOutput>;

    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// Fixed set of tools, looked up by name.
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    by_name: HashMap<String, usize>,
    timeout: Option<Duration>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: Vec::new(),
            by_name: HashMap::new(),
            timeout: None,
        }
    }

    /// Bound every invocation by `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// The registry used by the service: every built-in tool, in declaration order.
    pub fn standard(
        model: Arc<dyn LanguageModel>,
        credentials: &Credentials,
        settings: &Settings,
        prompts: &Prompts,
    ) -> Result<Self> {
        let timeout = Duration::from_secs(settings.agent.tool_timeout_secs);
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("palaver/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let mut registry = Self::new().with_timeout(timeout);
        registry.register(SearchTool::new(
            http.clone(),
            credentials.search_api_key.clone(),
            settings.agent.search_max_results,
        ))?;
        registry.register(GetWeatherTool::new(
            http.clone(),
            credentials.weather_api_key.clone(),
        ))?;
        registry.register(SummarizeWeatherTool::new(
            http.clone(),
            credentials.weather_api_key.clone(),
            model.clone(),
            prompts.clone(),
        ))?;
        registry.register(YoutubeTranscriptTool::new(http))?;
        registry.register(SendEmailTool::new(
            credentials.mail_address.clone(),
            credentials.mail_app_password.clone(),
            &settings.mail,
        ))?;
        registry.register(GenerateWebsiteTool::new(model, prompts.clone()))?;

        Ok(registry)
    }

    /// Add a tool. Names must be unique.
    pub fn register<T: Tool + 'static>(&mut self, tool: T) -> Result<()> {
        let name = tool.name().to_string();
        if self.by_name.contains_key(&name) {
            return Err(PalaverError::Config(format!(
                "Tool '{}' is already registered",
                name
            )));
        }
        self.by_name.insert(name, self.tools.len());
        self.tools.push(Arc::new(tool));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.by_name.get(name).map(|&i| &self.tools[i])
    }

    /// Declarations for the model, in registration order.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.to_definition()).collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Invoke a tool by name.
    ///
    /// Only an unknown name is an `Err`. Tool errors, panics and timeouts
    /// come back as `Ok` with an error text.
    pub async fn invoke(&self, name: &str, arguments: serde_json::Value) -> Result<ToolOutput> {
        let tool = self
            .get(name)
            .cloned()
            .ok_or_else(|| PalaverError::UnknownTool(name.to_string()))?;

        debug!("Invoking tool {}", name);
        let mut handle = tokio::spawn(async move { tool.invoke(arguments).await });

        let joined = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, &mut handle).await {
                Ok(joined) => joined,
                Err(_) => {
                    handle.abort();
                    warn!("Tool {} timed out after {:?}", name, limit);
                    return Ok(ToolOutput::error(format!(
                        "{} timed out after {} seconds",
                        name,
                        limit.as_secs()
                    )));
                }
            },
            None => handle.await,
        };

        let output = match joined {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                warn!("Tool {} failed: {}", name, e);
                ToolOutput::error(failure_message(&e))
            }
            Err(e) => {
                warn!("Tool {} aborted: {}", name, e);
                ToolOutput::error(format!("{} crashed: {}", name, e))
            }
        };
        Ok(output)
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn failure_message(err: &PalaverError) -> String {
    match err {
        PalaverError::Tool(msg) => msg.clone(),
        other => other.to_string(),
    }
}

/// Read a required string argument.
pub(crate) fn required_str<'a>(arguments: &'a serde_json::Value, key: &str) -> Result<&'a str> {
    arguments
        .get(key)
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| PalaverError::Tool(format!("Missing '{}' argument", key)))
}
