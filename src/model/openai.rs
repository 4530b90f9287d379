//! OpenAI-compatible chat completions backend.

use super::{Completion, LanguageModel};
use crate::config::ModelSettings;
use crate::conversation::{Message, Role, ToolCall};
use crate::error::{PalaverError, Result};
use crate::tools::ToolDefinition;
use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessageArgs,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestToolMessageArgs, ChatCompletionRequestUserMessageArgs,
    ChatCompletionResponseMessage, ChatCompletionTool, ChatCompletionToolType,
    CreateChatCompletionRequestArgs, FunctionCall, FunctionObject,
};
use async_openai::Client;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

/// Create a client for an OpenAI-compatible API with a request timeout.
pub fn create_client(api_key: &str, api_base: &str, timeout: Duration) -> Result<Client<OpenAIConfig>> {
    let http_client = reqwest::Client::builder().timeout(timeout).build()?;

    let config = OpenAIConfig::new()
        .with_api_key(api_key)
        .with_api_base(api_base.trim_end_matches('/'));

    Ok(Client::with_config(config).with_http_client(http_client))
}

/// Language model backed by a chat completions endpoint.
pub struct OpenAiModel {
    client: Option<Client<OpenAIConfig>>,
    model: String,
    temperature: Option<f32>,
}

impl OpenAiModel {
    /// Build the adapter. Without an API key every call fails with a
    /// configuration error, but construction still succeeds.
    pub fn new(settings: &ModelSettings, api_key: Option<&str>) -> Result<Self> {
        let client = match api_key {
            Some(key) => Some(create_client(
                key,
                &settings.api_base,
                Duration::from_secs(settings.timeout_secs),
            )?),
            None => {
                warn!("No model API key configured; chat turns will fail");
                None
            }
        };

        Ok(Self {
            client,
            model: settings.name.clone(),
            temperature: settings.temperature,
        })
    }

    fn client(&self) -> Result<&Client<OpenAIConfig>> {
        self.client.as_ref().ok_or_else(|| {
            PalaverError::Config(
                "Model API key not set. Set GOOGLE_API_KEY (or OPENAI_API_KEY).".to_string(),
            )
        })
    }

    async fn create(
        &self,
        messages: Vec<ChatCompletionRequestMessage>,
        tools: Vec<ChatCompletionTool>,
    ) -> Result<ChatCompletionResponseMessage> {
        let client = self.client()?;

        let mut builder = CreateChatCompletionRequestArgs::default();
        builder.model(&self.model).messages(messages);
        if !tools.is_empty() {
            builder.tools(tools);
        }
        if let Some(temperature) = self.temperature {
            builder.temperature(temperature);
        }
        let request = builder.build().map_err(|e| PalaverError::Model(e.to_string()))?;

        let response = client
            .chat()
            .create(request)
            .await
            .map_err(|e| PalaverError::Model(format!("Completion request failed: {}", e)))?;

        response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message)
            .ok_or_else(|| PalaverError::Model("No response from model".to_string()))
    }
}

#[async_trait]
impl LanguageModel for OpenAiModel {
    #[instrument(skip_all, fields(model = %self.model, messages = history.len()))]
    async fn complete(&self, history: &[Message], tools: &[ToolDefinition]) -> Result<Completion> {
        let messages = history
            .iter()
            .map(to_request_message)
            .collect::<Result<Vec<_>>>()?;
        let tools = tools.iter().map(to_wire_tool).collect();

        let message = self.create(messages, tools).await?;
        let completion = into_completion(message);

        if let Completion::ToolRequests { calls, .. } = &completion {
            debug!("Model requested {} tool call(s)", calls.len());
        }
        Ok(completion)
    }

    async fn prompt(&self, prompt: &str) -> Result<String> {
        let messages = vec![to_request_message(&Message::user(prompt))?];
        let message = self.create(messages, Vec::new()).await?;

        message
            .content
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| PalaverError::Model("Empty response from model".to_string()))
    }
}

fn build_error(e: impl std::fmt::Display) -> PalaverError {
    PalaverError::Model(format!("Failed to build request message: {}", e))
}

/// Convert a stored message into the wire format.
fn to_request_message(message: &Message) -> Result<ChatCompletionRequestMessage> {
    let converted = match message.role {
        Role::System => ChatCompletionRequestSystemMessageArgs::default()
            .content(message.content.clone())
            .build()
            .map_err(build_error)?
            .into(),
        Role::User => ChatCompletionRequestUserMessageArgs::default()
            .content(message.content.clone())
            .build()
            .map_err(build_error)?
            .into(),
        Role::Assistant => {
            let mut builder = ChatCompletionRequestAssistantMessageArgs::default();
            if !message.content.is_empty() || message.tool_calls.is_empty() {
                builder.content(message.content.clone());
            }
            if !message.tool_calls.is_empty() {
                builder.tool_calls(message.tool_calls.iter().map(to_wire_call).collect::<Vec<_>>());
            }
            builder.build().map_err(build_error)?.into()
        }
        Role::ToolResult => ChatCompletionRequestToolMessageArgs::default()
            .tool_call_id(message.tool_call_id.clone().unwrap_or_default())
            .content(message.content.clone())
            .build()
            .map_err(build_error)?
            .into(),
    };
    Ok(converted)
}

fn to_wire_call(call: &ToolCall) -> ChatCompletionMessageToolCall {
    // Unparseable arguments are kept as the raw string the model produced.
    let arguments = match &call.arguments {
        serde_json::Value::String(raw) => raw.clone(),
        other => other.to_string(),
    };

    ChatCompletionMessageToolCall {
        id: call.id.clone(),
        r#type: ChatCompletionToolType::Function,
        function: FunctionCall {
            name: call.name.clone(),
            arguments,
        },
    }
}

fn to_wire_tool(definition: &ToolDefinition) -> ChatCompletionTool {
    ChatCompletionTool {
        r#type: ChatCompletionToolType::Function,
        function: FunctionObject {
            name: definition.name.clone(),
            description: Some(definition.description.clone()),
            parameters: Some(definition.parameters.clone()),
            strict: None,
        },
    }
}

fn from_wire_call(call: ChatCompletionMessageToolCall) -> ToolCall {
    let raw = call.function.arguments;
    let arguments = if raw.trim().is_empty() {
        serde_json::json!({})
    } else {
        serde_json::from_str(&raw).unwrap_or(serde_json::Value::String(raw))
    };

    // Some compatible providers leave ids blank; results must still link to a call.
    let id = if call.id.is_empty() {
        format!("call_{}", Uuid::new_v4().simple())
    } else {
        call.id
    };

    ToolCall {
        id,
        name: call.function.name,
        arguments,
    }
}

fn into_completion(message: ChatCompletionResponseMessage) -> Completion {
    let content = message.content.unwrap_or_default();
    match message.tool_calls {
        Some(calls) if !calls.is_empty() => Completion::ToolRequests {
            content,
            calls: calls.into_iter().map(from_wire_call).collect(),
        },
        _ => Completion::FinalAnswer(content),
    }
}
