//! Language model adapter.
//!
//! The adapter is stateless: everything the model knows arrives in the
//! message history passed to each call.

mod openai;
#[cfg(test)]
pub(crate) mod testing;

pub use openai::{create_client, OpenAiModel};

use crate::conversation::{Message, ToolCall};
use crate::error::Result;
use crate::tools::ToolDefinition;
use async_trait::async_trait;

/// What the model decided to do next.
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    /// A plain answer; the turn is over.
    FinalAnswer(String),
    /// Tools to run, in order, before asking again. `content` is any text
    /// the model sent alongside the calls.
    ToolRequests {
        content: String,
        calls: Vec<ToolCall>,
    },
}

/// A chat-completion capability.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Decide the next step given the full history and the declared tools.
    async fn complete(&self, history: &[Message], tools: &[ToolDefinition]) -> Result<Completion>;

    /// Single-shot prompt with no history and no tools.
    async fn prompt(&self, prompt: &str) -> Result<String>;
}
