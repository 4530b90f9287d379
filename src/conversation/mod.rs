//! Conversation state for Palaver.
//!
//! Provides the message model, a trait-based store keyed by thread
//! identifier, and per-thread locks that serialise turns on the same thread.

mod locks;
mod memory;
mod message;

pub use locks::{ThreadGuard, ThreadLocks};
pub use memory::MemoryConversationStore;
pub use message::{Message, Role, ToolCall};

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An ordered message history identified by a thread id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub thread_id: String,
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    /// Last time the conversation was read or appended to.
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    /// Create an empty conversation.
    pub fn new(thread_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            thread_id: thread_id.into(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Generate a fresh thread identifier.
pub fn new_thread_id() -> String {
    Uuid::new_v4().to_string()
}

/// Trait for conversation store backends.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Fetch a conversation, creating it if unseen.
    ///
    /// An absent or blank id gets a freshly generated identifier.
    async fn get_or_create(&self, thread_id: Option<&str>) -> Result<Conversation>;

    /// Fetch a conversation without creating it.
    async fn get(&self, thread_id: &str) -> Result<Option<Conversation>>;

    /// Append messages in order to a thread's history.
    async fn append(&self, thread_id: &str, messages: &[Message]) -> Result<()>;

    /// Append a turn's messages to a thread that held `base` when the turn
    /// started. A thread dropped in the meantime is restored from `base`
    /// first, so its history stays complete.
    async fn append_or_restore(
        &self,
        thread_id: &str,
        base: &[Message],
        messages: &[Message],
    ) -> Result<()>;

    /// Number of live conversations.
    async fn len(&self) -> Result<usize>;

    async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }
}
