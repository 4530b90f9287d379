//! Session boundary: thread resolution, system instruction, persistence.

use crate::agent::{Agent, ToolCallRecord};
use crate::config::{Credentials, Prompts, Settings};
use crate::conversation::{
    new_thread_id, ConversationStore, MemoryConversationStore, Message, ThreadLocks,
};
use crate::error::{PalaverError, Result};
use crate::model::{LanguageModel, OpenAiModel};
use crate::tools::ToolRegistry;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Answer to one chat message.
#[derive(Debug, Clone, Serialize)]
pub struct ChatReply {
    pub response: String,
    pub thread_id: String,
    pub tool_calls: Vec<ToolCallRecord>,
    pub iterations: usize,
    pub complete: bool,
}

/// Handles chat turns against a conversation store.
pub struct ChatService {
    store: Arc<dyn ConversationStore>,
    locks: ThreadLocks,
    agent: Agent,
    system_prompt: String,
}

impl ChatService {
    pub fn new(store: Arc<dyn ConversationStore>, agent: Agent, system_prompt: impl Into<String>) -> Self {
        Self {
            store,
            locks: ThreadLocks::new(),
            agent,
            system_prompt: system_prompt.into(),
        }
    }

    /// Wire up the model, the standard tools and an in-memory store.
    pub fn from_settings(settings: &Settings, credentials: &Credentials, prompts: &Prompts) -> Result<Self> {
        let model: Arc<dyn LanguageModel> = Arc::new(OpenAiModel::new(
            &settings.model,
            credentials.model_api_key.as_deref(),
        )?);
        let tools = ToolRegistry::standard(model.clone(), credentials, settings, prompts)?;
        info!("Registered tools: {}", tools.names().join(", "));

        let agent = Agent::new(model, Arc::new(tools))
            .with_max_iterations(settings.agent.max_iterations);
        let store = MemoryConversationStore::new()
            .with_max_threads(settings.store.max_threads)
            .with_idle_ttl_secs(settings.store.idle_ttl_secs);

        Ok(Self::new(Arc::new(store), agent, prompts.system_instruction()))
    }

    pub fn store(&self) -> &Arc<dyn ConversationStore> {
        &self.store
    }

    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    /// Run one turn for `message` on `thread_id`, or on a new thread.
    #[instrument(skip(self, message))]
    pub async fn handle(&self, message: &str, thread_id: Option<&str>) -> Result<ChatReply> {
        let message = message.trim();
        if message.is_empty() {
            return Err(PalaverError::InvalidInput("Message cannot be empty".to_string()));
        }

        let thread_id = match thread_id.map(str::trim).filter(|id| !id.is_empty()) {
            Some(id) => id.to_string(),
            None => new_thread_id(),
        };

        let _guard = self.locks.acquire(&thread_id).await;
        let conversation = self.store.get_or_create(Some(&thread_id)).await?;

        let stored = conversation.messages;
        let mut turn = Vec::new();
        if stored.is_empty() {
            turn.push(Message::system(self.system_prompt.clone()));
        }
        let mut history = stored.clone();
        history.extend(turn.iter().cloned());

        let outcome = self.agent.run_turn(&history, message).await?;

        turn.extend(outcome.messages);
        self.store
            .append_or_restore(&thread_id, &stored, &turn)
            .await?;
        debug!(
            "Thread {} now has {} new message(s) after {} iteration(s)",
            thread_id,
            turn.len(),
            outcome.iterations
        );

        Ok(ChatReply {
            response: outcome.reply,
            thread_id,
            tool_calls: outcome.tool_calls,
            iterations: outcome.iterations,
            complete: outcome.complete,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::Role;
    use crate::model::testing::ScriptedModel;
    use crate::model::Completion;
    use crate::tools::ToolDefinition;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Answers every call, but opens another thread on the shared store
    /// during the second one.
    struct CrowdingModel {
        store: Arc<MemoryConversationStore>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LanguageModel for CrowdingModel {
        async fn complete(&self, _history: &[Message], _tools: &[ToolDefinition]) -> Result<Completion> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n == 2 {
                self.store.get_or_create(Some("other")).await?;
            }
            Ok(Completion::FinalAnswer(format!("answer {}", n)))
        }

        async fn prompt(&self, _prompt: &str) -> Result<String> {
            Err(PalaverError::Model("no single-shot prompts here".to_string()))
        }
    }

    fn service(model: Arc<ScriptedModel>) -> ChatService {
        let agent = Agent::new(model, Arc::new(ToolRegistry::new()));
        ChatService::new(Arc::new(MemoryConversationStore::new()), agent, "be brief")
    }

    fn answers(texts: &[&str]) -> Arc<ScriptedModel> {
        Arc::new(ScriptedModel::new(
            texts
                .iter()
                .map(|t| Completion::FinalAnswer(t.to_string()))
                .collect(),
        ))
    }

    #[tokio::test]
    async fn test_empty_message_rejected_without_creating_thread() {
        let service = service(answers(&[]));

        let err = service.handle("   ", None).await.unwrap_err();

        assert!(err.is_client_error());
        assert!(service.store().is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn test_new_thread_ids_are_unique() {
        let service = service(answers(&["one", "two"]));

        let first = service.handle("hi", None).await.unwrap();
        let second = service.handle("hi", Some("  ")).await.unwrap();

        assert!(!first.thread_id.is_empty());
        assert_ne!(first.thread_id, second.thread_id);
        assert_eq!(first.response, "one");
    }

    #[tokio::test]
    async fn test_thread_continuity() {
        let model = answers(&["first answer", "second answer"]);
        let service = service(model.clone());

        let first = service.handle("first", None).await.unwrap();
        let second = service
            .handle("second", Some(&first.thread_id))
            .await
            .unwrap();

        assert_eq!(second.thread_id, first.thread_id);
        let histories = model.histories_seen();
        let earlier = &histories[0];
        let later = &histories[1];
        assert_eq!(&later[..earlier.len()], earlier.as_slice());
        assert_eq!(later[earlier.len()], Message::assistant("first answer"));
    }

    #[tokio::test]
    async fn test_system_instruction_seeded_once() {
        let service = service(answers(&["a", "b"]));

        let reply = service.handle("one", None).await.unwrap();
        service.handle("two", Some(&reply.thread_id)).await.unwrap();

        let conversation = service.store().get(&reply.thread_id).await.unwrap().unwrap();
        let system: Vec<_> = conversation
            .messages
            .iter()
            .filter(|m| m.role == Role::System)
            .collect();
        assert_eq!(system.len(), 1);
        assert_eq!(conversation.messages[0], Message::system("be brief"));
        assert_eq!(conversation.messages.len(), 5);
    }

    #[tokio::test]
    async fn test_model_failure_persists_nothing() {
        let service = service(Arc::new(ScriptedModel::failing("outage")));

        let err = service.handle("hello", Some("t-1")).await.unwrap_err();

        assert!(matches!(err, PalaverError::Model(_)));
        let conversation = service.store().get("t-1").await.unwrap().unwrap();
        assert!(conversation.messages.is_empty());
    }

    #[tokio::test]
    async fn test_message_is_trimmed() {
        let model = answers(&["ok"]);
        let service = service(model.clone());

        service.handle("  padded  ", None).await.unwrap();

        assert_eq!(model.histories_seen()[0][1], Message::user("padded"));
    }

    #[tokio::test]
    async fn test_thread_evicted_mid_turn_keeps_full_history() {
        let store = Arc::new(MemoryConversationStore::new().with_max_threads(1));
        let model = Arc::new(CrowdingModel {
            store: store.clone(),
            calls: AtomicUsize::new(0),
        });
        let agent = Agent::new(model, Arc::new(ToolRegistry::new()));
        let service = ChatService::new(store.clone(), agent, "be brief");

        service.handle("first", Some("t1")).await.unwrap();
        let reply = service.handle("second", Some("t1")).await.unwrap();
        assert_eq!(reply.response, "answer 2");

        let conversation = store.get("t1").await.unwrap().unwrap();
        assert_eq!(
            conversation.messages,
            vec![
                Message::system("be brief"),
                Message::user("first"),
                Message::assistant("answer 1"),
                Message::user("second"),
                Message::assistant("answer 2"),
            ]
        );
        assert!(store.get("other").await.unwrap().is_none());
    }
}
