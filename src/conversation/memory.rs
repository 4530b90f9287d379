//! In-memory conversation store.
//!
//! Bounded by an idle TTL and a maximum thread count. Nothing survives a
//! restart.

use super::{new_thread_id, Conversation, ConversationStore, Message};
use crate::error::{PalaverError, Result};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

/// In-memory conversation store.
pub struct MemoryConversationStore {
    conversations: Mutex<HashMap<String, Conversation>>,
    max_threads: usize,
    idle_ttl: Option<Duration>,
}

impl MemoryConversationStore {
    /// Create an unbounded store.
    pub fn new() -> Self {
        Self {
            conversations: Mutex::new(HashMap::new()),
            max_threads: 0,
            idle_ttl: None,
        }
    }

    /// Cap the number of live threads (0 = unbounded).
    pub fn with_max_threads(mut self, max: usize) -> Self {
        self.max_threads = max;
        self
    }

    /// Drop threads idle for longer than `secs` (0 = never).
    pub fn with_idle_ttl_secs(mut self, secs: u64) -> Self {
        self.idle_ttl = match secs {
            0 => None,
            s => i64::try_from(s).ok().and_then(Duration::try_seconds),
        };
        self
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, Conversation>>> {
        self.conversations
            .lock()
            .map_err(|_| PalaverError::Store("conversation map lock poisoned".to_string()))
    }

    fn purge_expired(&self, map: &mut HashMap<String, Conversation>) {
        let Some(ttl) = self.idle_ttl else {
            return;
        };
        let cutoff = Utc::now() - ttl;
        let before = map.len();
        map.retain(|_, c| c.updated_at > cutoff);
        if map.len() < before {
            debug!("Purged {} idle conversation(s)", before - map.len());
        }
    }

    /// Evict least-recently-active threads until there is room for one more.
    fn make_room(&self, map: &mut HashMap<String, Conversation>) {
        if self.max_threads == 0 {
            return;
        }
        while map.len() >= self.max_threads {
            let oldest = map
                .values()
                .min_by_key(|c| c.updated_at)
                .map(|c| c.thread_id.clone());
            match oldest {
                Some(id) => {
                    debug!("Evicting conversation {}", id);
                    map.remove(&id);
                }
                None => break,
            }
        }
    }

    fn insert_new(&self, map: &mut HashMap<String, Conversation>, thread_id: String) -> Conversation {
        self.make_room(map);
        let conversation = Conversation::new(thread_id.clone());
        map.insert(thread_id, conversation.clone());
        conversation
    }
}

impl Default for MemoryConversationStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConversationStore for MemoryConversationStore {
    async fn get_or_create(&self, thread_id: Option<&str>) -> Result<Conversation> {
        let mut map = self.lock()?;
        self.purge_expired(&mut map);

        let thread_id = match thread_id.map(str::trim).filter(|id| !id.is_empty()) {
            Some(id) => id.to_string(),
            None => new_thread_id(),
        };

        if let Some(existing) = map.get_mut(&thread_id) {
            existing.updated_at = Utc::now();
            return Ok(existing.clone());
        }

        Ok(self.insert_new(&mut map, thread_id))
    }

    async fn get(&self, thread_id: &str) -> Result<Option<Conversation>> {
        let map = self.lock()?;
        Ok(map.get(thread_id).cloned())
    }

    async fn append(&self, thread_id: &str, messages: &[Message]) -> Result<()> {
        let mut map = self.lock()?;

        if !map.contains_key(thread_id) {
            warn!("Conversation {} was evicted mid-turn; recreating it", thread_id);
            self.insert_new(&mut map, thread_id.to_string());
        }

        if let Some(conversation) = map.get_mut(thread_id) {
            conversation.messages.extend_from_slice(messages);
            conversation.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn append_or_restore(
        &self,
        thread_id: &str,
        base: &[Message],
        messages: &[Message],
    ) -> Result<()> {
        let mut map = self.lock()?;

        if !map.contains_key(thread_id) {
            warn!(
                "Conversation {} was evicted mid-turn; restoring {} earlier message(s)",
                thread_id,
                base.len()
            );
            self.insert_new(&mut map, thread_id.to_string());
            if let Some(conversation) = map.get_mut(thread_id) {
                conversation.messages.extend_from_slice(base);
            }
        }

        if let Some(conversation) = map.get_mut(thread_id) {
            conversation.messages.extend_from_slice(messages);
            conversation.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.lock()?.len())
    }
}
