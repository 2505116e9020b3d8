//! Conversation orchestration: one read/compact/generate/write cycle per prompt.
//!
//! [`ConversationService::send_message`] is the only code path that mutates a
//! conversation's history. It loads the stored history, summarizes it when it
//! has grown past the threshold, opens a chat with the model seeded with the
//! result, sends the prompt, and stores the transcript the model reports. The
//! service keeps no history of its own between calls.
//!
//! Calls for the same conversation are serialized: each holds that
//! conversation's lock from the read to the write, so two concurrent prompts
//! cannot both start from the same history and overwrite each other's turns.
//! Calls for different conversations run in parallel.

use crate::config::{MemoryConfig, RelayConfig};
use crate::core_types::{ChatOptions, ConversationId, History};
use crate::errors::RelayError;
use crate::llm::{ChatModel, TextGenerator};
use crate::memory::{
    HistoryState, HistoryStore, InMemoryHistoryStore, StoreStats, SummaryOutcome, Summarizer,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Per-conversation locks, created on demand and dropped once idle.
#[derive(Default)]
struct ConversationLocks {
    locks: Mutex<HashMap<ConversationId, Arc<AsyncMutex<()>>>>,
}

impl ConversationLocks {
    fn map(&self) -> MutexGuard<'_, HashMap<ConversationId, Arc<AsyncMutex<()>>>> {
        self.locks.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Wait for exclusive access to `id`. The lock entry is pruned when the
    /// returned guard drops, including when this future is cancelled while
    /// still waiting.
    async fn acquire(&self, id: &ConversationId) -> ConversationGuard<'_> {
        // Declared before the await so a pending lock future is dropped
        // first on cancellation.
        let mut guard = ConversationGuard {
            locks: self,
            id: *id,
            held: None,
        };
        let lock = self.map().entry(*id).or_default().clone();
        guard.held = Some(lock.lock_owned().await);
        guard
    }

    fn len(&self) -> usize {
        self.map().len()
    }
}

/// Exclusive access to one conversation for the duration of a call.
struct ConversationGuard<'a> {
    locks: &'a ConversationLocks,
    id: ConversationId,
    held: Option<OwnedMutexGuard<()>>,
}

impl Drop for ConversationGuard<'_> {
    fn drop(&mut self) {
        let mut locks = self.locks.map();
        self.held.take();
        // The map's own reference is the only one left.
        if locks.get(&self.id).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            locks.remove(&self.id);
        }
    }
}

pub struct ConversationService {
    store: Arc<dyn HistoryStore>,
    chat_model: Arc<dyn ChatModel>,
    summarizer: Summarizer,
    chat_options: ChatOptions,
    summary_threshold: usize,
    locks: ConversationLocks,
}

impl ConversationService {
    pub fn new(
        store: Arc<dyn HistoryStore>,
        chat_model: Arc<dyn ChatModel>,
        summary_generator: Arc<dyn TextGenerator>,
        chat_options: ChatOptions,
        memory: &MemoryConfig,
    ) -> Self {
        Self {
            store,
            chat_model,
            summarizer: Summarizer::new(summary_generator, memory.fallback_window),
            chat_options,
            summary_threshold: memory.summary_threshold,
            locks: ConversationLocks::default(),
        }
    }

    /// Wire a service from a loaded configuration with an in-memory store.
    pub fn from_config(
        config: &RelayConfig,
        chat_model: Arc<dyn ChatModel>,
        summary_generator: Arc<dyn TextGenerator>,
    ) -> Result<Self, RelayError> {
        let store = Arc::new(InMemoryHistoryStore::from_config(&config.memory));
        Ok(Self::new(
            store,
            chat_model,
            summary_generator,
            config.chat_options()?,
            &config.memory,
        ))
    }

    /// Send `prompt` in conversation `id` and return the model's reply.
    ///
    /// The prompt must already be validated (non-blank, within length limits).
    /// Fails with [`RelayError::GenerationError`] when the reply cannot be
    /// generated; the stored history is left untouched in that case.
    pub async fn send_message(&self, prompt: &str, id: &ConversationId) -> Result<String, RelayError> {
        let _guard = self.locks.acquire(id).await;
        self.exchange(prompt, id).await
    }

    async fn exchange(&self, prompt: &str, id: &ConversationId) -> Result<String, RelayError> {
        let history = self.store.get_history(id).unwrap_or_default();
        let history = self.compact(history, id).await;

        let mut chat = self
            .chat_model
            .start_chat(&self.chat_options, history)
            .await?;
        let reply = chat.send(prompt).await.map_err(|e| {
            log::error!("Generation failed for conversation {}: {}", id, e);
            e
        })?;

        log::debug!(
            "Conversation {} now holds {} turns",
            id,
            reply.updated_history.len()
        );
        self.store.set_history(id, reply.updated_history);

        Ok(reply.text)
    }

    async fn compact(&self, history: History, id: &ConversationId) -> History {
        match HistoryState::classify(history.len(), self.summary_threshold) {
            HistoryState::Fresh => history,
            HistoryState::Overflowing => {
                log::info!(
                    "History length ({}) of conversation {} exceeded threshold ({}), summarizing",
                    history.len(),
                    id,
                    self.summary_threshold
                );
                match self.summarizer.summarize(&history).await {
                    SummaryOutcome::Summarized(summary) => summary,
                    SummaryOutcome::Degraded { history, reason } => {
                        log::warn!(
                            "Continuing conversation {} with its last {} turns: {}",
                            id,
                            history.len(),
                            reason
                        );
                        history
                    }
                }
            }
        }
    }

    pub fn stats(&self) -> StoreStats {
        self.store.stats()
    }

    /// Number of conversations with a call in flight.
    pub fn active_conversations(&self) -> usize {
        self.locks.len()
    }
}
