//! Chat handler trait and its implementation over the conversation service.

use async_trait::async_trait;
use parlor_core::{ConversationId, ConversationService};
use serde_json::json;
use std::sync::Arc;

use crate::error::Result;

/// What the HTTP layer needs from the conversation core.
#[async_trait]
pub trait ChatHandler: Send + Sync + Clone + 'static {
    /// Produce the reply to `prompt` in conversation `id`.
    ///
    /// The prompt has already been trimmed and length-checked.
    async fn send_message(&self, prompt: &str, id: &ConversationId) -> Result<String>;

    /// Optional memory statistics for the `/memory/stats` endpoint.
    ///
    /// The default implementation reports none.
    async fn memory_stats(&self) -> Result<Option<serde_json::Value>> {
        Ok(None)
    }
}

#[async_trait]
impl ChatHandler for Arc<ConversationService> {
    async fn send_message(&self, prompt: &str, id: &ConversationId) -> Result<String> {
        Ok(ConversationService::send_message(self, prompt, id).await?)
    }

    async fn memory_stats(&self) -> Result<Option<serde_json::Value>> {
        let stats = self.stats();
        Ok(Some(json!({
            "conversations": stats.conversations,
            "turns": stats.turns,
            "active_conversations": self.active_conversations(),
        })))
    }
}
