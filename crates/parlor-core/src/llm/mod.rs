//! Language model capabilities consumed by the conversation core.
//!
//! The core needs two things from a model: a multi-turn chat that can be
//! seeded with prior history and reports its full transcript after each reply,
//! and a single-shot generation call used for summarization. Both are traits so
//! the conversation service can be driven by stubs in tests and by any provider
//! in production.

use crate::core_types::{ChatOptions, ChatReply, History};
use crate::errors::RelayError;
use async_trait::async_trait;

pub mod providers;

pub use providers::gemini::GeminiClient;

/// Opens chat contexts seeded with an existing history.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn start_chat(
        &self,
        options: &ChatOptions,
        seed_history: History,
    ) -> Result<Box<dyn ChatSession>, RelayError>;
}

/// A live chat context. Each `send` appends the prompt and the model's reply to
/// the context's transcript.
#[async_trait]
pub trait ChatSession: Send {
    async fn send(&mut self, prompt: &str) -> Result<ChatReply, RelayError>;
}

/// Single-shot text generation with no conversational context.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate_once(&self, prompt: &str) -> Result<String, RelayError>;
}
