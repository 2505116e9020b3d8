//! LLM provider implementations
//!
//! Each provider implements the chat and one-shot generation traits while
//! handling its own protocol and authentication. Gemini is the only provider
//! the relay ships with.

use crate::config::LlmConfig;
use crate::errors::RelayError;
use crate::llm::{ChatModel, TextGenerator};
use std::sync::Arc;

pub mod gemini;

/// Create the chat model used for replies.
pub fn create_chat_model(config: &LlmConfig) -> Result<Arc<dyn ChatModel>, RelayError> {
    Ok(Arc::new(gemini::create_client(config, &config.model)?))
}

/// Create the one-shot generator used for summarization.
pub fn create_summary_generator(config: &LlmConfig) -> Result<Arc<dyn TextGenerator>, RelayError> {
    Ok(Arc::new(gemini::create_client(config, &config.summary_model)?))
}
