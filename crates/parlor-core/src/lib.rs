//! Core of the Parlor chat relay: conversation memory and model hand-off.
//!
//! A caller hands this crate a prompt tagged with a conversation identifier.
//! The crate loads that conversation's history, compacts it when it has grown
//! past a threshold, opens a chat with the language model seeded with the
//! (possibly compacted) history, and stores the transcript the model reports
//! back so the next turn picks up where this one left off.
//!
//! # Architecture Overview
//!
//! - **Core types**: conversation identifiers, role-tagged turns and histories
//! - **Language model integration**: chat and one-shot generation traits plus
//!   a Gemini REST implementation
//! - **Memory management**: the history store with LRU/TTL retention and the
//!   summarizer that folds long histories into a single synthetic turn
//! - **Conversation orchestration**: per-conversation read/compact/generate/write
//!   cycle, serialized per conversation
//! - **Configuration system**: YAML configuration with environment-resolved
//!   credentials and a templated system instruction

pub mod config;
pub mod conversation;
pub mod core_types;
pub mod errors;
pub mod llm;
pub mod memory;

pub use config::*;
pub use conversation::ConversationService;
pub use core_types::{ConversationId, History, Role, Turn};
pub use errors::RelayError;
pub use llm::{ChatModel, ChatSession, TextGenerator};
pub use memory::{HistoryStore, InMemoryHistoryStore, Summarizer};
