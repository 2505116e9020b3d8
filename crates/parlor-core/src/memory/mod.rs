//! Conversation memory: per-conversation history storage and compaction.
//!
//! The store keeps every conversation's full transcript keyed by its
//! identifier, bounded by an explicit retention policy. The summarizer folds a
//! history that has grown past the configured threshold into a single
//! synthetic turn so the next model call stays within its context budget.

pub mod store;
pub mod summarizer;

use crate::core_types::{ConversationId, History};
use serde::Serialize;

pub use store::InMemoryHistoryStore;
pub use summarizer::{SummaryOutcome, Summarizer, SUMMARY_PREFIX};

/// Storage of conversation histories. Reads and writes replace whole
/// histories; implementations never interpret the turns they hold.
pub trait HistoryStore: Send + Sync {
    fn get_history(&self, id: &ConversationId) -> Option<History>;
    fn set_history(&self, id: &ConversationId, history: History);
    fn stats(&self) -> StoreStats {
        StoreStats::default()
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub conversations: usize,
    pub turns: usize,
}

/// Where a history stands relative to the summarization threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryState {
    /// At or below the threshold: used as-is.
    Fresh,
    /// Above the threshold: summarized before use.
    Overflowing,
}

impl HistoryState {
    pub fn classify(history_len: usize, threshold: usize) -> Self {
        if history_len > threshold {
            HistoryState::Overflowing
        } else {
            HistoryState::Fresh
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_is_inclusive_for_fresh() {
        assert_eq!(HistoryState::classify(0, 20), HistoryState::Fresh);
        assert_eq!(HistoryState::classify(20, 20), HistoryState::Fresh);
        assert_eq!(HistoryState::classify(21, 20), HistoryState::Overflowing);
    }
}
