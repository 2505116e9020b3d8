//! LLM-based compaction of a conversation history
//!
//! A long history is rendered as plain text, sent to the one-shot generator
//! with a summarization instruction, and replaced by a single user turn that
//! carries the summary. The summary replaces the whole span it was computed
//! from; it is never merged with an earlier summary.
//!
//! Summarization is best effort. When the generator fails the caller gets the
//! most recent turns of the original history instead, so a conversation keeps
//! going with less context rather than failing the request.

use crate::core_types::{History, Turn};
use crate::llm::TextGenerator;
use std::sync::Arc;

/// Marks the synthetic turn that stands in for a summarized span.
pub const SUMMARY_PREFIX: &str = "This is a summary of our conversation so far: ";

const SUMMARIZATION_PROMPT: &str = "Summarize the following conversation concisely. \
Capture the key points, the user's intent and the important information exchanged. \
The summary will be used as context for continuing the conversation.\n\n---\n\n{conversation}";

/// What the summarizer produced for a history.
#[derive(Debug, Clone, PartialEq)]
pub enum SummaryOutcome {
    /// A single synthetic user turn holding the summary.
    Summarized(History),
    /// Summarization failed; the trailing turns of the input.
    Degraded { history: History, reason: String },
}

impl SummaryOutcome {
    pub fn into_history(self) -> History {
        match self {
            SummaryOutcome::Summarized(history) => history,
            SummaryOutcome::Degraded { history, .. } => history,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, SummaryOutcome::Degraded { .. })
    }
}

pub struct Summarizer {
    generator: Arc<dyn TextGenerator>,
    fallback_window: usize,
}

impl Summarizer {
    pub fn new(generator: Arc<dyn TextGenerator>, fallback_window: usize) -> Self {
        Self {
            generator,
            fallback_window,
        }
    }

    /// Render turns as `role: text` lines.
    pub fn render_transcript(history: &[Turn]) -> String {
        history
            .iter()
            .map(|turn| {
                let text = turn
                    .parts
                    .iter()
                    .map(|p| p.text.as_str())
                    .collect::<Vec<_>>()
                    .join(" ");
                format!("{}: {}", turn.role, text)
            })
            .collect::<Vec<String>>()
            .join("\n")
    }

    pub fn build_prompt(history: &[Turn]) -> String {
        SUMMARIZATION_PROMPT.replace("{conversation}", &Self::render_transcript(history))
    }

    /// Collapse `history` into a single summary turn.
    ///
    /// A generator error degrades to the last `fallback_window` turns. So does a
    /// summary that is empty or whitespace only: an otherwise successful call
    /// that returns no usable text is treated the same as a failure rather than
    /// stored as a blank summary turn.
    pub async fn summarize(&self, history: &[Turn]) -> SummaryOutcome {
        log::info!("Summarizing history of {} turns", history.len());

        match self.generator.generate_once(&Self::build_prompt(history)).await {
            Ok(summary) if !summary.trim().is_empty() => {
                log::info!("Generated summary: {}", summary);
                SummaryOutcome::Summarized(vec![Turn::user(format!("{}{}", SUMMARY_PREFIX, summary))])
            }
            Ok(_) => {
                log::warn!("Summarization returned no text, keeping recent turns");
                self.degrade(history, "empty summary".to_string())
            }
            Err(e) => {
                log::error!("Error during summarization: {}", e);
                self.degrade(history, e.to_string())
            }
        }
    }

    fn degrade(&self, history: &[Turn], reason: String) -> SummaryOutcome {
        let start = history.len().saturating_sub(self.fallback_window);
        SummaryOutcome::Degraded {
            history: history[start..].to_vec(),
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_types::{Part, Role};
    use crate::errors::RelayError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct StubGenerator {
        reply: Result<String, RelayError>,
        prompts: Mutex<Vec<String>>,
    }

    impl StubGenerator {
        fn new(reply: Result<String, RelayError>) -> Arc<Self> {
            Arc::new(Self {
                reply,
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl TextGenerator for StubGenerator {
        async fn generate_once(&self, prompt: &str) -> Result<String, RelayError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.reply.clone()
        }
    }

    fn history(n: usize) -> History {
        (0..n)
            .map(|i| if i % 2 == 0 { Turn::user(format!("u{}", i)) } else { Turn::model(format!("m{}", i)) })
            .collect()
    }

    #[test]
    fn test_render_transcript() {
        let turns = vec![
            Turn::user("Hi"),
            Turn {
                role: Role::Model,
                parts: vec![Part { text: "Hello".to_string() }, Part { text: "there".to_string() }],
            },
        ];
        assert_eq!(Summarizer::render_transcript(&turns), "user: Hi\nmodel: Hello there");
    }

    #[tokio::test]
    async fn test_summary_replaces_history_with_single_user_turn() {
        let generator = StubGenerator::new(Ok("They talked about shoes.".to_string()));
        let summarizer = Summarizer::new(generator.clone(), 10);

        let outcome = summarizer.summarize(&history(25)).await;
        assert!(!outcome.is_degraded());

        let summarized = outcome.into_history();
        assert_eq!(summarized.len(), 1);
        assert_eq!(summarized[0].role, Role::User);
        assert_eq!(
            summarized[0].text(),
            "This is a summary of our conversation so far: They talked about shoes."
        );

        let prompts = generator.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].starts_with("Summarize the following conversation concisely."));
        assert!(prompts[0].contains("user: u0\nmodel: m1"));
        assert!(prompts[0].ends_with("user: u24"));
    }

    #[tokio::test]
    async fn test_failure_degrades_to_recent_turns() {
        let generator = StubGenerator::new(Err(RelayError::SummarizationError("quota".to_string())));
        let summarizer = Summarizer::new(generator, 10);
        let original = history(21);

        match summarizer.summarize(&original).await {
            SummaryOutcome::Degraded { history, reason } => {
                assert_eq!(history, original[11..].to_vec());
                assert!(reason.contains("quota"));
            }
            other => panic!("expected degraded outcome, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_summary_degrades() {
        let generator = StubGenerator::new(Ok("   ".to_string()));
        let summarizer = Summarizer::new(generator, 3);

        let outcome = summarizer.summarize(&history(5)).await;
        assert!(outcome.is_degraded());
        assert_eq!(outcome.into_history().len(), 3);
    }

    #[tokio::test]
    async fn test_fallback_window_larger_than_history() {
        let generator = StubGenerator::new(Err(RelayError::SummarizationError("down".to_string())));
        let summarizer = Summarizer::new(generator, 10);

        let outcome = summarizer.summarize(&history(4)).await;
        assert_eq!(outcome.into_history(), history(4));
    }
}
