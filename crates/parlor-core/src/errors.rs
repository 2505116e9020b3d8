//! Error types for the relay core
//!
//! Errors are grouped by the subsystem that raised them so callers can decide
//! how to react: summarization failures are absorbed by the summarizer,
//! generation failures are surfaced to the transport, and configuration
//! failures stop the process before it starts serving.

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum RelayError {
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Summarization failed: {0}")]
    SummarizationError(String),
    #[error("Generation failed: {0}")]
    GenerationError(String),
    #[error("Parsing error: {0}")]
    ParsingError(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<serde_yaml::Error> for RelayError {
    fn from(err: serde_yaml::Error) -> Self {
        RelayError::ConfigError(format!("Failed to parse YAML config: {}", err))
    }
}
