//! Error types for the Parlor server.

use crate::request::FieldErrors;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use parlor_core::RelayError;
use serde_json::json;
use thiserror::Error;

/// Result type alias for server operations.
pub type Result<T> = std::result::Result<T, ServerError>;

/// Body sent for any failure to produce a reply. Details stay in the log.
pub const GENERATION_FAILED_MESSAGE: &str = "Failed to generate chat response.";

/// Errors that can occur in the Parlor server.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Body could not be read as a chat request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// One or more request fields failed validation
    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    /// The model could not produce a reply
    #[error("Generation failed: {0}")]
    Generation(String),

    /// Server configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal server error
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ServerError {
    /// Create a new invalid request error.
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// Create a new configuration error.
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

impl From<RelayError> for ServerError {
    fn from(err: RelayError) -> Self {
        match err {
            RelayError::ValidationError(msg) => ServerError::InvalidRequest(msg),
            RelayError::GenerationError(_) | RelayError::ParsingError(_) => {
                ServerError::Generation(err.to_string())
            }
            RelayError::SummarizationError(_) => ServerError::Generation(err.to_string()),
            RelayError::ConfigError(msg) => ServerError::Config(msg),
        }
    }
}

/// Convert ServerError to HTTP status code
impl ServerError {
    pub fn status_code(&self) -> u16 {
        match self {
            ServerError::InvalidRequest(_) | ServerError::Validation(_) => 400,
            ServerError::Generation(_)
            | ServerError::Config(_)
            | ServerError::Internal(_) => 500,
        }
    }

    pub fn error_type(&self) -> &'static str {
        match self {
            ServerError::InvalidRequest(_) => "invalid_request",
            ServerError::Validation(_) => "validation_error",
            ServerError::Generation(_) => "generation_error",
            ServerError::Config(_) => "config_error",
            ServerError::Internal(_) => "internal_error",
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let body = match &self {
            ServerError::Validation(fields) => json!({
                "error": "Invalid request",
                "type": self.error_type(),
                "details": fields,
            }),
            ServerError::InvalidRequest(msg) => json!({
                "error": "Invalid request",
                "type": self.error_type(),
                "details": msg,
            }),
            _ => {
                log::error!("Request failed: {}", self);
                json!({ "error": GENERATION_FAILED_MESSAGE })
            }
        };

        (status, Json(body)).into_response()
    }
}
