//! Google Gemini API client implementation
//!
//! This module provides a native Google Gemini API client that talks to the
//! `generateContent` endpoint directly. Chat contexts are kept client-side: a
//! session holds the transcript and replays it with every request, appending
//! the new user turn and the candidate the model returns.

use crate::config::{ConfigLoader, LlmConfig};
use crate::core_types::{ChatOptions, ChatReply, History, Part, Role, SafetySetting, Turn, Usage};
use crate::errors::RelayError;
use crate::llm::{ChatModel, ChatSession, TextGenerator};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Google Gemini API client
#[derive(Clone)]
pub struct GeminiClient {
    api_key: String,
    model: String,
    client: Client,
    base_url: String,
}

impl GeminiClient {
    /// Create a new Gemini client
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            api_key,
            model,
            client: Client::new(),
            base_url: crate::config::DEFAULT_GEMINI_BASE_URL.to_string(),
        }
    }

    /// Create a new Gemini client with custom base URL
    pub fn with_base_url(api_key: String, model: String, base_url: String) -> Self {
        Self {
            api_key,
            model,
            client: Client::new(),
            base_url,
        }
    }

    /// Replace the HTTP client, e.g. to apply a request timeout.
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[derive(Debug, Serialize)]
struct GeminiRequest<'a> {
    contents: &'a [Turn],
    #[serde(rename = "systemInstruction", skip_serializing_if = "Option::is_none")]
    system_instruction: Option<SystemInstruction>,
    #[serde(rename = "safetySettings", skip_serializing_if = "Option::is_none")]
    safety_settings: Option<&'a [SafetySetting]>,
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    generation_config: Option<GeminiGenerationConfig>,
}

#[derive(Debug, Serialize)]
struct SystemInstruction {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct GeminiGenerationConfig {
    temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(rename = "promptFeedback", default)]
    prompt_feedback: Option<GeminiPromptFeedback>,
    #[serde(rename = "usageMetadata", default)]
    usage_metadata: Option<GeminiUsage>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiCandidateContent>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidateContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

// Non-text parts (thoughts, function calls) are skipped.
#[derive(Debug, Deserialize)]
struct GeminiResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiPromptFeedback {
    #[serde(rename = "blockReason")]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiUsage {
    #[serde(rename = "promptTokenCount", default)]
    prompt_token_count: Option<i32>,
    #[serde(rename = "candidatesTokenCount", default)]
    candidates_token_count: Option<i32>,
    #[serde(rename = "totalTokenCount", default)]
    total_token_count: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    error: GeminiErrorDetails,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorDetails {
    code: u16,
    message: String,
}

/// Text of the first candidate, plus the model turn to record for it.
struct CandidateOutput {
    text: String,
    turn: Turn,
    usage: Option<Usage>,
}

impl GeminiClient {
    async fn generate_content(&self, request: &GeminiRequest<'_>) -> Result<GeminiResponse, RelayError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        log::debug!(
            "Gemini request to model {} with {} content(s)",
            self.model,
            request.contents.len()
        );

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| RelayError::GenerationError(format!("Gemini API request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());

            if let Ok(gemini_error) = serde_json::from_str::<GeminiError>(&error_text) {
                return Err(RelayError::GenerationError(format!(
                    "Gemini API error {}: {}",
                    gemini_error.error.code, gemini_error.error.message
                )));
            }

            return Err(RelayError::GenerationError(format!(
                "Gemini API request failed with status {}: {}",
                status, error_text
            )));
        }

        response
            .json()
            .await
            .map_err(|e| RelayError::ParsingError(format!("Failed to parse Gemini response: {}", e)))
    }

    fn extract_candidate(response: GeminiResponse) -> Result<CandidateOutput, RelayError> {
        let usage = response.usage_metadata.map(|u| Usage {
            prompt_tokens: u.prompt_token_count.unwrap_or(0) as u32,
            completion_tokens: u.candidates_token_count.unwrap_or(0) as u32,
            total_tokens: u.total_token_count.unwrap_or(0) as u32,
        });

        let candidate = match response.candidates.into_iter().next() {
            Some(candidate) => candidate,
            None => {
                let reason = response
                    .prompt_feedback
                    .and_then(|f| f.block_reason)
                    .unwrap_or_else(|| "no candidates".to_string());
                return Err(RelayError::GenerationError(format!(
                    "Gemini returned no candidates ({})",
                    reason
                )));
            }
        };

        let parts: Vec<Part> = candidate
            .content
            .map(|c| c.parts)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|p| p.text)
            .map(|text| Part { text })
            .collect();

        if parts.is_empty() {
            return Err(RelayError::GenerationError(format!(
                "Gemini candidate has no text (finish reason: {})",
                candidate.finish_reason.as_deref().unwrap_or("unknown")
            )));
        }

        let turn = Turn {
            role: Role::Model,
            parts,
        };

        Ok(CandidateOutput {
            text: turn.text(),
            turn,
            usage,
        })
    }
}

/// Chat context backed by [`GeminiClient`].
pub struct GeminiChatSession {
    client: GeminiClient,
    options: ChatOptions,
    history: History,
}

#[async_trait]
impl ChatSession for GeminiChatSession {
    async fn send(&mut self, prompt: &str) -> Result<ChatReply, RelayError> {
        let mut contents = self.history.clone();
        contents.push(Turn::user(prompt));

        let request = GeminiRequest {
            contents: &contents,
            system_instruction: if self.options.system_instruction.is_empty() {
                None
            } else {
                Some(SystemInstruction {
                    parts: vec![Part {
                        text: self.options.system_instruction.clone(),
                    }],
                })
            },
            safety_settings: Some(&self.options.safety_settings),
            generation_config: Some(GeminiGenerationConfig {
                temperature: self.options.temperature,
                max_output_tokens: self.options.max_output_tokens,
            }),
        };

        let response = self.client.generate_content(&request).await?;
        let output = GeminiClient::extract_candidate(response)?;

        if let Some(usage) = &output.usage {
            log::debug!(
                "Gemini token usage: prompt={}, completion={}, total={}",
                usage.prompt_tokens, usage.completion_tokens, usage.total_tokens
            );
        }

        // The transcript only advances once the model has answered.
        contents.push(output.turn);
        self.history = contents;

        Ok(ChatReply {
            text: output.text,
            updated_history: self.history.clone(),
            usage: output.usage,
        })
    }
}

#[async_trait]
impl ChatModel for GeminiClient {
    async fn start_chat(
        &self,
        options: &ChatOptions,
        seed_history: History,
    ) -> Result<Box<dyn ChatSession>, RelayError> {
        Ok(Box::new(GeminiChatSession {
            client: self.clone(),
            options: options.clone(),
            history: seed_history,
        }))
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate_once(&self, prompt: &str) -> Result<String, RelayError> {
        let contents = [Turn::user(prompt)];
        let request = GeminiRequest {
            contents: &contents,
            system_instruction: None,
            safety_settings: None,
            generation_config: None,
        };

        let response = self
            .generate_content(&request)
            .await
            .map_err(|e| RelayError::SummarizationError(e.to_string()))?;
        let output = Self::extract_candidate(response)
            .map_err(|e| RelayError::SummarizationError(e.to_string()))?;
        Ok(output.text)
    }
}

/// Create a Gemini client for `model` from configuration
pub fn create_client(config: &LlmConfig, model: &str) -> Result<GeminiClient, RelayError> {
    let api_key = ConfigLoader::resolve_api_key(&config.auth)?;

    let http = Client::builder()
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .build()
        .map_err(|e| RelayError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

    Ok(
        GeminiClient::with_base_url(api_key, model.to_string(), config.base_url.clone())
            .with_http_client(http),
    )
}
