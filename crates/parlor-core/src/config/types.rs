//! Configuration type definitions for the relay
//!
//! Every section is optional in YAML and falls back to the defaults the relay
//! has always shipped with, so an empty file (or no file at all) yields a
//! working configuration once a credential is present in the environment.

use crate::core_types::{permissive_safety_settings, ChatOptions, SafetySetting};
use crate::errors::RelayError;
use serde::{Deserialize, Serialize};

/// Placeholder in the system-instruction template that receives the
/// reference data text.
pub const REFERENCE_DATA_PLACEHOLDER: &str = "{{reference_data}}";

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_API_KEY_ENV: &str = "GEMINI_API_KEY";

const DEFAULT_SYSTEM_TEMPLATE: &str = "You are a friendly and concise assistant. \
Answer using the reference information below when it is relevant, and say so \
plainly when a question falls outside of it.\n\n\
Reference information:\n{{reference_data}}";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RelayConfig {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
    #[serde(default)]
    pub prompt: PromptConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_chat_model")]
    pub model: String,
    #[serde(default = "default_summary_model")]
    pub summary_model: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub parameters: ModelParameters,
    #[serde(default = "permissive_safety_settings")]
    pub safety_settings: Vec<SafetySetting>,
    #[serde(default)]
    pub auth: LlmAuth,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: default_chat_model(),
            summary_model: default_summary_model(),
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
            parameters: ModelParameters::default(),
            safety_settings: permissive_safety_settings(),
            auth: LlmAuth::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelParameters {
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
}

impl Default for ModelParameters {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            max_output_tokens: default_max_output_tokens(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmAuth {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: Option<String>,
}

impl Default for LlmAuth {
    fn default() -> Self {
        Self {
            api_key: None,
            api_key_env: default_api_key_env(),
        }
    }
}

/// Summarization policy and store retention.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Histories longer than this many turns are summarized before use.
    #[serde(default = "default_summary_threshold")]
    pub summary_threshold: usize,
    /// Turns kept when summarization fails.
    #[serde(default = "default_fallback_window")]
    pub fallback_window: usize,
    /// Conversations held before the least recently used one is evicted.
    #[serde(default = "default_max_conversations")]
    pub max_conversations: usize,
    /// Idle time after which a conversation is forgotten. `None` keeps it
    /// until evicted by capacity.
    #[serde(default)]
    pub idle_ttl_secs: Option<u64>,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            summary_threshold: default_summary_threshold(),
            fallback_window: default_fallback_window(),
            max_conversations: default_max_conversations(),
            idle_ttl_secs: None,
        }
    }
}

/// Source for a piece of the system instruction
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum PromptSource {
    Inline { inline: String },
    File { file: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptConfig {
    #[serde(default = "default_template")]
    pub template: PromptSource,
    #[serde(default)]
    pub reference_data: Option<PromptSource>,
    /// System instruction with the reference data spliced in. Filled by the
    /// loader.
    #[serde(skip)]
    pub assembled: Option<String>,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            template: default_template(),
            reference_data: None,
            assembled: None,
        }
    }
}

impl PromptConfig {
    /// Splice the reference data into the template.
    pub fn render(template: &str, reference_data: &str) -> String {
        template.replace(REFERENCE_DATA_PLACEHOLDER, reference_data)
    }
}

impl RelayConfig {
    /// Options every chat context is opened with. Requires the prompt to have
    /// been resolved by the loader.
    pub fn chat_options(&self) -> Result<ChatOptions, RelayError> {
        let system_instruction = self.prompt.assembled.clone().ok_or_else(|| {
            RelayError::ConfigError("System instruction has not been resolved".to_string())
        })?;

        Ok(ChatOptions {
            system_instruction,
            safety_settings: self.llm.safety_settings.clone(),
            temperature: self.llm.parameters.temperature,
            max_output_tokens: self.llm.parameters.max_output_tokens,
        })
    }
}

fn default_chat_model() -> String { "gemini-2.5-flash".to_string() }
fn default_summary_model() -> String { "gemini-2.5-pro".to_string() }
fn default_base_url() -> String { DEFAULT_GEMINI_BASE_URL.to_string() }
fn default_request_timeout_secs() -> u64 { 120 }
fn default_temperature() -> f32 { 0.2 }
fn default_max_output_tokens() -> u32 { 800 }
fn default_api_key_env() -> Option<String> { Some(DEFAULT_API_KEY_ENV.to_string()) }
fn default_summary_threshold() -> usize { 20 }
fn default_fallback_window() -> usize { 10 }
fn default_max_conversations() -> usize { 10_000 }
fn default_template() -> PromptSource {
    PromptSource::Inline {
        inline: DEFAULT_SYSTEM_TEMPLATE.to_string(),
    }
}
