//! Wire types for the chat endpoint and their validation.

use parlor_core::ConversationId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Longest prompt accepted, counted in characters after trimming.
pub const DEFAULT_MAX_PROMPT_CHARS: usize = 3500;

/// Body of `POST /api/chat`.
///
/// Fields are optional on the wire so a missing field is reported alongside
/// the other field errors instead of failing deserialization.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(rename = "conversationId", default)]
    pub conversation_id: Option<String>,
}

/// Body returned on success. The reply travels in `prompt`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub prompt: String,
}

/// A request that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedChat {
    pub prompt: String,
    pub conversation_id: ConversationId,
}

/// Validation messages keyed by wire field name.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: Vec<String> = self
            .0
            .iter()
            .map(|(field, messages)| format!("{}: {}", field, messages.join(", ")))
            .collect();
        write!(f, "{}", fields.join("; "))
    }
}

impl ChatRequest {
    /// Check every field and return all failures at once.
    ///
    /// The prompt is trimmed before its length is checked, and the trimmed
    /// text is what gets forwarded.
    pub fn validate(self, max_prompt_chars: usize) -> Result<ValidatedChat, FieldErrors> {
        let mut errors = FieldErrors::default();

        let prompt = match self.prompt.as_deref().map(str::trim) {
            None => {
                errors.add("prompt", "Required");
                None
            }
            Some("") => {
                errors.add("prompt", "Prompt cannot be empty");
                None
            }
            Some(p) if p.chars().count() > max_prompt_chars => {
                errors.add(
                    "prompt",
                    format!("Prompt is too long (max {} characters)", max_prompt_chars),
                );
                None
            }
            Some(p) => Some(p.to_string()),
        };

        let conversation_id = match self.conversation_id.as_deref() {
            None => {
                errors.add("conversationId", "Required");
                None
            }
            Some(raw) => match raw.parse::<ConversationId>() {
                Ok(id) => Some(id),
                Err(_) => {
                    errors.add("conversationId", "Invalid uuid");
                    None
                }
            },
        };

        match (prompt, conversation_id) {
            (Some(prompt), Some(conversation_id)) if errors.is_empty() => Ok(ValidatedChat {
                prompt,
                conversation_id,
            }),
            _ => Err(errors),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID: &str = "11111111-1111-1111-1111-111111111111";

    fn request(prompt: &str, id: &str) -> ChatRequest {
        ChatRequest {
            prompt: Some(prompt.to_string()),
            conversation_id: Some(id.to_string()),
        }
    }

    #[test]
    fn test_valid_request_is_trimmed() {
        let validated = request("  Hi there \n", ID).validate(DEFAULT_MAX_PROMPT_CHARS).unwrap();
        assert_eq!(validated.prompt, "Hi there");
        assert_eq!(validated.conversation_id.to_string(), ID);
    }

    #[test]
    fn test_blank_prompt_rejected() {
        let errors = request("   ", ID).validate(DEFAULT_MAX_PROMPT_CHARS).unwrap_err();
        assert_eq!(errors.get("prompt").unwrap(), ["Prompt cannot be empty"]);
        assert!(errors.get("conversationId").is_none());
    }

    #[test]
    fn test_prompt_length_limit_counts_characters() {
        let at_limit = "é".repeat(DEFAULT_MAX_PROMPT_CHARS);
        assert!(request(&at_limit, ID).validate(DEFAULT_MAX_PROMPT_CHARS).is_ok());

        let over = "a".repeat(DEFAULT_MAX_PROMPT_CHARS + 1);
        let errors = request(&over, ID).validate(DEFAULT_MAX_PROMPT_CHARS).unwrap_err();
        assert!(errors.get("prompt").unwrap()[0].contains("too long"));
    }

    #[test]
    fn test_invalid_and_missing_fields_reported_together() {
        let errors = ChatRequest {
            prompt: None,
            conversation_id: Some("not-a-uuid".to_string()),
        }
        .validate(DEFAULT_MAX_PROMPT_CHARS)
        .unwrap_err();

        assert_eq!(errors.get("prompt").unwrap(), ["Required"]);
        assert_eq!(errors.get("conversationId").unwrap(), ["Invalid uuid"]);
        assert_eq!(errors.to_string(), "conversationId: Invalid uuid; prompt: Required");
    }

    #[test]
    fn test_only_hyphenated_conversation_ids_accepted() {
        for raw in [
            "11111111111111111111111111111111",
            "{11111111-1111-1111-1111-111111111111}",
            "urn:uuid:11111111-1111-1111-1111-111111111111",
        ] {
            let errors = request("Hi", raw).validate(DEFAULT_MAX_PROMPT_CHARS).unwrap_err();
            assert_eq!(errors.get("conversationId").unwrap(), ["Invalid uuid"]);
        }
    }

    #[test]
    fn test_response_uses_prompt_field() {
        let body = serde_json::to_value(ChatResponse {
            prompt: "Hello!".to_string(),
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({"prompt": "Hello!"}));
    }
}
