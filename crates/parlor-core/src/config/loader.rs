//! Configuration loader for YAML files and environment resolution
//!
//! This module handles loading configuration from YAML files, reading the
//! system-instruction template and reference data from disk, and resolving the
//! model credential from the environment.

use crate::config::types::*;
use crate::errors::RelayError;
use std::env;
use std::path::Path;
use tokio::fs;

/// Configuration loader with environment resolution
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a file, or fall back to defaults resolved
    /// against the current directory when no path is given.
    pub async fn load(path: Option<&Path>) -> Result<RelayConfig, RelayError> {
        match path {
            Some(path) => Self::from_file(path).await,
            None => {
                log::info!("No configuration file given, using defaults");
                let mut config = RelayConfig::default();
                Self::resolve_prompt(&mut config, Path::new(".")).await?;
                config.validate()?;
                Ok(config)
            }
        }
    }

    /// Load configuration from a YAML file
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<RelayConfig, RelayError> {
        let path = path.as_ref();

        let content = fs::read_to_string(path).await.map_err(|e| {
            RelayError::ConfigError(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_str(&content, base_dir).await
    }

    /// Load configuration from a YAML string. Prompt files are resolved
    /// relative to `base_dir`.
    pub async fn from_str(content: &str, base_dir: &Path) -> Result<RelayConfig, RelayError> {
        let mut config: RelayConfig = if content.trim().is_empty() {
            RelayConfig::default()
        } else {
            serde_yaml::from_str(content)?
        };

        Self::resolve_prompt(&mut config, base_dir).await?;
        config.validate()?;

        Ok(config)
    }

    /// Assemble the system instruction once: read the template and the
    /// reference data, then splice the latter into the former.
    pub async fn resolve_prompt(config: &mut RelayConfig, base_dir: &Path) -> Result<(), RelayError> {
        let template = Self::read_source(&config.prompt.template, base_dir).await?;
        let reference_data = match &config.prompt.reference_data {
            Some(source) => Self::read_source(source, base_dir).await?,
            None => String::new(),
        };

        if !template.contains(REFERENCE_DATA_PLACEHOLDER) && !reference_data.is_empty() {
            log::warn!(
                "Prompt template has no {} placeholder; reference data will not be included",
                REFERENCE_DATA_PLACEHOLDER
            );
        }

        config.prompt.assembled = Some(PromptConfig::render(&template, &reference_data));
        log::info!("System instruction assembled");
        Ok(())
    }

    async fn read_source(source: &PromptSource, base_dir: &Path) -> Result<String, RelayError> {
        match source {
            PromptSource::Inline { inline } => Ok(inline.clone()),
            PromptSource::File { file } => {
                let path = base_dir.join(file);
                log::info!("Loading prompt from file: {}", path.display());
                fs::read_to_string(&path).await.map_err(|e| {
                    RelayError::ConfigError(format!(
                        "Failed to read prompt file {}: {}",
                        path.display(),
                        e
                    ))
                })
            }
        }
    }

    /// Resolve the model API key. A missing key is fatal.
    pub fn resolve_api_key(auth: &LlmAuth) -> Result<String, RelayError> {
        if let Some(key) = &auth.api_key {
            if !key.trim().is_empty() {
                return Ok(key.clone());
            }
        }

        let env_var = auth.api_key_env.as_deref().unwrap_or(DEFAULT_API_KEY_ENV);
        match env::var(env_var) {
            Ok(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(RelayError::ConfigError(format!(
                "{} is not defined in environment variables",
                env_var
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    #[tokio::test]
    async fn test_empty_yaml_uses_defaults() {
        let config = ConfigLoader::from_str("", Path::new(".")).await.unwrap();
        assert_eq!(config.llm.model, "gemini-2.5-flash");
        assert_eq!(config.llm.summary_model, "gemini-2.5-pro");
        assert_eq!(config.memory.summary_threshold, 20);
        assert_eq!(config.memory.fallback_window, 10);
        assert_eq!(config.llm.parameters.max_output_tokens, 800);
        assert!((config.llm.parameters.temperature - 0.2).abs() < f32::EPSILON);
        assert_eq!(config.llm.safety_settings.len(), 4);
        assert!(config.prompt.assembled.is_some());
    }

    #[tokio::test]
    async fn test_partial_yaml_overrides() {
        let yaml = r#"
memory:
  summary_threshold: 6
  idle_ttl_secs: 3600
llm:
  parameters:
    temperature: 0.5
"#;
        let config = ConfigLoader::from_str(yaml, Path::new(".")).await.unwrap();
        assert_eq!(config.memory.summary_threshold, 6);
        assert_eq!(config.memory.fallback_window, 10);
        assert_eq!(config.memory.idle_ttl_secs, Some(3600));
        assert!((config.llm.parameters.temperature - 0.5).abs() < f32::EPSILON);
        assert_eq!(config.llm.parameters.max_output_tokens, 800);
    }

    #[tokio::test]
    async fn test_prompt_files_resolved_relative_to_config() {
        let dir = TempDir::new().unwrap();
        let prompts = dir.path().join("prompts");
        std::fs::create_dir(&prompts).unwrap();
        std::fs::write(
            prompts.join("chatbot.txt"),
            "You help customers.\n{{reference_data}}\nBe brief.",
        )
        .unwrap();
        std::fs::write(prompts.join("info.md"), "Open 9am to 5pm.").unwrap();

        let config_path = dir.path().join("parlor.yaml");
        std::fs::write(
            &config_path,
            "prompt:\n  template: { file: prompts/chatbot.txt }\n  reference_data: { file: prompts/info.md }\n",
        )
        .unwrap();

        let config = ConfigLoader::from_file(&config_path).await.unwrap();
        assert_eq!(
            config.prompt.assembled.as_deref(),
            Some("You help customers.\nOpen 9am to 5pm.\nBe brief.")
        );

        let options = config.chat_options().unwrap();
        assert!(options.system_instruction.contains("Open 9am to 5pm."));
        assert_eq!(options.max_output_tokens, 800);
    }

    #[tokio::test]
    async fn test_missing_prompt_file_is_config_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "prompt:\n  template: {{ file: does-not-exist.txt }}").unwrap();

        let err = ConfigLoader::from_file(file.path()).await.unwrap_err();
        assert!(matches!(err, RelayError::ConfigError(_)));
    }

    #[tokio::test]
    async fn test_invalid_yaml_is_config_error() {
        let err = ConfigLoader::from_str("memory: [unclosed", Path::new("."))
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::ConfigError(_)));
    }

    #[test]
    fn test_api_key_from_config_wins() {
        let auth = LlmAuth {
            api_key: Some("inline-key".to_string()),
            api_key_env: Some("PARLOR_TEST_UNSET_KEY".to_string()),
        };
        assert_eq!(ConfigLoader::resolve_api_key(&auth).unwrap(), "inline-key");
    }

    #[test]
    fn test_missing_api_key_is_fatal() {
        let auth = LlmAuth {
            api_key: None,
            api_key_env: Some("PARLOR_TEST_DEFINITELY_UNSET_KEY".to_string()),
        };
        let err = ConfigLoader::resolve_api_key(&auth).unwrap_err();
        assert!(err.to_string().contains("PARLOR_TEST_DEFINITELY_UNSET_KEY"));
    }
}
