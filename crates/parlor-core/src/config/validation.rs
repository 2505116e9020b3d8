//! Sanity checks applied to a loaded configuration

use crate::config::types::RelayConfig;
use crate::errors::RelayError;

impl RelayConfig {
    /// Reject configurations the relay cannot run with.
    pub fn validate(&self) -> Result<(), RelayError> {
        if self.llm.model.trim().is_empty() {
            return Err(RelayError::ConfigError("llm.model must not be empty".to_string()));
        }
        if self.llm.summary_model.trim().is_empty() {
            return Err(RelayError::ConfigError(
                "llm.summary_model must not be empty".to_string(),
            ));
        }
        if self.llm.base_url.trim().is_empty() {
            return Err(RelayError::ConfigError("llm.base_url must not be empty".to_string()));
        }
        if !(0.0..=2.0).contains(&self.llm.parameters.temperature) {
            return Err(RelayError::ConfigError(format!(
                "llm.parameters.temperature must be between 0 and 2, got {}",
                self.llm.parameters.temperature
            )));
        }
        if self.llm.parameters.max_output_tokens == 0 {
            return Err(RelayError::ConfigError(
                "llm.parameters.max_output_tokens must be at least 1".to_string(),
            ));
        }
        if self.memory.summary_threshold == 0 {
            return Err(RelayError::ConfigError(
                "memory.summary_threshold must be at least 1".to_string(),
            ));
        }
        if self.memory.fallback_window == 0 {
            return Err(RelayError::ConfigError(
                "memory.fallback_window must be at least 1".to_string(),
            ));
        }
        if self.memory.max_conversations == 0 {
            return Err(RelayError::ConfigError(
                "memory.max_conversations must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(RelayConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_zero_threshold() {
        let mut config = RelayConfig::default();
        config.memory.summary_threshold = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("summary_threshold"));
    }

    #[test]
    fn test_rejects_out_of_range_temperature() {
        let mut config = RelayConfig::default();
        config.llm.parameters.temperature = 3.5;
        assert!(matches!(config.validate(), Err(RelayError::ConfigError(_))));
    }

    #[test]
    fn test_rejects_empty_model() {
        let mut config = RelayConfig::default();
        config.llm.model = "  ".to_string();
        assert!(config.validate().is_err());
    }
}
