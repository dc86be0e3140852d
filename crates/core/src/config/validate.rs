use super::{types::Config, ConfigError};
use crate::matcher::LlmProvider;

/// Validate configuration
/// Currently validates:
/// - Threshold is within [0, 1]
/// - Naming pattern parses and contains `{ext}`
/// - An `[llm]` section exists when mode is `ai`, with a model and credentials
/// - Custom numbering idioms compile
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let threshold = config.matching.threshold;
    if !threshold.is_finite() || !(0.0..=1.0).contains(&threshold) {
        return Err(ConfigError::ValidationError(format!(
            "matching.threshold must be between 0 and 1, got {}",
            threshold
        )));
    }

    config
        .naming_pattern()
        .map_err(|e| ConfigError::ValidationError(format!("matching.naming_pattern: {}", e)))?;

    if config.matching.mode.requires_llm() && config.llm.is_none() {
        return Err(ConfigError::ValidationError(
            "matching.mode = \"ai\" requires an [llm] section".to_string(),
        ));
    }

    if let Some(llm) = &config.llm {
        if llm.model.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "llm.model cannot be empty".to_string(),
            ));
        }
        if llm.provider != LlmProvider::Ollama && llm.api_key.is_none() && llm.api_base.is_none()
        {
            return Err(ConfigError::ValidationError(format!(
                "llm provider {} needs api_key or api_base",
                llm.provider.as_str()
            )));
        }
        if llm.provider == LlmProvider::Custom && llm.api_base.is_none() {
            return Err(ConfigError::ValidationError(
                "llm provider custom needs api_base".to_string(),
            ));
        }
    }

    config
        .vocabulary
        .build()
        .map_err(|e| ConfigError::ValidationError(format!("vocabulary: {}", e)))?;

    if config.executor.buffer_size == 0 {
        return Err(ConfigError::ValidationError(
            "executor.buffer_size cannot be 0".to_string(),
        ));
    }

    Ok(())
}
