use std::path::Path;

use crate::config::schema::{Config, CONFIG_VERSION};
use crate::error::ConfigError;

const SCHEMA_JSON: &str = include_str!("../../../../schema/config-v1.json");

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let json_value: serde_json::Value = serde_json::from_str(content)?;

    validate_schema(&json_value)?;

    let config: Config = serde_json::from_value(json_value)?;

    validate_config(&config)?;

    Ok(config)
}

fn validate_schema(json_value: &serde_json::Value) -> Result<(), ConfigError> {
    let schema: serde_json::Value =
        serde_json::from_str(SCHEMA_JSON).map_err(|e| ConfigError::Validation {
            message: format!("Invalid embedded schema JSON: {}", e),
        })?;

    let validator = jsonschema::validator_for(&schema).map_err(|e| ConfigError::Validation {
        message: format!("Failed to compile JSON schema: {}", e),
    })?;

    let error_messages: Vec<String> = validator
        .iter_errors(json_value)
        .map(|e| e.to_string())
        .collect();
    if !error_messages.is_empty() {
        return Err(ConfigError::SchemaValidation {
            errors: error_messages.join("; "),
        });
    }

    Ok(())
}

/// Semantic checks the schema cannot express.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.version != CONFIG_VERSION {
        return Err(invalid(format!(
            "Unsupported config version: {}",
            config.version
        )));
    }

    let provider = &config.provider;
    if !provider.base_url.starts_with("http://") && !provider.base_url.starts_with("https://") {
        return Err(invalid(format!(
            "provider.base_url must be an http(s) URL, got '{}'",
            provider.base_url
        )));
    }
    if provider.transcription_model.trim().is_empty() {
        return Err(invalid("provider.transcription_model must not be empty"));
    }
    if provider.scoring_model.trim().is_empty() {
        return Err(invalid("provider.scoring_model must not be empty"));
    }
    if provider.request_timeout_secs == 0 {
        return Err(invalid("provider.request_timeout_secs must be greater than 0"));
    }

    let pipeline = &config.pipeline;
    if pipeline.worker_count == 0 {
        return Err(invalid("pipeline.worker_count must be greater than 0"));
    }
    if pipeline.stage_timeout_secs == 0 {
        return Err(invalid("pipeline.stage_timeout_secs must be greater than 0"));
    }
    if pipeline.progress_capacity == 0 {
        return Err(invalid("pipeline.progress_capacity must be greater than 0"));
    }

    if config.questions.is_empty() {
        return Err(invalid("questions must contain at least one question"));
    }
    if let Some(index) = config.questions.iter().position(|q| q.trim().is_empty()) {
        return Err(invalid(format!("questions[{}] is empty", index)));
    }

    Ok(())
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        message: message.into(),
    }
}
