use serde::{Deserialize, Serialize};

use crate::questions::{QuestionSet, DEFAULT_QUESTIONS};

/// The only config version this build understands.
pub const CONFIG_VERSION: &str = "1.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub pipeline: PipelineSettings,
    #[serde(default = "default_questions")]
    pub questions: Vec<String>,
}

fn default_version() -> String {
    CONFIG_VERSION.to_string()
}

fn default_questions() -> Vec<String> {
    DEFAULT_QUESTIONS.iter().map(|q| q.to_string()).collect()
}

impl Config {
    pub fn question_set(&self) -> QuestionSet {
        QuestionSet::new(self.questions.clone())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            provider: ProviderConfig::default(),
            pipeline: PipelineSettings::default(),
            questions: default_questions(),
        }
    }
}

/// Connection details for the OpenAI-compatible transcription/scoring API.
///
/// The API key is resolved in order from `api_key`, `api_key_file`, then
/// `api_key_env_var`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub api_key_file: Option<String>,
    #[serde(default = "default_api_key_env_var")]
    pub api_key_env_var: Option<String>,
    #[serde(default = "default_transcription_model")]
    pub transcription_model: String,
    #[serde(default = "default_scoring_model")]
    pub scoring_model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_api_key_env_var() -> Option<String> {
    Some("OPENAI_API_KEY".to_string())
}

fn default_transcription_model() -> String {
    "whisper-1".to_string()
}

fn default_scoring_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_temperature() -> f32 {
    0.3
}

fn default_request_timeout_secs() -> u64 {
    90
}

fn default_connect_timeout_secs() -> u64 {
    10
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            api_key_file: None,
            api_key_env_var: default_api_key_env_var(),
            transcription_model: default_transcription_model(),
            scoring_model: default_scoring_model(),
            temperature: default_temperature(),
            request_timeout_secs: default_request_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSettings {
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
    /// Upper bound for a single stage, capability call included.
    #[serde(default = "default_stage_timeout_secs")]
    pub stage_timeout_secs: u64,
    #[serde(default = "default_progress_capacity")]
    pub progress_capacity: usize,
}

fn default_worker_count() -> usize {
    num_cpus::get()
}

fn default_stage_timeout_secs() -> u64 {
    120
}

fn default_progress_capacity() -> usize {
    100
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            worker_count: default_worker_count(),
            stage_timeout_secs: default_stage_timeout_secs(),
            progress_capacity: default_progress_capacity(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_object_uses_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.version, CONFIG_VERSION);
        assert_eq!(config.provider.transcription_model, "whisper-1");
        assert_eq!(config.provider.scoring_model, "gpt-4o-mini");
        assert_eq!(config.provider.api_key_env_var.as_deref(), Some("OPENAI_API_KEY"));
        assert_eq!(config.pipeline.stage_timeout_secs, 120);
        assert!(config.pipeline.worker_count > 0);
        assert_eq!(config.questions.len(), DEFAULT_QUESTIONS.len());
    }

    #[test]
    fn test_partial_sections() {
        let config: Config = serde_json::from_str(
            r#"{ "provider": { "base_url": "http://localhost:8080/v1" }, "pipeline": { "worker_count": 2 } }"#,
        )
        .unwrap();
        assert_eq!(config.provider.base_url, "http://localhost:8080/v1");
        assert_eq!(config.provider.scoring_model, "gpt-4o-mini");
        assert_eq!(config.pipeline.worker_count, 2);
        assert_eq!(config.pipeline.progress_capacity, 100);
    }

    #[test]
    fn test_question_set() {
        let config = Config {
            questions: vec!["Only question".to_string()],
            ..Config::default()
        };
        assert_eq!(config.question_set().text(0), "Only question");
    }
}
