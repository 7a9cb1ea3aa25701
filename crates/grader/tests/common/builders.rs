//! Builder patterns for creating test data programmatically.

#![allow(dead_code)]

use grader::config::Config;
use grader::Evaluation;

/// Builder for creating `Config` instances.
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder with small, fast settings for testing.
    pub fn new() -> Self {
        let mut config = Config::default();
        config.pipeline.worker_count = 2;
        config.pipeline.stage_timeout_secs = 5;
        config.provider.api_key = Some("sk-test".to_string());
        Self { config }
    }

    pub fn version(mut self, version: &str) -> Self {
        self.config.version = version.to_string();
        self
    }

    pub fn worker_count(mut self, count: usize) -> Self {
        self.config.pipeline.worker_count = count;
        self
    }

    pub fn stage_timeout_secs(mut self, secs: u64) -> Self {
        self.config.pipeline.stage_timeout_secs = secs;
        self
    }

    pub fn questions(mut self, questions: &[&str]) -> Self {
        self.config.questions = questions.iter().map(|q| q.to_string()).collect();
        self
    }

    pub fn base_url(mut self, url: &str) -> Self {
        self.config.provider.base_url = url.to_string();
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for creating `Evaluation` instances.
pub struct EvaluationBuilder {
    evaluation: Evaluation,
}

impl EvaluationBuilder {
    pub fn new() -> Self {
        Self {
            evaluation: Evaluation {
                relevance: 4,
                clarity: 4,
                depth: 3,
                communication: 5,
                overall_score: 4,
                justification: "Clear and relevant, could go deeper.".to_string(),
            },
        }
    }

    /// Sets every sub-score, overall included, to `score`.
    pub fn all_scores(mut self, score: u8) -> Self {
        self.evaluation.relevance = score;
        self.evaluation.clarity = score;
        self.evaluation.depth = score;
        self.evaluation.communication = score;
        self.evaluation.overall_score = score;
        self
    }

    pub fn overall(mut self, score: u8) -> Self {
        self.evaluation.overall_score = score;
        self
    }

    pub fn justification(mut self, text: &str) -> Self {
        self.evaluation.justification = text.to_string();
        self
    }

    pub fn build(self) -> Evaluation {
        self.evaluation
    }
}

impl Default for EvaluationBuilder {
    fn default() -> Self {
        Self::new()
    }
}
