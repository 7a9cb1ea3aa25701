use std::time::Duration;

use crate::config::Config;

/// Runtime settings for the pipeline and its worker pool.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub worker_count: usize,
    pub stage_timeout: Duration,
    pub progress_capacity: usize,
}

impl PipelineConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            worker_count: config.pipeline.worker_count,
            stage_timeout: Duration::from_secs(config.pipeline.stage_timeout_secs),
            progress_capacity: config.pipeline.progress_capacity,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}
