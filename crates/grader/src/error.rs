use std::path::PathBuf;
use thiserror::Error;

use crate::broadcast::job_progress::JobStatus;

#[derive(Error, Debug)]
pub enum GraderError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Job store error: {0}")]
    Store(#[from] StoreError),

    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),

    #[error("Provider error: {0}")]
    Provider(#[from] crate::provider::ProviderError),

    #[error("Secret error: {0}")]
    Secret(#[from] crate::secrets::SecretError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{}': {source}", .path.display())]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Schema validation failed: {errors}")]
    SchemaValidation { errors: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Unknown job: {0}")]
    UnknownJob(String),

    #[error("Job already exists: {0}")]
    DuplicateJob(String),

    #[error("Invalid status transition for job {job_id}: {from} -> {to}")]
    InvalidTransition {
        job_id: String,
        from: JobStatus,
        to: JobStatus,
    },

    #[error("Job {job_id} cannot complete without a {missing}")]
    Incomplete {
        job_id: String,
        missing: &'static str,
    },
}

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Worker pool is shut down, submission rejected")]
    ChannelClosed,

    #[error("Worker {worker_id} panicked")]
    Panicked { worker_id: usize },
}

pub type Result<T> = std::result::Result<T, GraderError>;
