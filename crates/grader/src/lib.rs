pub mod broadcast;
pub mod config;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod provider;
pub mod questions;
pub mod sanitize;
pub mod secrets;
pub mod service;
pub mod worker;

pub use broadcast::{JobCounts, JobProgressBroadcaster, JobProgressEvent, JobStatus, JobStore, JobUpdate};
pub use config::{load_config, Config};
pub use error::{ConfigError, GraderError, Result, StoreError, WorkerError};
pub use pipeline::{Pipeline, PipelineConfig, Stage, StageError};
pub use provider::{OpenAiClient, ProviderError, Scorer, Transcriber};
pub use questions::QuestionSet;
pub use secrets::{resolve_secret, SecretError};
pub use service::{Grader, SubmissionAck};
pub use worker::{Evaluation, Job, JobResult, WorkerPool};
