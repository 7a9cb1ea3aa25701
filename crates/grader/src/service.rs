//! The grader context: job store, pipeline workers and progress streaming
//! wired together once at process start.

use std::path::PathBuf;
use std::sync::Arc;

use log::{info, warn};
use serde::Serialize;
use tokio::sync::broadcast;

use crate::broadcast::{
    JobCounts, JobProgressBroadcaster, JobProgressEvent, JobStatus, JobStore, JobUpdate,
};
use crate::config::Config;
use crate::error::{Result, WorkerError};
use crate::pipeline::{Pipeline, PipelineConfig};
use crate::provider::{OpenAiClient, Scorer, Transcriber};
use crate::questions::QuestionSet;
use crate::sanitize;
use crate::secrets::resolve_api_key;
use crate::worker::job::Job;
use crate::worker::WorkerPool;

/// Immediate answer to a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionAck {
    pub id: String,
    pub status: JobStatus,
}

/// Accepts recordings and runs them through the enrichment pipeline in the
/// background.
///
/// Must be created inside a Tokio runtime. Call [`Grader::shutdown`] before
/// the runtime stops so queued jobs are not dropped.
pub struct Grader {
    store: Arc<JobStore>,
    pipeline: Arc<Pipeline>,
    pool: WorkerPool,
    broadcaster: JobProgressBroadcaster,
    questions: Arc<QuestionSet>,
}

impl Grader {
    /// Builds a grader backed by the configured OpenAI-compatible provider.
    pub fn from_config(config: &Config) -> Result<Self> {
        let api_key = resolve_api_key(&config.provider)?;
        let client = Arc::new(OpenAiClient::new(&config.provider, api_key)?);
        info!(
            "Using provider {} (transcription: {}, scoring: {})",
            config.provider.base_url,
            config.provider.transcription_model,
            config.provider.scoring_model
        );

        Ok(Self::with_capabilities(config, client.clone(), client))
    }

    /// Builds a grader around the given capabilities.
    pub fn with_capabilities(
        config: &Config,
        transcriber: Arc<dyn Transcriber>,
        scorer: Arc<dyn Scorer>,
    ) -> Self {
        let pipeline_config = PipelineConfig::from_config(config);
        let store = Arc::new(JobStore::new());
        let questions = Arc::new(config.question_set());
        let broadcaster = JobProgressBroadcaster::new(pipeline_config.progress_capacity);

        let pipeline = Pipeline::from_capabilities(
            Arc::clone(&store),
            &pipeline_config,
            transcriber,
            scorer,
            Arc::clone(&questions),
        );
        let pipeline = Arc::new(pipeline);
        let pool = WorkerPool::with_progress_sender(
            Arc::clone(&pipeline),
            pipeline_config.worker_count,
            Some(broadcaster.sender()),
        );

        Self {
            store,
            pipeline,
            pool,
            broadcaster,
            questions,
        }
    }

    /// Records a new `pending` job and queues it without waiting for it to run.
    pub fn submit(
        &self,
        media: impl Into<PathBuf>,
        question_index: usize,
        candidate_name: Option<String>,
    ) -> Result<SubmissionAck> {
        if self.pool.is_shutdown() {
            return Err(WorkerError::ChannelClosed.into());
        }

        let job = Job::new(media.into(), question_index, candidate_name);
        let media_name = sanitize::redact_path(&job.media_ref);
        let id = self.store.create(job)?;
        self.broadcaster.queued(&id);

        if let Err(e) = self.pool.submit(&id) {
            warn!("Job {} could not be queued: {}", id, e);
            if let Err(store_err) = self.store.update_status(
                &id,
                JobStatus::Failed,
                JobUpdate::error(e.to_string()),
            ) {
                warn!("Failed to mark job {} as failed: {}", id, store_err);
            }
            return Err(e.into());
        }

        info!(
            "Accepted job {} ({}, question {})",
            id, media_name, question_index
        );
        Ok(SubmissionAck {
            id,
            status: JobStatus::Pending,
        })
    }

    pub fn get(&self, job_id: &str) -> Option<Job> {
        self.store.get(job_id)
    }

    /// Like [`Grader::get`], but reports unknown ids as an error.
    pub fn require(&self, job_id: &str) -> Result<Job> {
        Ok(self.store.require(job_id)?)
    }

    /// All jobs in submission order.
    pub fn list(&self) -> Vec<Job> {
        self.store.list()
    }

    pub fn counts(&self) -> JobCounts {
        self.store.counts()
    }

    pub fn questions(&self) -> &QuestionSet {
        &self.questions
    }

    /// Subscribes to progress events for every job.
    pub fn subscribe(&self) -> broadcast::Receiver<JobProgressEvent> {
        self.broadcaster.subscribe()
    }

    pub fn store(&self) -> Arc<JobStore> {
        Arc::clone(&self.store)
    }

    /// Stops accepting submissions and waits for queued jobs to settle.
    pub async fn shutdown(&self) {
        self.pool.shutdown().await;
        let counts = self.counts();
        info!(
            "Grader stopped ({} completed, {} failed)",
            counts.completed, counts.failed
        );
    }

    /// Stops without draining: cancels the workers and fails every job that
    /// has not settled yet with `reason`.
    pub async fn abort(&self, reason: &str) {
        self.pool.abort().await;

        let abandoned = self
            .store
            .list()
            .iter()
            .filter(|job| self.pipeline.abandon(&job.id, reason))
            .count();
        warn!("Grader aborted, {} unsettled jobs marked failed", abandoned);
    }
}
