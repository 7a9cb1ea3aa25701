use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use log::{error, info, warn};
use tracing::{info_span, Instrument};

use crate::broadcast::{JobStatus, JobStore, JobUpdate};
use crate::provider::{Scorer, Transcriber};
use crate::questions::QuestionSet;
use crate::sanitize;
use crate::worker::job::JobResult;

use super::config::PipelineConfig;
use super::error::StageError;
use super::evaluation::EvaluationStage;
use super::progress::{ProgressEvent, ProgressReporter};
use super::stage::Stage;
use super::transcription::TranscriptionStage;

/// Ordered list of stages run against one job at a time.
///
/// The pipeline owns every status change of a job after intake: it marks
/// the job `processing`, runs the stages in registration order and settles
/// it as `completed` or `failed`.
pub struct Pipeline {
    store: Arc<JobStore>,
    stages: Vec<Arc<dyn Stage>>,
    stage_timeout: Duration,
}

impl Pipeline {
    /// Creates a pipeline without stages.
    pub fn new(store: Arc<JobStore>, stage_timeout: Duration) -> Self {
        Self {
            store,
            stages: Vec::new(),
            stage_timeout,
        }
    }

    /// Production constructor: transcription followed by evaluation.
    pub fn from_capabilities(
        store: Arc<JobStore>,
        config: &PipelineConfig,
        transcriber: Arc<dyn Transcriber>,
        scorer: Arc<dyn Scorer>,
        questions: Arc<QuestionSet>,
    ) -> Self {
        let mut pipeline = Self::new(store, config.stage_timeout);
        pipeline.register(Arc::new(TranscriptionStage::new(transcriber)));
        pipeline.register(Arc::new(EvaluationStage::new(scorer, questions)));
        pipeline
    }

    /// Appends a stage; stages run in the order they were registered.
    pub fn register(&mut self, stage: Arc<dyn Stage>) {
        self.stages.push(stage);
    }

    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Runs every stage for `job_id` and settles the job's final status.
    ///
    /// Never returns an error: failures end up in the store and in the
    /// returned [`JobResult`].
    pub async fn run(&self, job_id: &str, progress: &dyn ProgressReporter) -> JobResult {
        let job = match self
            .store
            .update_status(job_id, JobStatus::Processing, JobUpdate::default())
        {
            Ok(job) => job,
            Err(e) => {
                error!("Cannot start job {}: {}", job_id, e);
                return JobResult::failure(job_id, None, e.to_string());
            }
        };
        progress.report(ProgressEvent::Started);

        let span = info_span!("pipeline",
            job_id = %job_id,
            media = %sanitize::redact_path(&job.media_ref),
            question_index = job.question_index,
        );

        async {
            for stage in &self.stages {
                let name = stage.name().to_string();
                if let Err(e) = self.run_stage(job_id, stage.as_ref(), progress).await {
                    return self.fail(job_id, &name, e, progress);
                }
            }
            self.complete(job_id, progress)
        }
        .instrument(span)
        .await
    }

    async fn run_stage(
        &self,
        job_id: &str,
        stage: &dyn Stage,
        progress: &dyn ProgressReporter,
    ) -> Result<(), StageError> {
        // Fresh snapshot so each stage sees the previous stages' output
        let snapshot = self.store.require(job_id)?;

        info!("Running {} for job {}", stage.name(), job_id);
        progress.report(ProgressEvent::Stage {
            stage: stage.name().to_string(),
            message: format!("Running {}", stage.name()),
        });

        let step = info_span!("stage", name = %stage.name());
        let guarded = AssertUnwindSafe(stage.process(&snapshot, &self.store)).catch_unwind();
        match tokio::time::timeout(self.stage_timeout, guarded)
            .instrument(step)
            .await
        {
            Ok(Ok(result)) => result,
            Ok(Err(payload)) => Err(StageError::Panicked(panic_message(payload.as_ref()))),
            Err(_) => Err(StageError::Timeout(self.stage_timeout)),
        }
    }

    /// Fails a job that was left unsettled, e.g. after its worker was
    /// cancelled. Terminal jobs are left untouched.
    ///
    /// Returns true when the job was moved to `failed`.
    pub fn abandon(&self, job_id: &str, reason: &str) -> bool {
        match self.store.get(job_id) {
            Some(job) if !job.is_finished() => {
                match self
                    .store
                    .update_status(job_id, JobStatus::Failed, JobUpdate::error(reason))
                {
                    Ok(_) => {
                        warn!("Job {} abandoned: {}", job_id, reason);
                        true
                    }
                    Err(e) => {
                        warn!("Failed to mark job {} as failed: {}", job_id, e);
                        false
                    }
                }
            }
            _ => false,
        }
    }

    fn complete(&self, job_id: &str, progress: &dyn ProgressReporter) -> JobResult {
        match self
            .store
            .update_status(job_id, JobStatus::Completed, JobUpdate::default())
        {
            Ok(_) => {
                info!("Job {} completed", job_id);
                progress.report(ProgressEvent::Completed);
                JobResult::success(job_id)
            }
            Err(e) => {
                let message = e.to_string();
                error!("Job {} could not complete: {}", job_id, message);
                if let Err(e) = self.store.update_status(
                    job_id,
                    JobStatus::Failed,
                    JobUpdate::error(message.clone()),
                ) {
                    warn!("Failed to mark job {} as failed: {}", job_id, e);
                }
                progress.report(ProgressEvent::Failed {
                    stage: None,
                    error: message.clone(),
                });
                JobResult::failure(job_id, None, message)
            }
        }
    }

    fn fail(
        &self,
        job_id: &str,
        stage: &str,
        err: StageError,
        progress: &dyn ProgressReporter,
    ) -> JobResult {
        let message = format!("{}: {}", stage, err);
        error!(
            "Job {} failed in stage {}: {} (transient: {})",
            job_id,
            stage,
            err,
            err.is_transient()
        );

        if let Err(e) = self.store.update_status(
            job_id,
            JobStatus::Failed,
            JobUpdate::error(message.clone()),
        ) {
            warn!("Failed to mark job {} as failed: {}", job_id, e);
        }

        progress.report(ProgressEvent::Failed {
            stage: Some(stage.to_string()),
            error: message.clone(),
        });
        JobResult::failure(job_id, Some(stage), message)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
