//! Job progress broadcaster for real-time job status streaming.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Lifecycle status of a job.
///
/// Transitions only move forward: `Pending -> Processing -> {Completed | Failed}`.
/// `Completed` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    /// Returns true for `Completed` and `Failed`.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Returns true if a job in this status may move to `next`.
    ///
    /// `Processing -> Processing` is allowed so stages can write their
    /// enrichment fields without changing the status. A job that never got
    /// picked up may still fail straight from `Pending`.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        use JobStatus::*;
        matches!(
            (self, next),
            (Pending, Processing)
                | (Pending, Failed)
                | (Processing, Processing)
                | (Processing, Completed)
                | (Processing, Failed)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Progress event for a job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobProgressEvent {
    /// Unique job identifier.
    pub job_id: String,
    /// Overall job status at the time of the event.
    pub status: JobStatus,
    /// Stage the event refers to, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    /// Human-readable message describing current activity.
    pub message: String,
    /// Error message (set on failure).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Timestamp of this event.
    pub timestamp: DateTime<Utc>,
}

impl JobProgressEvent {
    /// Creates a new progress event.
    pub fn new(job_id: &str, status: JobStatus, message: &str) -> Self {
        Self {
            job_id: job_id.to_string(),
            status,
            stage: None,
            message: message.to_string(),
            error: None,
            timestamp: Utc::now(),
        }
    }

    /// Creates an event for a stage of a processing job.
    pub fn stage(job_id: &str, stage: &str, message: &str) -> Self {
        let mut event = Self::new(job_id, JobStatus::Processing, message);
        event.stage = Some(stage.to_string());
        event
    }

    /// Creates a completion event.
    pub fn completed(job_id: &str) -> Self {
        Self::new(job_id, JobStatus::Completed, "Processing completed successfully")
    }

    /// Creates a failure event.
    pub fn failed(job_id: &str, stage: Option<&str>, error: &str) -> Self {
        let mut event = Self::new(job_id, JobStatus::Failed, "Processing failed");
        event.stage = stage.map(|s| s.to_string());
        event.error = Some(error.to_string());
        event
    }
}

/// Broadcasts job progress events for streaming.
#[derive(Clone)]
pub struct JobProgressBroadcaster {
    sender: Arc<broadcast::Sender<JobProgressEvent>>,
}

impl JobProgressBroadcaster {
    /// Creates a new job progress broadcaster with the specified channel capacity.
    ///
    /// A capacity of 0 is treated as 1.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Sends a progress event to all subscribers.
    pub fn send(&self, event: JobProgressEvent) {
        // No active receivers is fine
        let _ = self.sender.send(event);
    }

    /// Creates a new subscriber for progress events.
    pub fn subscribe(&self) -> broadcast::Receiver<JobProgressEvent> {
        self.sender.subscribe()
    }

    /// Announces a job as queued.
    pub fn queued(&self, job_id: &str) {
        self.send(JobProgressEvent::new(
            job_id,
            JobStatus::Pending,
            "Job queued for processing",
        ));
    }

    /// Gets the inner sender for creating trackers.
    pub fn sender(&self) -> Arc<broadcast::Sender<JobProgressEvent>> {
        Arc::clone(&self.sender)
    }
}

impl Default for JobProgressBroadcaster {
    fn default() -> Self {
        Self::new(100)
    }
}

/// Tracks progress for a single job.
pub struct JobProgressTracker {
    job_id: String,
    sender: Arc<broadcast::Sender<JobProgressEvent>>,
}

impl JobProgressTracker {
    pub fn new(job_id: &str, sender: Arc<broadcast::Sender<JobProgressEvent>>) -> Self {
        Self {
            job_id: job_id.to_string(),
            sender,
        }
    }

    fn send(&self, event: JobProgressEvent) {
        let _ = self.sender.send(event);
    }

    /// Announces that the job left the queue.
    pub fn processing(&self) {
        self.send(JobProgressEvent::new(
            &self.job_id,
            JobStatus::Processing,
            "Processing started",
        ));
    }

    /// Announces a stage with a message.
    pub fn stage(&self, stage: &str, message: &str) {
        self.send(JobProgressEvent::stage(&self.job_id, stage, message));
    }

    /// Marks the job as completed.
    pub fn completed(&self) {
        self.send(JobProgressEvent::completed(&self.job_id));
    }

    /// Marks the job as failed with an error message.
    pub fn failed(&self, stage: Option<&str>, error: &str) {
        self.send(JobProgressEvent::failed(&self.job_id, stage, error));
    }
}
