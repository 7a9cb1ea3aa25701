use std::sync::Arc;

use tokio::sync::broadcast;

use crate::broadcast::job_progress::{JobProgressEvent, JobProgressTracker};

/// Events emitted by the pipeline during processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    Started,
    Stage { stage: String, message: String },
    Completed,
    Failed { stage: Option<String>, error: String },
}

pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

/// No-op reporter for unit tests.
pub struct NoopProgress;

impl ProgressReporter for NoopProgress {
    fn report(&self, _event: ProgressEvent) {}
}

/// Bridges pipeline events to the broadcast channel.
pub struct BroadcastProgress {
    tracker: JobProgressTracker,
}

impl BroadcastProgress {
    pub fn new(job_id: &str, sender: Arc<broadcast::Sender<JobProgressEvent>>) -> Self {
        Self {
            tracker: JobProgressTracker::new(job_id, sender),
        }
    }
}

impl ProgressReporter for BroadcastProgress {
    fn report(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::Started => self.tracker.processing(),
            ProgressEvent::Stage { stage, message } => self.tracker.stage(&stage, &message),
            ProgressEvent::Completed => self.tracker.completed(),
            ProgressEvent::Failed { stage, error } => {
                self.tracker.failed(stage.as_deref(), &error)
            }
        }
    }
}
