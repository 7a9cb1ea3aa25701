//! In-memory job store, the system of record for every submitted recording.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use serde::Serialize;

use crate::broadcast::job_progress::JobStatus;
use crate::error::StoreError;
use crate::worker::job::{Evaluation, Job};

// ─── JobUpdate ──────────────────────────────────────────────────────────────

/// Fields merged into a job together with a status change.
///
/// `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default)]
pub struct JobUpdate {
    pub transcript: Option<String>,
    pub evaluation: Option<Evaluation>,
    pub error: Option<String>,
}

impl JobUpdate {
    pub fn transcript(text: impl Into<String>) -> Self {
        Self {
            transcript: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn evaluation(evaluation: Evaluation) -> Self {
        Self {
            evaluation: Some(evaluation),
            ..Default::default()
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Default::default()
        }
    }

    fn apply(self, job: &mut Job) {
        if let Some(transcript) = self.transcript {
            job.transcript = Some(transcript);
        }
        if let Some(evaluation) = self.evaluation {
            job.evaluation = Some(evaluation);
        }
        if let Some(error) = self.error {
            job.error = Some(error);
        }
    }
}

/// Number of jobs per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct JobCounts {
    pub pending: usize,
    pub processing: usize,
    pub completed: usize,
    pub failed: usize,
}

// ─── JobStore ───────────────────────────────────────────────────────────────

#[derive(Default)]
struct Inner {
    jobs: HashMap<String, Job>,
    /// Job ids in insertion order.
    order: Vec<String>,
}

/// Job store holding one record per submission for the process lifetime.
///
/// A single `RwLock` guards the records. Every update is a read-modify-write
/// under the write lock, so two concurrent updates of the same job can never
/// lose each other's fields.
#[derive(Default)]
pub struct JobStore {
    inner: RwLock<Inner>,
}

impl JobStore {
    /// Creates an empty job store.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        match self.inner.read() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Job store lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        match self.inner.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Job store lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    /// Inserts a new job and returns its id.
    pub fn create(&self, job: Job) -> Result<String, StoreError> {
        let mut inner = self.write();
        if inner.jobs.contains_key(&job.id) {
            return Err(StoreError::DuplicateJob(job.id));
        }

        let id = job.id.clone();
        log::debug!("Created job {} (question {})", id, job.question_index);
        inner.order.push(id.clone());
        inner.jobs.insert(id.clone(), job);
        Ok(id)
    }

    /// Returns a snapshot of a job, or `None` if the id is unknown.
    pub fn get(&self, job_id: &str) -> Option<Job> {
        self.read().jobs.get(job_id).cloned()
    }

    /// Like [`JobStore::get`], but reports unknown ids as an error.
    pub fn require(&self, job_id: &str) -> Result<Job, StoreError> {
        self.get(job_id)
            .ok_or_else(|| StoreError::UnknownJob(job_id.to_string()))
    }

    /// Returns all jobs in insertion order.
    pub fn list(&self) -> Vec<Job> {
        let inner = self.read();
        inner
            .order
            .iter()
            .filter_map(|id| inner.jobs.get(id).cloned())
            .collect()
    }

    /// Atomically sets the status of a job and merges the given fields.
    ///
    /// Rejects transitions out of terminal states and completion without
    /// both a transcript and an evaluation; the record is left untouched in
    /// that case. Returns the updated snapshot.
    pub fn update_status(
        &self,
        job_id: &str,
        status: JobStatus,
        update: JobUpdate,
    ) -> Result<Job, StoreError> {
        let mut inner = self.write();
        let job = inner
            .jobs
            .get_mut(job_id)
            .ok_or_else(|| StoreError::UnknownJob(job_id.to_string()))?;

        if !job.status.can_transition_to(status) {
            return Err(StoreError::InvalidTransition {
                job_id: job_id.to_string(),
                from: job.status,
                to: status,
            });
        }

        if status == JobStatus::Completed {
            if job.transcript.is_none() && update.transcript.is_none() {
                return Err(StoreError::Incomplete {
                    job_id: job_id.to_string(),
                    missing: "transcript",
                });
            }
            if job.evaluation.is_none() && update.evaluation.is_none() {
                return Err(StoreError::Incomplete {
                    job_id: job_id.to_string(),
                    missing: "evaluation",
                });
            }
        }

        if job.status != status {
            log::debug!("Job {}: {} -> {}", job_id, job.status, status);
        }
        update.apply(job);
        job.status = status;
        job.updated_at = Utc::now();

        Ok(job.clone())
    }

    /// Returns the count of jobs by status.
    pub fn counts(&self) -> JobCounts {
        let inner = self.read();
        let mut counts = JobCounts::default();
        for job in inner.jobs.values() {
            match job.status {
                JobStatus::Pending => counts.pending += 1,
                JobStatus::Processing => counts.processing += 1,
                JobStatus::Completed => counts.completed += 1,
                JobStatus::Failed => counts.failed += 1,
            }
        }
        counts
    }

    pub fn len(&self) -> usize {
        self.read().jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
