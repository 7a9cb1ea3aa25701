use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::broadcast::job_progress::JobStatus;

/// Name recorded when a submission carries no candidate name.
pub const DEFAULT_CANDIDATE_NAME: &str = "Anonymous";

/// Lowest accepted sub-score.
pub const MIN_SCORE: u8 = 1;
/// Highest accepted sub-score.
pub const MAX_SCORE: u8 = 5;

/// Structured scoring result for one answer.
///
/// Field names follow the scoring capability's JSON shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evaluation {
    pub relevance: u8,
    pub clarity: u8,
    pub depth: u8,
    pub communication: u8,
    pub overall_score: u8,
    pub justification: String,
}

impl Evaluation {
    /// Checks every score lies in `[MIN_SCORE, MAX_SCORE]` and a justification is present.
    ///
    /// Returns a description of the first violation.
    pub fn validate(&self) -> Result<(), String> {
        let scores = [
            ("relevance", self.relevance),
            ("clarity", self.clarity),
            ("depth", self.depth),
            ("communication", self.communication),
            ("overall_score", self.overall_score),
        ];
        for (name, value) in scores {
            if !(MIN_SCORE..=MAX_SCORE).contains(&value) {
                return Err(format!(
                    "{} = {} is outside {}..={}",
                    name, value, MIN_SCORE, MAX_SCORE
                ));
            }
        }
        if self.justification.trim().is_empty() {
            return Err("justification is empty".to_string());
        }
        Ok(())
    }
}

/// One submitted recording and its enrichment state.
///
/// Values handed out by the store are snapshots; the store keeps the only
/// authoritative copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: String,
    pub question_index: usize,
    pub candidate_name: String,
    /// Location of the stored media payload.
    pub media_ref: PathBuf,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evaluation: Option<Evaluation>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Failure reason, set when the job ends up `failed`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Job {
    /// Creates a new `pending` job with a fresh identifier.
    ///
    /// Blank or missing candidate names fall back to [`DEFAULT_CANDIDATE_NAME`].
    pub fn new(media_ref: PathBuf, question_index: usize, candidate_name: Option<String>) -> Self {
        let candidate_name = candidate_name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| DEFAULT_CANDIDATE_NAME.to_string());
        let now = Utc::now();

        Self {
            id: uuid::Uuid::new_v4().to_string(),
            question_index,
            candidate_name,
            media_ref,
            status: JobStatus::Pending,
            transcript: None,
            evaluation: None,
            created_at: now,
            updated_at: now,
            error: None,
        }
    }

    /// Guesses the media MIME type from the file extension.
    pub fn media_type(&self) -> Option<String> {
        detect_mime_type(&self.media_ref)
    }

    /// Returns true if this job is finished (completed or failed).
    pub fn is_finished(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Detects MIME type from file path using the mime_guess crate.
/// Returns `None` for unknown extensions.
pub fn detect_mime_type(path: &Path) -> Option<String> {
    mime_guess::from_path(path).first().map(|m| m.to_string())
}

/// Final outcome of one pipeline run, reported back to the worker that ran it.
#[derive(Debug, Clone)]
pub struct JobResult {
    pub job_id: String,
    pub status: JobStatus,
    /// Name of the stage that failed, if any.
    pub failed_stage: Option<String>,
    pub error: Option<String>,
}

impl JobResult {
    pub fn success(job_id: &str) -> Self {
        Self {
            job_id: job_id.to_string(),
            status: JobStatus::Completed,
            failed_stage: None,
            error: None,
        }
    }

    pub fn failure(job_id: &str, stage: Option<&str>, error: String) -> Self {
        Self {
            job_id: job_id.to_string(),
            status: JobStatus::Failed,
            failed_stage: stage.map(|s| s.to_string()),
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == JobStatus::Completed
    }
}
