use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use log::debug;

use crate::broadcast::{JobStatus, JobStore, JobUpdate};
use crate::provider::Transcriber;
use crate::sanitize;
use crate::worker::job::{detect_mime_type, Job};

use super::error::StageError;
use super::stage::Stage;

pub const TRANSCRIPTION_STAGE: &str = "transcription";

/// Turns the job's media into a transcript.
pub struct TranscriptionStage {
    transcriber: Arc<dyn Transcriber>,
}

impl TranscriptionStage {
    pub fn new(transcriber: Arc<dyn Transcriber>) -> Self {
        Self { transcriber }
    }
}

/// Checks the media is an existing regular file with an audio or video type.
async fn check_media(path: &Path) -> Result<(), StageError> {
    let metadata = tokio::fs::metadata(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            StageError::MediaNotFound(path.to_path_buf())
        } else {
            StageError::UnsupportedMedia {
                path: path.to_path_buf(),
                reason: format!("unreadable: {}", e),
            }
        }
    })?;

    if !metadata.is_file() {
        return Err(StageError::UnsupportedMedia {
            path: path.to_path_buf(),
            reason: "not a regular file".to_string(),
        });
    }

    match detect_mime_type(path) {
        Some(mime) if mime.starts_with("audio/") || mime.starts_with("video/") => Ok(()),
        Some(mime) => Err(StageError::UnsupportedMedia {
            path: path.to_path_buf(),
            reason: format!("'{}' is not an audio or video type", mime),
        }),
        None => Err(StageError::UnsupportedMedia {
            path: path.to_path_buf(),
            reason: "unknown media type".to_string(),
        }),
    }
}

#[async_trait]
impl Stage for TranscriptionStage {
    fn name(&self) -> &str {
        TRANSCRIPTION_STAGE
    }

    async fn process(&self, job: &Job, store: &JobStore) -> Result<(), StageError> {
        check_media(&job.media_ref).await?;

        let transcript = self.transcriber.transcribe(&job.media_ref).await?;
        debug!(
            "Transcribed {} for job {} ({} chars)",
            sanitize::redact_path(&job.media_ref),
            job.id,
            transcript.len()
        );

        store.update_status(
            &job.id,
            JobStatus::Processing,
            JobUpdate::transcript(transcript),
        )?;
        Ok(())
    }
}
