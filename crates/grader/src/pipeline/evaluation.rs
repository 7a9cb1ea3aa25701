use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, warn};

use crate::broadcast::{JobStatus, JobStore, JobUpdate};
use crate::provider::Scorer;
use crate::questions::QuestionSet;
use crate::worker::job::Job;

use super::error::StageError;
use super::stage::Stage;

pub const EVALUATION_STAGE: &str = "evaluation";

/// Scores the transcript against the question the candidate answered.
pub struct EvaluationStage {
    scorer: Arc<dyn Scorer>,
    questions: Arc<QuestionSet>,
}

impl EvaluationStage {
    pub fn new(scorer: Arc<dyn Scorer>, questions: Arc<QuestionSet>) -> Self {
        Self { scorer, questions }
    }
}

#[async_trait]
impl Stage for EvaluationStage {
    fn name(&self) -> &str {
        EVALUATION_STAGE
    }

    async fn process(&self, job: &Job, store: &JobStore) -> Result<(), StageError> {
        if !self.questions.contains(job.question_index) {
            warn!(
                "Job {} references unknown question index {}",
                job.id, job.question_index
            );
        }
        let question = self.questions.text(job.question_index);

        let transcript = match job.transcript.as_deref() {
            Some(text) => text,
            None => {
                warn!("Job {} has no transcript, scoring an empty answer", job.id);
                ""
            }
        };

        let evaluation = self.scorer.score(question, transcript).await?;
        evaluation
            .validate()
            .map_err(StageError::MalformedResponse)?;
        debug!(
            "Job {} scored {}/5 overall",
            job.id, evaluation.overall_score
        );

        store.update_status(
            &job.id,
            JobStatus::Processing,
            JobUpdate::evaluation(evaluation),
        )?;
        Ok(())
    }
}
