use async_trait::async_trait;

use crate::broadcast::JobStore;
use crate::worker::job::Job;

use super::error::StageError;

/// A named unit of enrichment work.
///
/// `job` is a read-only snapshot; a stage persists its output through
/// [`JobStore::update_status`] and never touches the job's final status.
#[async_trait]
pub trait Stage: Send + Sync {
    fn name(&self) -> &str;

    async fn process(&self, job: &Job, store: &JobStore) -> Result<(), StageError>;
}
