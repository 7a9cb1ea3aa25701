pub mod job;
pub mod pool;

pub use job::{Evaluation, Job, JobResult};
pub use pool::WorkerPool;
