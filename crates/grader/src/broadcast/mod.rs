//! Job state tracking: the job store and real-time progress broadcasting.
//!
//! The store is the system of record queried by status surfaces; the
//! broadcaster streams status changes to any number of subscribers.

pub mod job_progress;
pub mod job_store;

pub use job_progress::{JobProgressBroadcaster, JobProgressEvent, JobProgressTracker, JobStatus};
pub use job_store::{JobCounts, JobStore, JobUpdate};
