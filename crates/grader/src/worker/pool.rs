use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use futures_util::future::join_all;
use futures_util::FutureExt;
use log::{debug, error, info, warn};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use crate::broadcast::job_progress::JobProgressEvent;
use crate::error::WorkerError;
use crate::pipeline::progress::{BroadcastProgress, NoopProgress};
use crate::pipeline::Pipeline;

type JobQueue = Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<String>>>;

/// Fixed set of async workers pulling job ids from an unbounded queue.
///
/// Must be created inside a Tokio runtime. Submitting never waits for a
/// job to run; the pipeline settles every job's status in the store.
pub struct WorkerPool {
    job_sender: Mutex<Option<mpsc::UnboundedSender<String>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    shutdown: AtomicBool,
    worker_count: usize,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            warn!("Worker pool lock was poisoned, recovering");
            poisoned.into_inner()
        }
    }
}

impl WorkerPool {
    pub fn new(pipeline: Arc<Pipeline>, worker_count: usize) -> Self {
        Self::with_progress_sender(pipeline, worker_count, None)
    }

    /// Creates a worker pool that reports progress to `progress_sender`.
    ///
    /// A `worker_count` of 0 is treated as 1.
    pub fn with_progress_sender(
        pipeline: Arc<Pipeline>,
        worker_count: usize,
        progress_sender: Option<Arc<broadcast::Sender<JobProgressEvent>>>,
    ) -> Self {
        let worker_count = worker_count.max(1);
        let (job_sender, job_receiver) = mpsc::unbounded_channel::<String>();
        let queue: JobQueue = Arc::new(tokio::sync::Mutex::new(job_receiver));

        let workers = (0..worker_count)
            .map(|worker_id| {
                tokio::spawn(run_worker(
                    worker_id,
                    Arc::clone(&queue),
                    Arc::clone(&pipeline),
                    progress_sender.clone(),
                ))
            })
            .collect();

        info!("Started {} workers", worker_count);

        Self {
            job_sender: Mutex::new(Some(job_sender)),
            workers: Mutex::new(workers),
            shutdown: AtomicBool::new(false),
            worker_count,
        }
    }

    /// Queues a job id for processing.
    pub fn submit(&self, job_id: &str) -> Result<(), WorkerError> {
        if self.is_shutdown() {
            return Err(WorkerError::ChannelClosed);
        }

        match lock(&self.job_sender).as_ref() {
            Some(sender) => sender
                .send(job_id.to_string())
                .map_err(|_| WorkerError::ChannelClosed),
            None => Err(WorkerError::ChannelClosed),
        }
    }

    /// Stops accepting jobs, lets the workers drain the queue and waits for them.
    pub async fn shutdown(&self) {
        if self.shutdown.swap(true, Ordering::SeqCst) {
            debug!("Worker pool already shut down");
        }
        info!("Shutting down worker pool...");

        // Closing the channel makes workers exit once the queue is empty
        drop(lock(&self.job_sender).take());

        let workers = std::mem::take(&mut *lock(&self.workers));
        let results = join_all(workers).await;
        for (worker_id, result) in results.into_iter().enumerate() {
            match result {
                Ok(()) => debug!("Worker {} finished", worker_id),
                Err(e) => error!("{}: {}", WorkerError::Panicked { worker_id }, e),
            }
        }

        info!("All workers have stopped");
    }

    /// Stops accepting jobs and cancels the workers without draining the queue.
    ///
    /// Jobs that were queued or running keep their current status; callers
    /// settle them afterwards.
    pub async fn abort(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        warn!("Aborting worker pool");

        drop(lock(&self.job_sender).take());

        let workers = std::mem::take(&mut *lock(&self.workers));
        for worker in &workers {
            worker.abort();
        }
        for (worker_id, result) in join_all(workers).await.into_iter().enumerate() {
            match result {
                Err(e) if e.is_panic() => error!("{}: {}", WorkerError::Panicked { worker_id }, e),
                _ => debug!("Worker {} cancelled", worker_id),
            }
        }
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }
}

async fn run_worker(
    worker_id: usize,
    queue: JobQueue,
    pipeline: Arc<Pipeline>,
    progress_sender: Option<Arc<broadcast::Sender<JobProgressEvent>>>,
) {
    debug!("Worker {} started", worker_id);

    loop {
        let next = queue.lock().await.recv().await;
        let Some(job_id) = next else {
            debug!("Worker {} job channel closed", worker_id);
            break;
        };

        debug!("Worker {} processing job {}", worker_id, job_id);
        let run = async {
            match progress_sender {
                Some(ref sender) => {
                    let progress = BroadcastProgress::new(&job_id, Arc::clone(sender));
                    pipeline.run(&job_id, &progress).await
                }
                None => pipeline.run(&job_id, &NoopProgress).await,
            }
        };

        // Keep the worker alive whatever happens inside the pipeline
        let result = match AssertUnwindSafe(run).catch_unwind().await {
            Ok(result) => result,
            Err(_) => {
                error!("Worker {} panicked while running job {}", worker_id, job_id);
                pipeline.abandon(&job_id, "pipeline: panicked");
                continue;
            }
        };

        if result.is_success() {
            debug!("Worker {} finished job {}", worker_id, result.job_id);
        } else {
            debug!(
                "Worker {} finished job {} as {} ({})",
                worker_id,
                result.job_id,
                result.status,
                result.error.as_deref().unwrap_or("no error")
            );
        }
    }

    debug!("Worker {} stopped", worker_id);
}
