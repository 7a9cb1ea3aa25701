//! Test harness for isolated test execution.
//!
//! The `TestHarness` struct provides:
//! - A temporary directory for media and config files
//! - In-process fake transcription and scoring capabilities
//! - A `Grader` wired to those fakes, plus helpers to wait for jobs to settle

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tempfile::TempDir;

use grader::config::Config;
use grader::{Evaluation, Grader, Job, ProviderError, Scorer, Transcriber};

use super::builders::EvaluationBuilder;

/// What a fake capability answers.
#[derive(Debug, Clone)]
pub enum Reply<T> {
    Ok(T),
    /// Provider-side failure (HTTP 500).
    Fail(String),
    /// Unparseable content.
    Malformed(String),
    /// Never answers.
    Hang,
    /// Panics inside the capability.
    Panic(String),
}

impl<T: Clone> Reply<T> {
    async fn resolve(&self) -> Result<T, ProviderError> {
        match self {
            Reply::Ok(value) => Ok(value.clone()),
            Reply::Fail(body) => Err(ProviderError::Status {
                status: 500,
                body: body.clone(),
            }),
            Reply::Malformed(msg) => Err(ProviderError::MalformedResponse(msg.clone())),
            Reply::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(ProviderError::Timeout)
            }
            Reply::Panic(msg) => panic!("{}", msg),
        }
    }
}

/// Fake transcriber answering per media file name.
///
/// Files without a scripted reply transcribe to `"Answer from <file name>"`.
pub struct FakeTranscriber {
    replies: Mutex<HashMap<String, Reply<String>>>,
    delay: Duration,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeTranscriber {
    pub fn new() -> Self {
        Self::with_delay(Duration::ZERO)
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            replies: Mutex::new(HashMap::new()),
            delay,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn script(&self, file_name: &str, reply: Reply<String>) {
        self.replies
            .lock()
            .unwrap()
            .insert(file_name.to_string(), reply);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of transcriptions that ran at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transcriber for FakeTranscriber {
    async fn transcribe(&self, media: &Path) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let file_name = media
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let reply = self
            .replies
            .lock()
            .unwrap()
            .get(&file_name)
            .cloned()
            .unwrap_or_else(|| Reply::Ok(format!("Answer from {}", file_name)));

        let result = reply.resolve().await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

/// Fake scorer recording every `(question, transcript)` pair it receives.
pub struct FakeScorer {
    reply: Mutex<Reply<Evaluation>>,
    calls: Mutex<Vec<(String, String)>>,
}

impl FakeScorer {
    pub fn new() -> Self {
        Self::replying(Reply::Ok(EvaluationBuilder::new().build()))
    }

    pub fn replying(reply: Reply<Evaluation>) -> Self {
        Self {
            reply: Mutex::new(reply),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Scorer for FakeScorer {
    async fn score(&self, question: &str, transcript: &str) -> Result<Evaluation, ProviderError> {
        self.calls
            .lock()
            .unwrap()
            .push((question.to_string(), transcript.to_string()));
        let reply = self.reply.lock().unwrap().clone();
        reply.resolve().await
    }
}

/// Test harness providing an isolated grader for integration tests.
pub struct TestHarness {
    temp_dir: TempDir,
    pub media_dir: PathBuf,
    pub transcriber: Arc<FakeTranscriber>,
    pub scorer: Arc<FakeScorer>,
    pub grader: Grader,
}

impl TestHarness {
    /// Harness with default fakes. Must be called inside a Tokio runtime.
    pub fn new(config: Config) -> Self {
        Self::with_fakes(config, FakeTranscriber::new(), FakeScorer::new())
    }

    pub fn with_fakes(config: Config, transcriber: FakeTranscriber, scorer: FakeScorer) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let media_dir = temp_dir.path().join("media");
        std::fs::create_dir_all(&media_dir).expect("Failed to create media dir");

        let transcriber = Arc::new(transcriber);
        let scorer = Arc::new(scorer);
        let grader = Grader::with_capabilities(&config, transcriber.clone(), scorer.clone());

        Self {
            temp_dir,
            media_dir,
            transcriber,
            scorer,
            grader,
        }
    }

    pub fn temp_path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes a fake recording to the media directory.
    pub fn write_media(&self, file_name: &str) -> PathBuf {
        let path = self.media_dir.join(file_name);
        std::fs::write(&path, b"\x1a\x45\xdf\xa3 fake recording").expect("Failed to write media");
        path
    }

    /// Polls the grader until the job is completed or failed.
    pub async fn wait_settled(&self, job_id: &str) -> Job {
        let deadline = Instant::now() + Duration::from_secs(15);
        loop {
            if let Some(job) = self.grader.get(job_id) {
                if job.is_finished() {
                    return job;
                }
            }
            assert!(
                Instant::now() < deadline,
                "job {} did not settle in time",
                job_id
            );
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}
