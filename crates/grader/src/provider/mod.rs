//! External capabilities consumed by the pipeline.
//!
//! The pipeline only sees the [`Transcriber`] and [`Scorer`] traits; the
//! OpenAI-compatible HTTP client is one implementation of both.

pub mod error;
pub mod openai;

use std::path::Path;

use async_trait::async_trait;

use crate::worker::job::Evaluation;

pub use error::ProviderError;
pub use openai::OpenAiClient;

/// Speech-to-text capability.
///
/// Implementors must be `Send + Sync` so they can be shared between workers
/// (e.g. wrapped in `Arc<dyn Transcriber>`).
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, media: &Path) -> Result<String, ProviderError>;
}

/// Answer scoring capability.
#[async_trait]
pub trait Scorer: Send + Sync {
    async fn score(&self, question: &str, transcript: &str) -> Result<Evaluation, ProviderError>;
}
