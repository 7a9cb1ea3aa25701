//! OpenAI-compatible HTTP client for transcription and scoring.
//!
//! Works against any server speaking the OpenAI wire format
//! (`/audio/transcriptions`, `/chat/completions`). All connection details
//! come from [`ProviderConfig`].

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info};
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::{ProviderError, Scorer, Transcriber};
use crate::config::ProviderConfig;
use crate::sanitize;
use crate::worker::job::{detect_mime_type, Evaluation};

/// Maximum length for error bodies kept in errors and logs.
const MAX_ERROR_BODY_LENGTH: usize = 200;

const SCORING_SYSTEM_PROMPT: &str = r#"You are an expert interview evaluator. Analyze the candidate's response to an interview question and provide a JSON evaluation with the following scores (1-5 scale):
- relevance: How relevant is the answer to the question?
- clarity: How clear and well-structured is the response?
- depth: How much depth and detail does the answer provide?
- communication: How well does the candidate communicate?
- overall_score: Overall score considering all factors
- justification: A brief explanation of the scores

Respond ONLY with valid JSON in this exact format:
{
  "relevance": <number>,
  "clarity": <number>,
  "depth": <number>,
  "communication": <number>,
  "overall_score": <number>,
  "justification": "<string>"
}"#;

fn truncate_error_body(body: &str) -> String {
    sanitize::truncate(body, MAX_ERROR_BODY_LENGTH)
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Builds the user message sent to the scoring model.
pub fn build_scoring_prompt(question: &str, transcript: &str) -> String {
    format!(
        "Question: \"{}\"\n\nCandidate's Response: \"{}\"",
        question, transcript
    )
}

/// Parses the scoring model's message content into an [`Evaluation`].
///
/// Tolerates a surrounding Markdown code fence. Range checks are left to the
/// caller.
pub fn parse_evaluation(content: &str) -> Result<Evaluation, ProviderError> {
    let trimmed = content.trim();
    let json = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.trim_end().strip_suffix("```"))
        .unwrap_or(trimmed)
        .trim();

    serde_json::from_str(json).map_err(|e| {
        ProviderError::MalformedResponse(format!(
            "evaluation is not valid JSON of the expected shape ({}): {}",
            e,
            truncate_error_body(json)
        ))
    })
}

/// OpenAI-compatible transcription and scoring client.
pub struct OpenAiClient {
    client: Client,
    base_url: String,
    api_key: SecretString,
    transcription_model: String,
    scoring_model: String,
    temperature: f32,
}

impl OpenAiClient {
    /// Creates a client with the connect/request timeouts from `config`.
    pub fn new(config: &ProviderConfig, api_key: SecretString) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| ProviderError::Request(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            transcription_model: config.transcription_model.clone(),
            scoring_model: config.scoring_model.clone(),
            temperature: config.temperature,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Turns non-success responses into [`ProviderError::Status`].
    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ProviderError::Status {
            status: status.as_u16(),
            body: truncate_error_body(&body),
        })
    }
}

#[async_trait]
impl Transcriber for OpenAiClient {
    async fn transcribe(&self, media: &Path) -> Result<String, ProviderError> {
        let bytes = tokio::fs::read(media).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ProviderError::MediaNotFound(media.to_path_buf())
            } else {
                ProviderError::ReadMedia {
                    path: media.to_path_buf(),
                    source: e,
                }
            }
        })?;

        let file_name = media
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "recording".to_string());
        let mime = detect_mime_type(media).unwrap_or_else(|| "application/octet-stream".to_string());

        info!(
            "Sending {} ({} bytes, {}) for transcription",
            file_name,
            bytes.len(),
            mime
        );

        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(&mime)
            .map_err(|e| ProviderError::UnsupportedMedia {
                path: media.to_path_buf(),
                reason: e.to_string(),
            })?;
        let form = Form::new()
            .part("file", part)
            .text("model", self.transcription_model.clone());

        let response = self
            .client
            .post(self.endpoint("audio/transcriptions"))
            .bearer_auth(self.api_key.expose_secret())
            .multipart(form)
            .send()
            .await?;
        let response = Self::check_status(response).await?;

        let body: TranscriptionResponse = response.json().await?;
        debug!("Transcription returned {} characters", body.text.len());
        Ok(body.text.trim().to_string())
    }
}

#[async_trait]
impl Scorer for OpenAiClient {
    async fn score(&self, question: &str, transcript: &str) -> Result<Evaluation, ProviderError> {
        let body = serde_json::json!({
            "model": self.scoring_model,
            "temperature": self.temperature,
            "messages": [
                { "role": "system", "content": SCORING_SYSTEM_PROMPT },
                { "role": "user", "content": build_scoring_prompt(question, transcript) },
            ],
        });

        let response = self
            .client
            .post(self.endpoint("chat/completions"))
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await?;
        let response = Self::check_status(response).await?;

        let completion: ChatCompletionResponse = response.json().await?;
        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_else(|| "{}".to_string());

        parse_evaluation(&content)
    }
}
