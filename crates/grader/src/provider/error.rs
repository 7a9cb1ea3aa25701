//! Errors raised by transcription and scoring providers.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while calling an external capability.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// HTTP transport or connection error.
    #[error("HTTP request failed: {0}")]
    Request(String),

    /// The provider answered with a non-success status code.
    #[error("Provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The request did not complete within the client timeout.
    #[error("Provider request timed out")]
    Timeout,

    /// The media file does not exist.
    #[error("Media file not found: {}", .0.display())]
    MediaNotFound(PathBuf),

    /// The media file exists but could not be read.
    #[error("Failed to read media '{}': {source}", .path.display())]
    ReadMedia {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The media is not something the provider can transcribe.
    #[error("Unsupported media '{}': {reason}", .path.display())]
    UnsupportedMedia { path: PathBuf, reason: String },

    /// The provider answered, but not with the expected structure.
    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),
}

impl ProviderError {
    /// Returns true for failures of the call itself (network, status, timeout),
    /// as opposed to bad input or unparseable output.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ProviderError::Request(_) | ProviderError::Status { .. } | ProviderError::Timeout
        )
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ProviderError::Timeout
        } else if e.is_decode() {
            ProviderError::MalformedResponse(e.to_string())
        } else {
            ProviderError::Request(e.to_string())
        }
    }
}
