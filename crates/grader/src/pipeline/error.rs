use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::error::StoreError;
use crate::provider::ProviderError;

#[derive(Error, Debug)]
pub enum StageError {
    #[error("{0}")]
    Provider(#[from] ProviderError),

    #[error("Media not found: {}", .0.display())]
    MediaNotFound(PathBuf),

    #[error("Unsupported media '{}': {reason}", .path.display())]
    UnsupportedMedia { path: PathBuf, reason: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Stage timed out after {0:?}")]
    Timeout(Duration),

    #[error("panicked: {0}")]
    Panicked(String),

    #[error("Store update failed: {0}")]
    Store(#[from] StoreError),
}

impl StageError {
    /// True for failures a later attempt could plausibly avoid.
    ///
    /// Jobs are never retried; this only shapes log output.
    pub fn is_transient(&self) -> bool {
        match self {
            StageError::Provider(e) => e.is_transient(),
            StageError::Timeout(_) => true,
            _ => false,
        }
    }
}
