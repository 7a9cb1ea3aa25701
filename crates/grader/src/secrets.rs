//! Provider API key resolution.
//!
//! A key can come from three places, checked in priority order:
//!
//! 1. **Direct value** - quick local testing (`"api_key": "sk-..."`)
//! 2. **File reference** - Docker secrets pattern (`"api_key_file": "/run/secrets/openai"`)
//! 3. **Env var reference** - the default (`"api_key_env_var": "OPENAI_API_KEY"`)

use secrecy::SecretString;
use std::fs;

use crate::config::ProviderConfig;

/// Error type for secret resolution failures.
#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("No secret source provided (need one of: direct value, file path, or env var name)")]
    NoSourceProvided,

    #[error("Failed to read secret from file '{path}': {source}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Environment variable '{name}' not set")]
    EnvVarNotSet { name: String },

    #[error("Environment variable '{name}' contains invalid UTF-8")]
    EnvVarNotUnicode { name: String },

    #[error("Secret from {origin} is empty")]
    Empty { origin: String },
}

/// Result type for secret resolution.
pub type Result<T> = std::result::Result<T, SecretError>;

/// Resolves a secret from a direct value, a file, or an environment variable,
/// in that order. Empty source strings are skipped.
///
/// ```ignore
/// use grader::secrets::resolve_secret;
///
/// // File path used if no direct value
/// let secret = resolve_secret(None, Some("~/.secrets/openai"), Some("OPENAI_API_KEY"))?;
/// ```
pub fn resolve_secret(
    direct: Option<&str>,
    file_path: Option<&str>,
    env_var: Option<&str>,
) -> Result<SecretString> {
    if let Some(value) = direct.filter(|v| !v.is_empty()) {
        return Ok(SecretString::from(value.to_string()));
    }

    if let Some(path) = file_path.filter(|p| !p.is_empty()) {
        let expanded = expand_home(path);
        let content = fs::read_to_string(&expanded).map_err(|e| SecretError::FileReadError {
            path: expanded.clone(),
            source: e,
        })?;
        let trimmed = content.trim();
        if trimmed.is_empty() {
            return Err(SecretError::Empty {
                origin: format!("file '{}'", expanded),
            });
        }
        return Ok(SecretString::from(trimmed.to_string()));
    }

    if let Some(var_name) = env_var.filter(|n| !n.is_empty()) {
        return match std::env::var(var_name) {
            // Env vars may carry trailing newlines
            Ok(value) if value.trim().is_empty() => Err(SecretError::Empty {
                origin: format!("environment variable '{}'", var_name),
            }),
            Ok(value) => Ok(SecretString::from(value.trim().to_string())),
            Err(std::env::VarError::NotPresent) => Err(SecretError::EnvVarNotSet {
                name: var_name.to_string(),
            }),
            Err(std::env::VarError::NotUnicode(_)) => Err(SecretError::EnvVarNotUnicode {
                name: var_name.to_string(),
            }),
        };
    }

    Err(SecretError::NoSourceProvided)
}

/// Resolves the API key configured for the transcription/scoring provider.
pub fn resolve_api_key(config: &ProviderConfig) -> Result<SecretString> {
    resolve_secret(
        config.api_key.as_deref(),
        config.api_key_file.as_deref(),
        config.api_key_env_var.as_deref(),
    )
}

/// Expands `~` to the user's home directory.
///
/// Checks HOME (Unix) then USERPROFILE (Windows). `~user/path` is not supported.
fn expand_home(path: &str) -> String {
    if path == "~" || path.starts_with("~/") {
        if let Some(home) = std::env::var_os("HOME").or_else(|| std::env::var_os("USERPROFILE")) {
            if path == "~" {
                return home.to_string_lossy().into_owned();
            }
            return path.replacen('~', &home.to_string_lossy(), 1);
        }
    }
    path.to_string()
}
