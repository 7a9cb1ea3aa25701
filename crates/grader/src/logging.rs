//! Process-wide log setup for binaries embedding the grader.

use thiserror::Error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Filter used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("A global tracing subscriber is already installed: {0}")]
    Subscriber(#[from] tracing::subscriber::SetGlobalDefaultError),

    #[error("Failed to bridge `log` records into tracing: {0}")]
    LogBridge(#[from] log::SetLoggerError),
}

/// Installs a fmt subscriber filtered by `RUST_LOG` and routes `log`
/// macros through it.
///
/// With `json` set, every event is written as one JSON object per line.
pub fn init_logging(json: bool) -> Result<(), LoggingError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let (plain_layer, json_layer) = if json {
        (None, Some(fmt::layer().json().with_current_span(true)))
    } else {
        (Some(fmt::layer().with_target(false)), None)
    };

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(plain_layer)
        .with(json_layer);

    tracing::subscriber::set_global_default(subscriber)?;
    tracing_log::LogTracer::init()?;
    Ok(())
}
