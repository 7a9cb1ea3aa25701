use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use log::{error, info, warn};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::Notify;

use grader::config::{load_config, Config};
use grader::secrets::resolve_api_key;
use grader::{Grader, JobStatus};

/// Transcribe and score recorded interview answers.
#[derive(Parser)]
#[command(name = "grader", version)]
struct Cli {
    /// Config file (default: <config dir>/grader/config.json).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Submit recordings and wait until every job has settled.
    Submit {
        /// Audio or video files, one answer each.
        #[arg(required = true)]
        media: Vec<PathBuf>,

        /// Index of the question the recordings answer.
        #[arg(long, short)]
        question: usize,

        /// Candidate name (default: Anonymous).
        #[arg(long, short)]
        name: Option<String>,
    },

    /// List the configured interview questions.
    Questions,

    /// Load and validate the configuration.
    CheckConfig,
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("grader").join("config.json"))
}

/// Loads the explicit config, else the default file if present, else built-in defaults.
fn resolve_config(explicit: Option<&Path>) -> Result<Config, grader::ConfigError> {
    if let Some(path) = explicit {
        info!("Using config file {:?}", path);
        return load_config(path);
    }

    match default_config_path() {
        Some(path) if path.exists() => {
            info!("Using config file {:?}", path);
            load_config(&path)
        }
        _ => {
            info!("No config file found, using built-in defaults");
            Ok(Config::default())
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = grader::logging::init_logging(cli.json_logs) {
        eprintln!("Error: {e}");
        return ExitCode::FAILURE;
    }

    let config = match resolve_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command {
        Command::Submit {
            media,
            question,
            name,
        } => submit(&config, media, question, name).await,
        Command::Questions => {
            for (index, text) in config.question_set().iter() {
                println!("{index}: {text}");
            }
            Ok(true)
        }
        Command::CheckConfig => check_config(&config),
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn check_config(config: &Config) -> Result<bool, Box<dyn std::error::Error>> {
    println!("Config version {} is valid", config.version);
    println!("  provider:  {}", config.provider.base_url);
    println!(
        "  models:    {} / {}",
        config.provider.transcription_model, config.provider.scoring_model
    );
    println!(
        "  workers:   {} (stage timeout {}s)",
        config.pipeline.worker_count, config.pipeline.stage_timeout_secs
    );
    println!("  questions: {}", config.questions.len());

    match resolve_api_key(&config.provider) {
        Ok(_) => {
            println!("  api key:   resolved");
            Ok(true)
        }
        Err(e) => {
            println!("  api key:   {e}");
            Ok(false)
        }
    }
}

/// Returns `Ok(true)` when every submitted job completed.
async fn submit(
    config: &Config,
    media: Vec<PathBuf>,
    question: usize,
    name: Option<String>,
) -> Result<bool, Box<dyn std::error::Error>> {
    let grader = Grader::from_config(config)?;
    if !grader.questions().contains(question) {
        warn!(
            "Question index {} is outside the configured {} questions",
            question,
            grader.questions().len()
        );
    }

    let interrupted = Arc::new(Notify::new());
    {
        let interrupted = Arc::clone(&interrupted);
        ctrlc::set_handler(move || interrupted.notify_one())?;
    }

    // Subscribe before submitting so no settle event is missed
    let mut events = grader.subscribe();

    let mut waiting = HashSet::new();
    let mut ids = Vec::with_capacity(media.len());
    for path in media {
        let ack = grader.submit(path, question, name.clone())?;
        println!("{}", serde_json::to_string(&ack)?);
        waiting.insert(ack.id.clone());
        ids.push(ack.id);
    }

    let mut was_interrupted = false;
    while !waiting.is_empty() {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) if event.status.is_terminal() => {
                    waiting.remove(&event.job_id);
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Missed {} progress events, re-reading job store", skipped);
                    waiting.retain(|id| {
                        grader.get(id).map_or(false, |job| !job.is_finished())
                    });
                }
                Err(RecvError::Closed) => break,
            },
            _ = interrupted.notified() => {
                warn!("Interrupted, cancelling {} unsettled jobs", waiting.len());
                was_interrupted = true;
                break;
            }
        }
    }

    if was_interrupted {
        grader.abort("interrupted").await;
    } else {
        grader.shutdown().await;
    }

    let jobs: Vec<_> = ids.iter().filter_map(|id| grader.get(id)).collect();
    println!("{}", serde_json::to_string_pretty(&jobs)?);

    let failed = jobs
        .iter()
        .filter(|job| job.status == JobStatus::Failed)
        .count();
    if failed > 0 {
        error!("{} of {} jobs failed", failed, jobs.len());
    }
    Ok(failed == 0 && !was_interrupted)
}
