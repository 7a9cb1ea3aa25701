pub mod config;
pub mod error;
pub mod evaluation;
pub mod progress;
pub mod runner;
pub mod stage;
pub mod transcription;

pub use config::PipelineConfig;
pub use error::StageError;
pub use evaluation::{EvaluationStage, EVALUATION_STAGE};
pub use progress::{BroadcastProgress, NoopProgress, ProgressEvent, ProgressReporter};
pub use runner::Pipeline;
pub use stage::Stage;
pub use transcription::{TranscriptionStage, TRANSCRIPTION_STAGE};
