//! Conversion orchestrator.
//!
//! Drives a request through `Authenticating → ExtractingIds → Downloading →
//! Transcoding → Uploading → CleaningUp → Done`. A failing stage jumps
//! straight to cleanup; the caller always gets a [`ConversionResult`].

mod runner;
mod types;

pub use runner::ConversionOrchestrator;
pub use types::{
    ConversionRequest, ConversionResult, PipelineError, RequestError, Stage, StageFailure,
};
