//! Trait definitions for the transcoder module.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use super::error::TranscoderError;
use super::types::{MediaInfo, TranscodeJob, TranscodeOutput};

/// Converts a downloaded media file to an audio file.
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Returns the name of this transcoder implementation.
    fn name(&self) -> &str;

    /// Probes a media file to get its information.
    async fn probe(&self, path: &Path) -> Result<MediaInfo, TranscoderError>;

    /// Where `transcode` will write its output for this job.
    ///
    /// Known before transcoding starts so a partial output can be cleaned up.
    fn output_path(&self, job: &TranscodeJob) -> PathBuf;

    /// Transcodes the job's input and returns the written output.
    async fn transcode(&self, job: TranscodeJob) -> Result<TranscodeOutput, TranscoderError>;

    /// Validates that the transcoder is properly configured and ready.
    async fn validate(&self) -> Result<(), TranscoderError>;
}
