//! Error types for the transcoder module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while transcoding.
#[derive(Debug, Error)]
pub enum TranscoderError {
    /// FFmpeg binary not found.
    #[error("FFmpeg not found at path: {}", path.display())]
    FfmpegNotFound { path: PathBuf },

    /// FFprobe binary not found.
    #[error("FFprobe not found at path: {}", path.display())]
    FfprobeNotFound { path: PathBuf },

    /// Input file not found.
    #[error("Input file not found: {}", path.display())]
    InputNotFound { path: PathBuf },

    /// The ffmpeg process failed or produced no output.
    #[error("{reason}")]
    ConversionFailed {
        reason: String,
        stderr: Option<String>,
    },

    #[error("Transcoding timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    #[error("Failed to probe media file: {reason}")]
    ProbeFailed { reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse ffprobe output.
    #[error("Failed to parse media info: {reason}")]
    ParseError { reason: String },
}

impl TranscoderError {
    pub fn conversion_failed(reason: impl Into<String>, stderr: Option<String>) -> Self {
        Self::ConversionFailed {
            reason: reason.into(),
            stderr,
        }
    }

    pub fn probe_failed(reason: impl Into<String>) -> Self {
        Self::ProbeFailed {
            reason: reason.into(),
        }
    }

    /// Whether the toolchain itself is missing, as opposed to a bad input.
    pub fn is_toolchain_missing(&self) -> bool {
        matches!(
            self,
            Self::FfmpegNotFound { .. } | Self::FfprobeNotFound { .. }
        )
    }
}
