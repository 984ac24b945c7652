//! Types for the conversion orchestrator.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use url::Url;

use crate::storage::StorageError;
use crate::transcoder::TranscoderError;

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Authenticating,
    ExtractingIds,
    Downloading,
    Transcoding,
    Uploading,
    CleaningUp,
    Done,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Authenticating => "authenticating",
            Self::ExtractingIds => "extracting_ids",
            Self::Downloading => "downloading",
            Self::Transcoding => "transcoding",
            Self::Uploading => "uploading",
            Self::CleaningUp => "cleaning_up",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a stage failed. The display text is the message reported to callers.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Failed to authenticate with Google Drive: {0}")]
    Auth(String),

    #[error("Could not extract valid ID from one or both URLs.")]
    IdExtraction,

    #[error("Download failed: {0}")]
    Download(#[source] StorageError),

    #[error("Conversion failed: {0}")]
    Transcode(#[source] TranscoderError),

    #[error("Upload failed: {0}")]
    Upload(#[source] StorageError),
}

impl PipelineError {
    /// Coarse classification for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Auth(_) => "auth",
            Self::IdExtraction => "not_found",
            Self::Download(e) | Self::Upload(e) if e.is_not_found() => "not_found",
            Self::Download(_) | Self::Upload(_) => "transfer",
            Self::Transcode(_) => "transcode",
        }
    }

    /// Storage errors caused by rejected credentials are reported as
    /// authentication failures rather than transfer failures.
    pub(crate) fn from_download(err: StorageError) -> Self {
        if err.is_auth() {
            Self::Auth(err.to_string())
        } else {
            Self::Download(err)
        }
    }

    pub(crate) fn from_upload(err: StorageError) -> Self {
        if err.is_auth() {
            Self::Auth(err.to_string())
        } else {
            Self::Upload(err)
        }
    }
}

/// A pipeline error tagged with the stage it happened in.
#[derive(Debug, Error)]
#[error("{stage} failed: {error}")]
pub struct StageFailure {
    pub stage: Stage,
    #[source]
    pub error: PipelineError,
}

/// Problems with the URLs in an incoming request.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("Invalid {field}: {reason}")]
    InvalidUrl { field: &'static str, reason: String },

    #[error("Invalid {field}: unsupported scheme '{scheme}'")]
    UnsupportedScheme { field: &'static str, scheme: String },
}

/// A validated conversion request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversionRequest {
    pub video_url: Url,
    pub folder_url: Url,
}

impl ConversionRequest {
    /// Parses both URLs, accepting only http and https.
    pub fn new(video_url: &str, folder_url: &str) -> Result<Self, RequestError> {
        Ok(Self {
            video_url: parse_url("video_url", video_url)?,
            folder_url: parse_url("folder_url", folder_url)?,
        })
    }
}

fn parse_url(field: &'static str, raw: &str) -> Result<Url, RequestError> {
    let url = Url::parse(raw.trim()).map_err(|e| RequestError::InvalidUrl {
        field,
        reason: e.to_string(),
    })?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(RequestError::UnsupportedScheme {
            field,
            scheme: other.to_string(),
        }),
    }
}

/// Final outcome of a conversion, as reported to every caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionResult {
    pub success: bool,
    pub message: String,
}

impl ConversionResult {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

impl From<Result<String, StageFailure>> for ConversionResult {
    /// `Ok` carries the uploaded file name.
    fn from(outcome: Result<String, StageFailure>) -> Self {
        match outcome {
            Ok(file_name) => Self::success(format!(
                "Successfully processed and uploaded: {}",
                file_name
            )),
            Err(failure) => Self::failure(failure.error.to_string()),
        }
    }
}
