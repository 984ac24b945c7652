//! Types for the transcoder module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::sanitize::sanitize_filename;

/// Target audio format.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioFormat {
    /// MPEG Audio Layer III
    #[default]
    Mp3,
    /// Advanced Audio Coding
    Aac,
    /// Ogg Vorbis
    OggVorbis,
    /// Opus
    Opus,
}

impl AudioFormat {
    /// Returns the file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::Aac => "m4a",
            Self::OggVorbis => "ogg",
            Self::Opus => "opus",
        }
    }

    /// Returns the ffmpeg codec name for this format.
    pub fn ffmpeg_codec(&self) -> &'static str {
        match self {
            Self::Mp3 => "libmp3lame",
            Self::Aac => "aac",
            Self::OggVorbis => "libvorbis",
            Self::Opus => "libopus",
        }
    }
}

/// A single transcode request.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscodeJob {
    /// Identifier used in logs.
    pub job_id: String,
    /// Downloaded source file.
    pub input_path: PathBuf,
    /// Container format to force on the input, if known.
    pub source_format: Option<String>,
    /// Remote display name of the source; the output name derives from it.
    pub display_name: String,
    /// Directory the output is written to.
    pub output_dir: PathBuf,
}

impl TranscodeJob {
    /// Output path for a given extension.
    ///
    /// The display name is sanitized and its last extension replaced, so
    /// `"My Video.mp4"` becomes `"My Video.mp3"`.
    pub fn output_path(&self, extension: &str) -> PathBuf {
        let sanitized = sanitize_filename(&self.display_name);
        let stem = match sanitized.rsplit_once('.') {
            Some((stem, _)) if !stem.trim().is_empty() => stem.trim_end(),
            _ => sanitized.as_str(),
        };
        self.output_dir.join(format!("{}.{}", stem, extension))
    }
}

/// Result of a successful transcode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscodeOutput {
    pub output_path: PathBuf,
    /// Base name of `output_path`; also the uploaded name.
    pub file_name: String,
    pub size_bytes: u64,
    /// Wall-clock time spent in ffmpeg.
    pub duration_ms: u64,
}

/// Information about a media file, from ffprobe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    pub path: PathBuf,
    pub size_bytes: u64,
    pub duration_secs: f64,
    /// Container format (e.g., "mov", "matroska").
    pub format: String,
    pub audio_codec: Option<String>,
    pub audio_bitrate_kbps: Option<u32>,
    pub audio_sample_rate: Option<u32>,
    pub audio_channels: Option<u8>,
    pub video_codec: Option<String>,
}

impl MediaInfo {
    pub fn has_audio(&self) -> bool {
        self.audio_codec.is_some()
    }
}
