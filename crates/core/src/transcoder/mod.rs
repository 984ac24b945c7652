//! Transcoder module: extracts the audio track of a downloaded video and
//! re-encodes it with ffmpeg.
//!
//! # Example
//!
//! ```ignore
//! use driveconv_core::transcoder::{FfmpegTranscoder, TranscodeJob, Transcoder, TranscoderConfig};
//!
//! let transcoder = FfmpegTranscoder::new(TranscoderConfig::default());
//! transcoder.validate().await?;
//!
//! let output = transcoder
//!     .transcode(TranscodeJob {
//!         job_id: "req-1".to_string(),
//!         input_path: PathBuf::from("/tmp/driveconv/temp_video_abc.mp4"),
//!         source_format: None,
//!         display_name: "Lecture 1.mp4".to_string(),
//!         output_dir: PathBuf::from("/tmp/driveconv"),
//!     })
//!     .await?;
//! assert_eq!(output.file_name, "Lecture 1.mp3");
//! ```

mod config;
mod error;
mod ffmpeg;
mod traits;
mod types;

pub use config::TranscoderConfig;
pub use error::TranscoderError;
pub use ffmpeg::FfmpegTranscoder;
pub use traits::Transcoder;
pub use types::{AudioFormat, MediaInfo, TranscodeJob, TranscodeOutput};
