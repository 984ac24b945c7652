//! FFmpeg-based transcoder implementation.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Instant;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::time::{timeout, Duration};
use tracing::{debug, info, instrument};

use super::config::TranscoderConfig;
use super::error::TranscoderError;
use super::traits::Transcoder;
use super::types::{MediaInfo, TranscodeJob, TranscodeOutput};

static OUT_TIME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"out_time_ms=(\d+)").unwrap());

/// Keep at most this much of ffmpeg's error output for the error value.
const MAX_STDERR_BYTES: usize = 4096;

/// FFmpeg-based transcoder implementation.
pub struct FfmpegTranscoder {
    config: TranscoderConfig,
}

impl FfmpegTranscoder {
    pub fn new(config: TranscoderConfig) -> Self {
        Self { config }
    }

    /// Creates a transcoder with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(TranscoderConfig::default())
    }

    /// Builds ffmpeg arguments for extracting and re-encoding the audio track.
    fn build_args(&self, job: &TranscodeJob, output_path: &Path) -> Vec<String> {
        let mut args = vec!["-y".to_string()];

        let source_format = job
            .source_format
            .as_ref()
            .or(self.config.source_format.as_ref());
        if let Some(format) = source_format {
            args.extend(["-f".to_string(), format.clone()]);
        }

        args.extend([
            "-i".to_string(),
            job.input_path.to_string_lossy().to_string(),
            // Drop video
            "-vn".to_string(),
            "-c:a".to_string(),
            self.config.format.ffmpeg_codec().to_string(),
            "-b:a".to_string(),
            format!("{}k", self.config.bitrate_kbps),
        ]);

        if let Some(channels) = self.config.channels {
            args.extend(["-ac".to_string(), channels.to_string()]);
        }

        args.extend([
            "-loglevel".to_string(),
            self.config.ffmpeg_log_level.clone(),
            "-progress".to_string(),
            "pipe:2".to_string(),
        ]);

        args.extend(self.config.extra_ffmpeg_args.iter().cloned());

        args.push(output_path.to_string_lossy().to_string());

        args
    }

    /// Parses ffprobe JSON output into MediaInfo.
    fn parse_probe_output(path: &Path, output: &str) -> Result<MediaInfo, TranscoderError> {
        #[derive(Deserialize)]
        struct ProbeOutput {
            format: ProbeFormat,
            #[serde(default)]
            streams: Vec<ProbeStream>,
        }

        #[derive(Deserialize)]
        struct ProbeFormat {
            format_name: String,
            duration: Option<String>,
            size: Option<String>,
        }

        #[derive(Deserialize)]
        struct ProbeStream {
            codec_type: String,
            codec_name: Option<String>,
            bit_rate: Option<String>,
            sample_rate: Option<String>,
            channels: Option<u8>,
        }

        let probe: ProbeOutput =
            serde_json::from_str(output).map_err(|e| TranscoderError::ParseError {
                reason: format!("Failed to parse ffprobe output: {}", e),
            })?;

        let duration_secs = probe
            .format
            .duration
            .as_ref()
            .and_then(|d| d.parse::<f64>().ok())
            .unwrap_or(0.0);

        let size_bytes = probe
            .format
            .size
            .as_ref()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(0);

        let audio_stream = probe.streams.iter().find(|s| s.codec_type == "audio");
        let video_stream = probe.streams.iter().find(|s| s.codec_type == "video");

        // "mov,mp4,m4a,3gp,3g2,mj2" -> "mov"
        let format_name = probe
            .format
            .format_name
            .split(',')
            .next()
            .unwrap_or("unknown");

        Ok(MediaInfo {
            path: path.to_path_buf(),
            size_bytes,
            duration_secs,
            format: format_name.to_string(),
            audio_codec: audio_stream.and_then(|s| s.codec_name.clone()),
            audio_bitrate_kbps: audio_stream
                .and_then(|s| s.bit_rate.as_ref())
                .and_then(|b| b.parse::<u32>().ok())
                .map(|b| b / 1000),
            audio_sample_rate: audio_stream
                .and_then(|s| s.sample_rate.as_ref())
                .and_then(|r| r.parse::<u32>().ok()),
            audio_channels: audio_stream.and_then(|s| s.channels),
            video_codec: video_stream.and_then(|s| s.codec_name.clone()),
        })
    }

    /// Extracts the encoded position in seconds from a `-progress` line.
    fn parse_progress_line(line: &str) -> Option<f64> {
        let caps = OUT_TIME_RE.captures(line)?;
        let micros = caps.get(1)?.as_str().parse::<f64>().ok()?;
        Some(micros / 1_000_000.0)
    }

    fn not_found_or_io(
        e: std::io::Error,
        missing: impl FnOnce() -> TranscoderError,
    ) -> TranscoderError {
        if e.kind() == std::io::ErrorKind::NotFound {
            missing()
        } else {
            TranscoderError::Io(e)
        }
    }

    #[instrument(skip(self, job), fields(job_id = %job.job_id))]
    async fn run(&self, job: &TranscodeJob) -> Result<TranscodeOutput, TranscoderError> {
        let start = Instant::now();

        if !job.input_path.exists() {
            return Err(TranscoderError::InputNotFound {
                path: job.input_path.clone(),
            });
        }

        tokio::fs::create_dir_all(&job.output_dir).await?;
        let output_path = self.output_path(job);

        // Duration only feeds progress logging
        let duration_secs = match self.probe(&job.input_path).await {
            Ok(info) => Some(info.duration_secs).filter(|d| *d > 0.0),
            Err(e) => {
                debug!("Probe failed, progress will not be reported: {}", e);
                None
            }
        };

        let args = self.build_args(job, &output_path);
        debug!(?args, "Running ffmpeg");

        let mut child = Command::new(&self.config.ffmpeg_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                Self::not_found_or_io(e, || TranscoderError::FfmpegNotFound {
                    path: self.config.ffmpeg_path.clone(),
                })
            })?;

        let stderr = child.stderr.take().ok_or_else(|| {
            TranscoderError::conversion_failed("ffmpeg stderr was not captured", None)
        })?;
        let mut reader = BufReader::new(stderr).lines();

        let timeout_duration = Duration::from_secs(self.config.timeout_secs);
        let result = timeout(timeout_duration, async {
            let mut error_output = String::new();
            let mut last_logged_decile = 0u32;

            while let Ok(Some(line)) = reader.next_line().await {
                if line.contains("Error") || line.contains("error") {
                    if error_output.len() < MAX_STDERR_BYTES {
                        error_output.push_str(&line);
                        error_output.push('\n');
                    }
                    continue;
                }

                if let (Some(position), Some(total)) =
                    (Self::parse_progress_line(&line), duration_secs)
                {
                    let percent = (position / total * 100.0).clamp(0.0, 100.0);
                    let decile = (percent / 10.0) as u32;
                    if decile > last_logged_decile {
                        last_logged_decile = decile;
                        debug!("Transcoding progress: {:.0}%", percent);
                    }
                }
            }

            let status = child.wait().await?;
            Ok::<(std::process::ExitStatus, String), std::io::Error>((status, error_output))
        })
        .await;

        match result {
            Ok(Ok((status, error_output))) => {
                if !status.success() {
                    return Err(TranscoderError::conversion_failed(
                        format!("FFmpeg exited with code: {:?}", status.code()),
                        Some(error_output).filter(|s| !s.is_empty()),
                    ));
                }
            }
            Ok(Err(e)) => return Err(TranscoderError::Io(e)),
            Err(_) => {
                let _ = child.kill().await;
                return Err(TranscoderError::Timeout {
                    timeout_secs: self.config.timeout_secs,
                });
            }
        }

        let output_meta = tokio::fs::metadata(&output_path)
            .await
            .map_err(|_| TranscoderError::conversion_failed("Output file not created", None))?;

        let file_name = output_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        let elapsed = start.elapsed().as_millis() as u64;
        info!(
            output = %output_path.display(),
            size_bytes = output_meta.len(),
            elapsed_ms = elapsed,
            "Transcode finished"
        );

        Ok(TranscodeOutput {
            output_path,
            file_name,
            size_bytes: output_meta.len(),
            duration_ms: elapsed,
        })
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    async fn probe(&self, path: &Path) -> Result<MediaInfo, TranscoderError> {
        if !path.exists() {
            return Err(TranscoderError::InputNotFound {
                path: path.to_path_buf(),
            });
        }

        let output = Command::new(&self.config.ffprobe_path)
            .args([
                "-v",
                "quiet",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
            ])
            .arg(path)
            .output()
            .await
            .map_err(|e| {
                Self::not_found_or_io(e, || TranscoderError::FfprobeNotFound {
                    path: self.config.ffprobe_path.clone(),
                })
            })?;

        if !output.status.success() {
            return Err(TranscoderError::probe_failed(format!(
                "ffprobe failed: {}",
                String::from_utf8_lossy(&output.stderr)
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Self::parse_probe_output(path, &stdout)
    }

    fn output_path(&self, job: &TranscodeJob) -> PathBuf {
        job.output_path(self.config.format.extension())
    }

    async fn transcode(&self, job: TranscodeJob) -> Result<TranscodeOutput, TranscoderError> {
        self.run(&job).await
    }

    async fn validate(&self) -> Result<(), TranscoderError> {
        Command::new(&self.config.ffmpeg_path)
            .arg("-version")
            .output()
            .await
            .map_err(|e| {
                Self::not_found_or_io(e, || TranscoderError::FfmpegNotFound {
                    path: self.config.ffmpeg_path.clone(),
                })
            })?;

        Command::new(&self.config.ffprobe_path)
            .arg("-version")
            .output()
            .await
            .map_err(|e| {
                Self::not_found_or_io(e, || TranscoderError::FfprobeNotFound {
                    path: self.config.ffprobe_path.clone(),
                })
            })?;

        Ok(())
    }
}
