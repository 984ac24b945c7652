//! Mock transcoder for testing.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::transcoder::{
    AudioFormat, MediaInfo, TranscodeJob, TranscodeOutput, Transcoder, TranscoderError,
};

/// Bytes written as the "transcoded" output.
const MOCK_AUDIO: &[u8] = b"ID3\x04\x00mock audio";

/// Mock implementation of the Transcoder trait.
///
/// Writes a small placeholder file where ffmpeg would write its output, so
/// upload and cleanup behave as with the real transcoder.
#[derive(Debug)]
pub struct MockTranscoder {
    format: AudioFormat,
    /// Jobs submitted to `transcode`.
    jobs: Arc<RwLock<Vec<TranscodeJob>>>,
    /// If set, the next transcode fails before writing anything.
    next_error: Arc<RwLock<Option<TranscoderError>>>,
    /// If set, the next transcode writes its output and then fails.
    error_after_write: Arc<RwLock<Option<TranscoderError>>>,
    /// Time each transcode spends before writing its output.
    delay: Arc<RwLock<Duration>>,
    /// Extra file each transcode drops next to its output, unknown to the caller.
    stray_file: Arc<RwLock<Option<String>>>,
}

impl Default for MockTranscoder {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTranscoder {
    pub fn new() -> Self {
        Self {
            format: AudioFormat::Mp3,
            jobs: Arc::new(RwLock::new(Vec::new())),
            next_error: Arc::new(RwLock::new(None)),
            error_after_write: Arc::new(RwLock::new(None)),
            delay: Arc::new(RwLock::new(Duration::ZERO)),
            stray_file: Arc::new(RwLock::new(None)),
        }
    }

    pub async fn jobs(&self) -> Vec<TranscodeJob> {
        self.jobs.read().await.clone()
    }

    /// Configure the next transcode to fail with the given error.
    pub async fn set_next_error(&self, error: TranscoderError) {
        *self.next_error.write().await = Some(error);
    }

    /// Configure the next transcode to leave a partial output, then fail.
    pub async fn set_error_after_write(&self, error: TranscoderError) {
        *self.error_after_write.write().await = Some(error);
    }

    /// Make every transcode take at least `delay`.
    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.write().await = delay;
    }

    /// Make every transcode also write `name` into the job's output dir.
    pub async fn set_stray_file(&self, name: &str) {
        *self.stray_file.write().await = Some(name.to_string());
    }
}

#[async_trait]
impl Transcoder for MockTranscoder {
    fn name(&self) -> &str {
        "mock"
    }

    async fn probe(&self, path: &Path) -> Result<MediaInfo, TranscoderError> {
        let metadata =
            tokio::fs::metadata(path)
                .await
                .map_err(|_| TranscoderError::InputNotFound {
                    path: path.to_path_buf(),
                })?;

        Ok(MediaInfo {
            path: path.to_path_buf(),
            size_bytes: metadata.len(),
            duration_secs: 60.0,
            format: "mov".to_string(),
            audio_codec: Some("aac".to_string()),
            audio_bitrate_kbps: Some(128),
            audio_sample_rate: Some(44100),
            audio_channels: Some(2),
            video_codec: Some("h264".to_string()),
        })
    }

    fn output_path(&self, job: &TranscodeJob) -> PathBuf {
        job.output_path(self.format.extension())
    }

    async fn transcode(&self, job: TranscodeJob) -> Result<TranscodeOutput, TranscoderError> {
        self.jobs.write().await.push(job.clone());

        if let Some(err) = self.next_error.write().await.take() {
            return Err(err);
        }

        if !job.input_path.exists() {
            return Err(TranscoderError::InputNotFound {
                path: job.input_path.clone(),
            });
        }

        let delay = *self.delay.read().await;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let output_path = self.output_path(&job);
        tokio::fs::create_dir_all(&job.output_dir).await?;
        tokio::fs::write(&output_path, MOCK_AUDIO).await?;

        if let Some(name) = self.stray_file.read().await.as_ref() {
            tokio::fs::write(job.output_dir.join(name), b"stray").await?;
        }

        if let Some(err) = self.error_after_write.write().await.take() {
            return Err(err);
        }

        let file_name = output_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        Ok(TranscodeOutput {
            output_path,
            file_name,
            size_bytes: MOCK_AUDIO.len() as u64,
            duration_ms: 1,
        })
    }

    async fn validate(&self) -> Result<(), TranscoderError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_transcode_writes_output() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("in.mp4");
        tokio::fs::write(&input, b"video").await.unwrap();

        let transcoder = MockTranscoder::new();
        let output = transcoder
            .transcode(TranscodeJob {
                job_id: "j".to_string(),
                input_path: input,
                source_format: None,
                display_name: "Talk.mp4".to_string(),
                output_dir: dir.path().join("out"),
            })
            .await
            .unwrap();

        assert_eq!(output.file_name, "Talk.mp3");
        assert!(output.output_path.exists());
        assert_eq!(transcoder.jobs().await.len(), 1);
    }
}
