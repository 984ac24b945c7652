//! Sequential download → transcode → upload pipeline.

use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tokio::task::JoinHandle;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::drive_url::extract_id;
use crate::metrics;
use crate::storage::{temp_download_path, StorageClient};
use crate::transcoder::{TranscodeJob, Transcoder};

use super::types::{
    ConversionRequest, ConversionResult, PipelineError, Stage, StageFailure,
};

/// Runs one conversion request at a time through every stage.
///
/// Stages never retry. Whatever a completed stage left on disk is removed
/// before the result is returned, whether or not a later stage failed.
pub struct ConversionOrchestrator {
    storage: Arc<dyn StorageClient>,
    transcoder: Arc<dyn Transcoder>,
    work_dir: PathBuf,
}

impl ConversionOrchestrator {
    pub fn new(
        storage: Arc<dyn StorageClient>,
        transcoder: Arc<dyn Transcoder>,
        work_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            storage,
            transcoder,
            work_dir: work_dir.into(),
        }
    }

    /// Run a request on its own task.
    ///
    /// Dropping the returned handle does not stop the run, so cleanup still
    /// happens when the caller goes away mid-request.
    pub fn spawn(self: &Arc<Self>, request: ConversionRequest) -> JoinHandle<ConversionResult> {
        let orchestrator = Arc::clone(self);
        tokio::spawn(async move { orchestrator.run(&request).await })
    }

    /// Process a request to completion. Never fails: every problem is folded
    /// into the returned result.
    pub async fn run(&self, request: &ConversionRequest) -> ConversionResult {
        let request_id = Uuid::new_v4().to_string();
        let span = info_span!("conversion", request_id = %request_id);
        self.run_request(request, request_id).instrument(span).await
    }

    async fn run_request(&self, request: &ConversionRequest, request_id: String) -> ConversionResult {
        let request_dir = self.work_dir.join(&request_id);
        let mut artifacts = Vec::new();

        info!(
            video_url = %request.video_url,
            folder_url = %request.folder_url,
            "Conversion started"
        );

        let outcome = self
            .execute(request, &request_id, &request_dir, &mut artifacts)
            .await;

        info!(stage = %Stage::CleaningUp, "Entering stage");
        Self::cleanup(&artifacts, &request_dir).await;

        match &outcome {
            Ok(file_name) => {
                metrics::CONVERSIONS_TOTAL
                    .with_label_values(&["success", Stage::Done.as_str()])
                    .inc();
                info!(stage = %Stage::Done, file_name = %file_name, "Conversion succeeded");
            }
            Err(failure) => {
                metrics::CONVERSIONS_TOTAL
                    .with_label_values(&["failure", failure.stage.as_str()])
                    .inc();
                warn!(
                    stage = %Stage::Done,
                    failed_stage = %failure.stage,
                    kind = failure.error.kind(),
                    "Conversion failed: {}",
                    failure.error
                );
            }
        }

        ConversionResult::from(outcome)
    }

    async fn execute(
        &self,
        request: &ConversionRequest,
        request_id: &str,
        request_dir: &Path,
        artifacts: &mut Vec<PathBuf>,
    ) -> Result<String, StageFailure> {
        run_stage(Stage::Authenticating, async {
            self.storage
                .ensure_authenticated()
                .await
                .map_err(|e| PipelineError::Auth(e.to_string()))
        })
        .await?;

        let (video_id, folder_id) = run_stage(Stage::ExtractingIds, async {
            let video_id = extract_id(request.video_url.as_str());
            let folder_id = extract_id(request.folder_url.as_str());
            match (video_id, folder_id) {
                (Some(video), Some(folder)) => Ok((video, folder)),
                _ => Err(PipelineError::IdExtraction),
            }
        })
        .await?;
        debug!(video_id = %video_id, folder_id = %folder_id, "Extracted identifiers");

        let download_path = temp_download_path(request_dir, &video_id);
        artifacts.push(download_path.clone());

        let metadata = run_stage(Stage::Downloading, async {
            let metadata = self
                .storage
                .fetch_metadata(&video_id)
                .await
                .map_err(PipelineError::from_download)?;
            self.storage
                .download(&video_id, &download_path)
                .await
                .map_err(PipelineError::from_download)?;
            Ok(metadata)
        })
        .await?;

        let job = TranscodeJob {
            job_id: request_id.to_string(),
            input_path: download_path,
            source_format: None,
            display_name: metadata.name,
            output_dir: request_dir.to_path_buf(),
        };
        artifacts.push(self.transcoder.output_path(&job));

        let output = run_stage(Stage::Transcoding, async {
            self.transcoder
                .transcode(job)
                .await
                .map_err(PipelineError::Transcode)
        })
        .await?;

        run_stage(Stage::Uploading, async {
            self.storage
                .upload(&output.output_path, &folder_id)
                .await
                .map_err(PipelineError::from_upload)
        })
        .await?;

        Ok(output.file_name)
    }

    /// Remove every tracked artifact and the request directory. Failures are
    /// logged and otherwise ignored.
    async fn cleanup(artifacts: &[PathBuf], request_dir: &Path) {
        for path in artifacts.iter().rev() {
            match tokio::fs::remove_file(path).await {
                Ok(()) => debug!(path = %path.display(), "Removed local file"),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => warn!(path = %path.display(), "Failed to remove local file: {}", e),
            }
        }

        match tokio::fs::remove_dir(request_dir).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(
                path = %request_dir.display(),
                "Failed to remove request directory: {}",
                e
            ),
        }
    }
}

/// Run one stage, timing it and tagging any failure with the stage.
async fn run_stage<T, F>(stage: Stage, work: F) -> Result<T, StageFailure>
where
    F: Future<Output = Result<T, PipelineError>>,
{
    info!(stage = %stage, "Entering stage");
    let start = Instant::now();
    let result = work.await;
    metrics::STAGE_DURATION
        .with_label_values(&[stage.as_str()])
        .observe(start.elapsed().as_secs_f64());
    result.map_err(|error| StageFailure { stage, error })
}
