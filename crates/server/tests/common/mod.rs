//! Common test utilities for driving the HTTP API in-process.
//!
//! The router is wired to an orchestrator over `MockStorage` and
//! `MockTranscoder`, so no Google account or ffmpeg is needed.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use driveconv_core::{
    testing::{MockStorage, MockTranscoder},
    Config, ConversionOrchestrator, StorageConfig,
};
use driveconv_server::{create_router, AppState};

pub const VIDEO_ID: &str = "ABC123";
pub const FOLDER_ID: &str = "XYZ789";
pub const VIDEO_URL: &str = "https://drive.google.com/file/d/ABC123/view";
pub const FOLDER_URL: &str = "https://drive.google.com/drive/folders/XYZ789";

/// Test fixture for API testing with mock dependencies.
///
/// # Example
///
/// ```rust,ignore
/// let fixture = TestFixture::new().await;
/// let response = fixture.post("/convert", json!({
///     "video_url": VIDEO_URL,
///     "folder_url": FOLDER_URL,
/// })).await;
/// assert_eq!(response.status, 200);
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Mock storage seeded with one video and one folder
    pub storage: Arc<MockStorage>,
    /// Mock transcoder writing a fixed payload
    pub transcoder: Arc<MockTranscoder>,
    /// Work directory for per-request files
    pub work_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
    pub text: String,
}

impl TestFixture {
    /// Create a new test fixture with the default video and folder seeded.
    pub async fn new() -> Self {
        let work_dir = TempDir::new().expect("Failed to create temp dir");

        let storage = Arc::new(MockStorage::new());
        storage
            .add_file(VIDEO_ID, "My Video.mp4", vec![0u8; 2048])
            .await;
        storage.add_folder(FOLDER_ID).await;
        let transcoder = Arc::new(MockTranscoder::new());

        let config = Config {
            storage: StorageConfig {
                work_dir: work_dir.path().to_path_buf(),
                ..Default::default()
            },
            ..Default::default()
        };

        let orchestrator = Arc::new(ConversionOrchestrator::new(
            storage.clone(),
            transcoder.clone(),
            work_dir.path(),
        ));
        let state = Arc::new(AppState::new(config, orchestrator));

        Self {
            router: create_router(state),
            storage,
            transcoder,
            work_dir,
        }
    }

    pub fn work_dir_is_empty(&self) -> bool {
        is_empty_dir(self.work_dir.path())
    }

    /// Send a GET request.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None, None).await
    }

    /// Send a POST request with a JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        let body = serde_json::to_string(&body).unwrap();
        self.request("POST", path, Some(body), Some("application/json"))
            .await
    }

    /// Send a POST request with raw string body (for testing malformed JSON).
    pub async fn post_raw(&self, path: &str, body: &str) -> TestResponse {
        self.request("POST", path, Some(body.to_string()), Some("application/json"))
            .await
    }

    /// Send a POST request with custom content type.
    pub async fn post_with_content_type(
        &self,
        path: &str,
        body: &str,
        content_type: &str,
    ) -> TestResponse {
        self.request("POST", path, Some(body.to_string()), Some(content_type))
            .await
    }

    async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<String>,
        content_type: Option<&str>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(content_type) = content_type {
            builder = builder.header("Content-Type", content_type);
        }
        let request = builder
            .body(body.map(Body::from).unwrap_or_else(Body::empty))
            .unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let text = String::from_utf8_lossy(&body_bytes).to_string();
        let body = serde_json::from_slice(&body_bytes).unwrap_or(Value::Null);

        TestResponse { status, body, text }
    }
}

fn is_empty_dir(dir: &Path) -> bool {
    std::fs::read_dir(dir)
        .map(|mut entries| entries.next().is_none())
        .unwrap_or(true)
}
