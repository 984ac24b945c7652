//! End-to-end tests for the HTTP API over mock storage and transcoder.

mod common;

use std::time::{Duration, Instant};

use axum::http::StatusCode;
use serde_json::json;

use common::{TestFixture, FOLDER_URL, VIDEO_URL};
use driveconv_core::{testing::MockOperation, StorageError};

#[tokio::test]
async fn test_health() {
    let fixture = TestFixture::new().await;

    let response = fixture.get("/").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["message"], "Converter API is running.");
}

#[tokio::test]
async fn test_convert_success() {
    let fixture = TestFixture::new().await;

    let response = fixture
        .post(
            "/convert",
            json!({ "video_url": VIDEO_URL, "folder_url": FOLDER_URL }),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK, "body: {}", response.text);
    assert_eq!(response.body["status"], "success");
    let message = response.body["message"].as_str().unwrap();
    assert!(message.contains("My Video.mp3"), "message: {}", message);

    let uploads = fixture.storage.uploads().await;
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].parent_id, "XYZ789");
    assert!(fixture.work_dir_is_empty());
}

#[tokio::test]
async fn test_convert_malformed_json() {
    let fixture = TestFixture::new().await;

    let response = fixture.post_raw("/convert", "{ not valid json").await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.body["detail"].is_string());
    assert!(fixture.transcoder.jobs().await.is_empty());
}

#[tokio::test]
async fn test_convert_missing_field() {
    let fixture = TestFixture::new().await;

    let response = fixture
        .post("/convert", json!({ "video_url": VIDEO_URL }))
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    let detail = response.body["detail"].as_str().unwrap();
    assert!(detail.contains("folder_url"), "detail: {}", detail);
}

#[tokio::test]
async fn test_convert_invalid_url() {
    let fixture = TestFixture::new().await;

    let response = fixture
        .post(
            "/convert",
            json!({ "video_url": "not a url", "folder_url": FOLDER_URL }),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.body["detail"]
        .as_str()
        .unwrap()
        .contains("video_url"));
    assert_eq!(fixture.storage.download_count().await, 0);
}

#[tokio::test]
async fn test_convert_unsupported_scheme() {
    let fixture = TestFixture::new().await;

    let response = fixture
        .post(
            "/convert",
            json!({ "video_url": "ftp://drive.google.com/file/d/ABC123", "folder_url": FOLDER_URL }),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_convert_wrong_content_type() {
    let fixture = TestFixture::new().await;

    let body = json!({ "video_url": VIDEO_URL, "folder_url": FOLDER_URL }).to_string();
    let response = fixture
        .post_with_content_type("/convert", &body, "text/plain")
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(fixture.storage.uploads().await.is_empty());
}

#[tokio::test]
async fn test_convert_video_not_found() {
    let fixture = TestFixture::new().await;

    let response = fixture
        .post(
            "/convert",
            json!({
                "video_url": "https://drive.google.com/file/d/MISSING/view",
                "folder_url": FOLDER_URL
            }),
        )
        .await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    let detail = response.body["detail"].as_str().unwrap();
    assert!(detail.starts_with("Download failed:"), "detail: {}", detail);
    assert!(fixture.storage.uploads().await.is_empty());
    assert!(fixture.work_dir_is_empty());
}

#[tokio::test]
async fn test_client_disconnect_still_cleans_up() {
    let fixture = TestFixture::new().await;
    fixture
        .transcoder
        .set_delay(Duration::from_millis(300))
        .await;

    let request = fixture.post(
        "/convert",
        json!({ "video_url": VIDEO_URL, "folder_url": FOLDER_URL }),
    );
    let gave_up = tokio::time::timeout(Duration::from_millis(50), request).await;
    assert!(gave_up.is_err(), "request finished before the client hung up");

    let deadline = Instant::now() + Duration::from_secs(5);
    while !fixture.work_dir_is_empty() {
        assert!(Instant::now() < deadline, "request files were never removed");
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(fixture.storage.uploads().await.len(), 1);
}

#[tokio::test]
async fn test_convert_upload_failure() {
    let fixture = TestFixture::new().await;
    fixture
        .storage
        .set_next_error(
            MockOperation::Upload,
            StorageError::Api {
                status: 500,
                message: "backend error".to_string(),
            },
        )
        .await;

    let response = fixture
        .post(
            "/convert",
            json!({ "video_url": VIDEO_URL, "folder_url": FOLDER_URL }),
        )
        .await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response.body["detail"]
        .as_str()
        .unwrap()
        .starts_with("Upload failed:"));
    assert!(fixture.work_dir_is_empty());
}

#[tokio::test]
async fn test_config_is_sanitized() {
    let fixture = TestFixture::new().await;

    let response = fixture.get("/config").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["server"]["port"], 8000);
    assert_eq!(response.body["transcoder"]["bitrate_kbps"], 32);
    assert!(response.body["auth"].get("token_path").is_none());
    assert!(!response.text.contains("client_secret\""));
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let fixture = TestFixture::new().await;
    fixture
        .post(
            "/convert",
            json!({ "video_url": VIDEO_URL, "folder_url": FOLDER_URL }),
        )
        .await;

    let response = fixture.get("/metrics").await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.text.contains("driveconv_conversions_total"));
    assert!(response.text.contains("driveconv_http_requests_total"));
}

#[tokio::test]
async fn test_unknown_route() {
    let fixture = TestFixture::new().await;

    let response = fixture.get("/nope").await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
}
