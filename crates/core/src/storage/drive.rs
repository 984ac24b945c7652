//! Google Drive v3 storage backend.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::{CONTENT_TYPE, LOCATION};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use crate::auth::{save_credentials, Credentials, OAuthClient};
use crate::config::StorageConfig;
use crate::metrics;

use super::error::StorageError;
use super::traits::StorageClient;
use super::types::{content_type_for, FileMetadata};

#[derive(Debug, Deserialize)]
struct GoogleErrorBody {
    error: GoogleError,
}

#[derive(Debug, Deserialize)]
struct GoogleError {
    message: String,
    #[serde(default)]
    errors: Vec<GoogleErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct GoogleErrorDetail {
    #[serde(default)]
    reason: String,
}

/// 403 reasons that mean the credentials lack access, as opposed to quota
/// and rate limits which Drive also reports as 403.
const AUTH_REASONS: &[&str] = &[
    "authError",
    "insufficientPermissions",
    "insufficientFilePermissions",
    "appNotAuthorizedToFile",
    "domainPolicy",
    "forbidden",
];

fn is_auth_rejection(status: StatusCode, reasons: &[String]) -> bool {
    match status {
        StatusCode::UNAUTHORIZED => true,
        // A bare 403 without reasons is treated as a permission problem
        StatusCode::FORBIDDEN => {
            reasons.is_empty() || reasons.iter().any(|r| AUTH_REASONS.contains(&r.as_str()))
        }
        _ => false,
    }
}

#[derive(Debug, Deserialize)]
struct CreatedFile {
    id: String,
    #[serde(default)]
    name: Option<String>,
}

/// Drive v3 REST client.
pub struct DriveClient {
    client: Client,
    config: StorageConfig,
    oauth: OAuthClient,
    /// Current credentials; replaced in place when the access token is refreshed.
    credentials: Arc<RwLock<Credentials>>,
    /// Where refreshed credentials are persisted, if anywhere.
    token_path: Option<PathBuf>,
}

impl DriveClient {
    pub fn new(config: StorageConfig, credentials: Credentials) -> Result<Self, StorageError> {
        // Idle limit only: a transfer that keeps receiving bytes may take as long as it needs
        let idle = Duration::from_secs(config.timeout_secs);
        let client = Client::builder()
            .connect_timeout(idle)
            .read_timeout(idle)
            .build()?;

        Ok(Self {
            oauth: OAuthClient::with_client(client.clone()),
            client,
            config,
            credentials: Arc::new(RwLock::new(credentials)),
            token_path: None,
        })
    }

    /// Persist refreshed credentials to `path`.
    pub fn with_token_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.token_path = Some(path.into());
        self
    }

    fn api_url(&self) -> &str {
        self.config.api_base_url.trim_end_matches('/')
    }

    fn upload_url(&self) -> &str {
        self.config.upload_base_url.trim_end_matches('/')
    }

    async fn access_token(&self) -> Result<String, StorageError> {
        self.ensure_authenticated().await?;
        Ok(self.credentials.read().await.access_token.clone())
    }

    /// Map non-success responses to errors; `subject` names what was asked for.
    async fn check_status(response: Response, subject: &str) -> Result<Response, StorageError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let (message, reasons): (String, Vec<String>) = match serde_json::from_str::<GoogleErrorBody>(&body) {
            Ok(parsed) => (
                parsed.error.message,
                parsed
                    .error
                    .errors
                    .into_iter()
                    .map(|d| d.reason)
                    .filter(|r| !r.is_empty())
                    .collect(),
            ),
            Err(_) => (body.chars().take(200).collect(), Vec::new()),
        };

        if status == StatusCode::NOT_FOUND {
            return Err(StorageError::NotFound(subject.to_string()));
        }
        if is_auth_rejection(status, &reasons) {
            return Err(StorageError::Unauthorized(message));
        }
        if !reasons.is_empty() {
            debug!(status = status.as_u16(), reasons = ?reasons, "Drive request rejected");
        }
        Err(StorageError::Api {
            status: status.as_u16(),
            message,
        })
    }

    async fn stream_to_file(
        mut response: Response,
        dest_path: &Path,
    ) -> Result<u64, StorageError> {
        let total = response.content_length().filter(|len| *len > 0);
        let file = tokio::fs::File::create(dest_path).await?;
        let mut writer = BufWriter::new(file);
        let mut written: u64 = 0;
        let mut last_logged_decile = 0;

        while let Some(chunk) = response.chunk().await? {
            writer.write_all(&chunk).await?;
            written += chunk.len() as u64;

            if let Some(total) = total {
                let decile = (written * 10 / total).min(10);
                if decile > last_logged_decile {
                    last_logged_decile = decile;
                    debug!("Download {}%", decile * 10);
                }
            }
        }

        writer.flush().await?;
        Ok(written)
    }
}

#[async_trait]
impl StorageClient for DriveClient {
    fn name(&self) -> &str {
        "google_drive"
    }

    async fn ensure_authenticated(&self) -> Result<(), StorageError> {
        if self.credentials.read().await.is_valid(Utc::now()) {
            return Ok(());
        }

        let mut credentials = self.credentials.write().await;
        // Another request may have refreshed while we waited for the lock
        if credentials.is_valid(Utc::now()) {
            return Ok(());
        }
        if !credentials.can_refresh() {
            return Err(StorageError::Unauthorized(
                "access token expired and cannot be refreshed".to_string(),
            ));
        }

        let refreshed = self.oauth.refresh(&credentials).await?;
        info!("Refreshed Drive access token");

        if let Some(path) = &self.token_path {
            if let Err(e) = save_credentials(path, &refreshed).await {
                warn!("Failed to persist refreshed credentials: {}", e);
            }
        }

        *credentials = refreshed;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn fetch_metadata(&self, file_id: &str) -> Result<FileMetadata, StorageError> {
        let token = self.access_token().await?;
        let url = format!("{}/files/{}", self.api_url(), urlencoding::encode(file_id));

        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .query(&[("fields", "id,name,mimeType"), ("supportsAllDrives", "true")])
            .send()
            .await?;
        let response = Self::check_status(response, file_id).await?;

        response
            .json::<FileMetadata>()
            .await
            .map_err(|e| StorageError::InvalidResponse(e.to_string()))
    }

    #[instrument(skip(self, dest_path))]
    async fn download(&self, file_id: &str, dest_path: &Path) -> Result<PathBuf, StorageError> {
        let token = self.access_token().await?;
        let url = format!("{}/files/{}", self.api_url(), urlencoding::encode(file_id));

        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .query(&[("alt", "media"), ("supportsAllDrives", "true")])
            .send()
            .await?;
        let response = Self::check_status(response, file_id).await?;

        if let Some(parent) = dest_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        match Self::stream_to_file(response, dest_path).await {
            Ok(bytes) => {
                metrics::BYTES_TRANSFERRED
                    .with_label_values(&["download"])
                    .inc_by(bytes);
                info!(bytes, path = %dest_path.display(), "Download complete");
                Ok(dest_path.to_path_buf())
            }
            Err(e) => {
                if let Err(remove_err) = tokio::fs::remove_file(dest_path).await {
                    if remove_err.kind() != std::io::ErrorKind::NotFound {
                        warn!("Failed to remove partial download: {}", remove_err);
                    }
                }
                Err(e)
            }
        }
    }

    #[instrument(skip(self, local_path), fields(path = %local_path.display()))]
    async fn upload(&self, local_path: &Path, parent_id: &str) -> Result<String, StorageError> {
        let token = self.access_token().await?;

        let name = local_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| {
                StorageError::InvalidResponse(format!(
                    "not a file path: {}",
                    local_path.display()
                ))
            })?;
        let size = tokio::fs::metadata(local_path).await?.len();
        let content_type = content_type_for(local_path);

        // Start a resumable session; the session URI comes back in Location
        let response = self
            .client
            .post(format!("{}/files", self.upload_url()))
            .bearer_auth(&token)
            .query(&[("uploadType", "resumable"), ("supportsAllDrives", "true")])
            .header("X-Upload-Content-Type", content_type)
            .header("X-Upload-Content-Length", size)
            .json(&serde_json::json!({ "name": name, "parents": [parent_id] }))
            .send()
            .await?;
        let response = Self::check_status(response, parent_id).await?;

        let session_uri = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| {
                StorageError::InvalidResponse("resumable upload returned no Location".to_string())
            })?;

        let body = tokio::fs::read(local_path).await?;
        let response = self
            .client
            .put(&session_uri)
            .header(CONTENT_TYPE, content_type)
            .body(body)
            .send()
            .await?;
        let response = Self::check_status(response, &name).await?;

        let created: CreatedFile = response
            .json()
            .await
            .map_err(|e| StorageError::InvalidResponse(e.to_string()))?;

        metrics::BYTES_TRANSFERRED
            .with_label_values(&["upload"])
            .inc_by(size);
        info!(
            file_id = %created.id,
            name = created.name.as_deref().unwrap_or(&name),
            "Upload complete"
        );

        Ok(created.id)
    }
}
