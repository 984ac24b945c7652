//! Mock storage backend for testing.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::storage::{FileMetadata, StorageClient, StorageError};

/// Operations that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOperation {
    Authenticate,
    FetchMetadata,
    Download,
    Upload,
}

/// A recorded upload for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedUpload {
    /// Remote id assigned to the new file.
    pub remote_id: String,
    /// Base name of the uploaded local file.
    pub name: String,
    pub parent_id: String,
    pub contents: Vec<u8>,
}

#[derive(Debug, Clone)]
struct MockFile {
    name: String,
    contents: Vec<u8>,
}

/// In-memory implementation of the StorageClient trait.
///
/// Files and folders must be registered before use; anything else is
/// reported as not found, like the real provider would.
///
/// # Example
///
/// ```rust,ignore
/// use driveconv_core::testing::MockStorage;
///
/// let storage = MockStorage::new();
/// storage.add_file("ABC123", "Lecture.mp4", b"video".to_vec()).await;
/// storage.add_folder("XYZ789").await;
///
/// // ... run the orchestrator ...
///
/// let uploads = storage.uploads().await;
/// assert_eq!(uploads[0].parent_id, "XYZ789");
/// ```
#[derive(Debug)]
pub struct MockStorage {
    files: Arc<RwLock<HashMap<String, MockFile>>>,
    folders: Arc<RwLock<HashSet<String>>>,
    /// Ids passed to `download`, in call order.
    downloads: Arc<RwLock<Vec<String>>>,
    uploads: Arc<RwLock<Vec<RecordedUpload>>>,
    /// One-shot failures per operation.
    next_errors: Arc<RwLock<HashMap<MockOperation, StorageError>>>,
}

impl Default for MockStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl MockStorage {
    pub fn new() -> Self {
        Self {
            files: Arc::new(RwLock::new(HashMap::new())),
            folders: Arc::new(RwLock::new(HashSet::new())),
            downloads: Arc::new(RwLock::new(Vec::new())),
            uploads: Arc::new(RwLock::new(Vec::new())),
            next_errors: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Register a downloadable file.
    pub async fn add_file(&self, id: &str, name: &str, contents: Vec<u8>) {
        self.files.write().await.insert(
            id.to_string(),
            MockFile {
                name: name.to_string(),
                contents,
            },
        );
    }

    /// Register a folder uploads may target.
    pub async fn add_folder(&self, id: &str) {
        self.folders.write().await.insert(id.to_string());
    }

    /// Make the next call of `operation` fail with `error`.
    pub async fn set_next_error(&self, operation: MockOperation, error: StorageError) {
        self.next_errors.write().await.insert(operation, error);
    }

    pub async fn uploads(&self) -> Vec<RecordedUpload> {
        self.uploads.read().await.clone()
    }

    pub async fn download_count(&self) -> usize {
        self.downloads.read().await.len()
    }

    async fn take_error(&self, operation: MockOperation) -> Option<StorageError> {
        self.next_errors.write().await.remove(&operation)
    }

    async fn file(&self, id: &str) -> Result<MockFile, StorageError> {
        self.files
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(id.to_string()))
    }
}

#[async_trait]
impl StorageClient for MockStorage {
    fn name(&self) -> &str {
        "mock"
    }

    async fn ensure_authenticated(&self) -> Result<(), StorageError> {
        match self.take_error(MockOperation::Authenticate).await {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn fetch_metadata(&self, file_id: &str) -> Result<FileMetadata, StorageError> {
        if let Some(err) = self.take_error(MockOperation::FetchMetadata).await {
            return Err(err);
        }

        let file = self.file(file_id).await?;
        Ok(FileMetadata {
            id: file_id.to_string(),
            name: file.name,
            mime_type: Some("video/mp4".to_string()),
        })
    }

    async fn download(&self, file_id: &str, dest_path: &Path) -> Result<PathBuf, StorageError> {
        self.downloads.write().await.push(file_id.to_string());

        if let Some(err) = self.take_error(MockOperation::Download).await {
            return Err(err);
        }

        let file = self.file(file_id).await?;
        if let Some(parent) = dest_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(dest_path, &file.contents).await?;

        Ok(dest_path.to_path_buf())
    }

    async fn upload(&self, local_path: &Path, parent_id: &str) -> Result<String, StorageError> {
        if let Some(err) = self.take_error(MockOperation::Upload).await {
            return Err(err);
        }

        if !self.folders.read().await.contains(parent_id) {
            return Err(StorageError::NotFound(parent_id.to_string()));
        }

        let contents = tokio::fs::read(local_path).await?;
        let name = local_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        let mut uploads = self.uploads.write().await;
        let remote_id = format!("uploaded-{}", uploads.len() + 1);
        uploads.push(RecordedUpload {
            remote_id: remote_id.clone(),
            name,
            parent_id: parent_id.to_string(),
            contents,
        });

        Ok(remote_id)
    }
}
