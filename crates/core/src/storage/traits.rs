use async_trait::async_trait;
use std::path::{Path, PathBuf};

use super::error::StorageError;
use super::types::FileMetadata;

/// Remote file storage the pipeline downloads from and uploads to.
#[async_trait]
pub trait StorageClient: Send + Sync {
    /// Name of this backend, for logging.
    fn name(&self) -> &str;

    /// Make sure the next request carries a usable access token.
    async fn ensure_authenticated(&self) -> Result<(), StorageError>;

    async fn fetch_metadata(&self, file_id: &str) -> Result<FileMetadata, StorageError>;

    /// Download a file's content to `dest_path`, returning the written path.
    ///
    /// No partial file is left behind on failure.
    async fn download(&self, file_id: &str, dest_path: &Path) -> Result<PathBuf, StorageError>;

    /// Upload a local file into the folder `parent_id`, returning the new
    /// remote id. Existing files with the same name are not checked for.
    async fn upload(&self, local_path: &Path, parent_id: &str) -> Result<String, StorageError>;
}
