//! Remote storage: metadata lookup, download and upload.

mod drive;
mod error;
mod traits;
mod types;

pub use drive::DriveClient;
pub use error::StorageError;
pub use traits::StorageClient;
pub use types::{content_type_for, temp_download_path, FileMetadata};
