use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Remote file metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMetadata {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub mime_type: Option<String>,
}

/// Local path a remote file is downloaded to. Derived from the identifier so
/// concurrent requests for different files never collide.
pub fn temp_download_path(work_dir: &Path, file_id: &str) -> PathBuf {
    work_dir.join(format!("temp_video_{}.mp4", file_id))
}

/// Content type for an upload, by file extension.
pub fn content_type_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("mp3") => "audio/mpeg",
        Some("m4a") => "audio/mp4",
        Some("ogg") => "audio/ogg",
        Some("opus") => "audio/opus",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_from_drive_json() {
        let meta: FileMetadata = serde_json::from_str(
            r#"{"id": "abc", "name": "Lecture.mp4", "mimeType": "video/mp4"}"#,
        )
        .unwrap();
        assert_eq!(meta.name, "Lecture.mp4");
        assert_eq!(meta.mime_type.as_deref(), Some("video/mp4"));
    }

    #[test]
    fn test_temp_download_path() {
        assert_eq!(
            temp_download_path(Path::new("/work"), "ABC123"),
            PathBuf::from("/work/temp_video_ABC123.mp4")
        );
    }

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for(Path::new("a.mp3")), "audio/mpeg");
        assert_eq!(content_type_for(Path::new("a.MP3")), "audio/mpeg");
        assert_eq!(content_type_for(Path::new("a.opus")), "audio/opus");
        assert_eq!(content_type_for(Path::new("a")), "application/octet-stream");
    }
}
