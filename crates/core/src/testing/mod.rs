//! Test doubles for the storage, transcoder and consent seams.
//!
//! Lets the orchestrator and HTTP layer run end to end without Google or
//! ffmpeg.
//!
//! # Example
//!
//! ```rust,ignore
//! use driveconv_core::testing::{MockStorage, MockTranscoder};
//!
//! let storage = Arc::new(MockStorage::new());
//! storage.add_file("ABC123", "Lecture.mp4", b"video".to_vec()).await;
//! storage.add_folder("XYZ789").await;
//!
//! let orchestrator = ConversionOrchestrator::new(
//!     storage.clone(),
//!     Arc::new(MockTranscoder::new()),
//!     work_dir,
//! );
//! ```

mod mock_consent;
mod mock_storage;
mod mock_transcoder;

pub use mock_consent::MockConsentFlow;
pub use mock_storage::{MockOperation, MockStorage, RecordedUpload};
pub use mock_transcoder::MockTranscoder;

/// Test fixtures and helper functions.
pub mod fixtures {
    use chrono::{Duration, Utc};

    use crate::auth::{Credentials, DEFAULT_TOKEN_URI, DRIVE_SCOPE};

    /// Credentials whose access token is good for another hour.
    pub fn valid_credentials() -> Credentials {
        Credentials {
            access_token: "ya29.valid".to_string(),
            refresh_token: Some("1//refresh".to_string()),
            token_uri: DEFAULT_TOKEN_URI.to_string(),
            client_id: "client-id.apps.googleusercontent.com".to_string(),
            client_secret: "client-secret".to_string(),
            scopes: vec![DRIVE_SCOPE.to_string()],
            expiry: Some(Utc::now() + Duration::hours(1)),
        }
    }

    /// Credentials that expired an hour ago, refreshable at `token_uri`.
    pub fn expired_credentials(token_uri: &str) -> Credentials {
        Credentials {
            access_token: "ya29.expired".to_string(),
            token_uri: token_uri.to_string(),
            expiry: Some(Utc::now() - Duration::hours(1)),
            ..valid_credentials()
        }
    }

    /// An "installed app" client secrets file body.
    pub fn client_secrets_json(token_uri: &str) -> String {
        serde_json::json!({
            "installed": {
                "client_id": "client-id.apps.googleusercontent.com",
                "client_secret": "client-secret",
                "auth_uri": "https://accounts.google.com/o/oauth2/auth",
                "token_uri": token_uri,
                "redirect_uris": ["http://localhost"]
            }
        })
        .to_string()
    }
}
