use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;

use super::types::{ClientSecrets, Credentials};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Client secrets file not found: {}", path.display())]
    MissingClientSecrets { path: PathBuf },

    #[error("Invalid client secrets: {0}")]
    InvalidClientSecrets(String),

    #[error("Invalid token file: {0}")]
    InvalidToken(String),

    #[error("Token refresh failed: {0}")]
    RefreshFailed(String),

    #[error("Credentials expired and no refresh token is available")]
    NoRefreshToken,

    #[error("Consent flow failed: {0}")]
    ConsentFailed(String),

    #[error("No usable token and the interactive consent flow is disabled")]
    InteractiveFlowDisabled,

    #[error("Authentication did not succeed after {0} attempts")]
    AttemptsExhausted(usize),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Obtains fresh credentials by asking the user to grant access.
#[async_trait]
pub trait ConsentFlow: Send + Sync {
    /// Run the flow to completion and return the granted credentials.
    async fn obtain(
        &self,
        secrets: &ClientSecrets,
        scopes: &[String],
    ) -> Result<Credentials, AuthError>;

    /// Name of this flow, for logging
    fn name(&self) -> &'static str;
}
