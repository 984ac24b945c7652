//! Reading and writing the on-disk credential files.

use std::io::ErrorKind;
use std::path::Path;

use tracing::debug;

use super::types::{ClientSecrets, ClientSecretsFile, Credentials};
use super::AuthError;

/// Loads stored credentials. A missing file is not an error.
pub async fn load_credentials(path: &Path) -> Result<Option<Credentials>, AuthError> {
    let raw = match tokio::fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(AuthError::Io(e)),
    };

    let credentials = serde_json::from_str(&raw)
        .map_err(|e| AuthError::InvalidToken(format!("{}: {}", path.display(), e)))?;

    Ok(Some(credentials))
}

/// Persists credentials so the next process start can reuse them.
pub async fn save_credentials(path: &Path, credentials: &Credentials) -> Result<(), AuthError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    let json = serde_json::to_string_pretty(credentials)
        .map_err(|e| AuthError::InvalidToken(e.to_string()))?;
    tokio::fs::write(path, json).await?;

    debug!("Saved credentials to {}", path.display());
    Ok(())
}

/// Deletes stored credentials. A missing file is not an error.
pub async fn remove_credentials(path: &Path) -> Result<(), AuthError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(AuthError::Io(e)),
    }
}

/// Loads the OAuth client registration.
pub async fn load_client_secrets(path: &Path) -> Result<ClientSecrets, AuthError> {
    let raw = match tokio::fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(AuthError::MissingClientSecrets {
                path: path.to_path_buf(),
            })
        }
        Err(e) => return Err(AuthError::Io(e)),
    };

    let file: ClientSecretsFile = serde_json::from_str(&raw)
        .map_err(|e| AuthError::InvalidClientSecrets(e.to_string()))?;

    file.installed.or(file.web).ok_or_else(|| {
        AuthError::InvalidClientSecrets(
            "expected an \"installed\" or \"web\" client section".to_string(),
        )
    })
}
