use url::Url;

use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Credential file paths are set
/// - Drive base URLs parse
/// - Transcoder bitrate is not 0
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.auth.token_path.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "auth.token_path cannot be empty".to_string(),
        ));
    }

    if config.auth.client_secrets_path.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "auth.client_secrets_path cannot be empty".to_string(),
        ));
    }

    for (key, value) in [
        ("storage.api_base_url", &config.storage.api_base_url),
        ("storage.upload_base_url", &config.storage.upload_base_url),
    ] {
        Url::parse(value)
            .map_err(|e| ConfigError::ValidationError(format!("{} is invalid: {}", key, e)))?;
    }

    if config.transcoder.bitrate_kbps == 0 {
        return Err(ConfigError::ValidationError(
            "transcoder.bitrate_kbps cannot be 0".to_string(),
        ));
    }

    Ok(())
}
