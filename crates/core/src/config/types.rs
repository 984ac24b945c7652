use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

use crate::auth::DRIVE_SCOPE;
use crate::transcoder::{AudioFormat, TranscoderConfig};

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub transcoder: TranscoderConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    8000
}

/// Google OAuth configuration.
///
/// Both files use the formats written by Google's own client libraries, so an
/// existing `token.json` from another tool can be reused as-is.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    /// OAuth client secrets downloaded from the Cloud console.
    #[serde(default = "default_client_secrets_path")]
    pub client_secrets_path: PathBuf,
    /// Where the authorized-user token is read from and persisted to.
    #[serde(default = "default_token_path")]
    pub token_path: PathBuf,
    /// Whether the browser consent flow may run when no usable token exists.
    #[serde(default = "default_interactive")]
    pub interactive: bool,
    /// Loopback port for the consent redirect (0 picks a free port).
    #[serde(default)]
    pub redirect_port: u16,
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            client_secrets_path: default_client_secrets_path(),
            token_path: default_token_path(),
            interactive: default_interactive(),
            redirect_port: 0,
            scopes: default_scopes(),
        }
    }
}

fn default_client_secrets_path() -> PathBuf {
    PathBuf::from("credentials.json")
}

fn default_token_path() -> PathBuf {
    PathBuf::from("token.json")
}

fn default_interactive() -> bool {
    true
}

fn default_scopes() -> Vec<String> {
    vec![DRIVE_SCOPE.to_string()]
}

/// Drive API configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Drive v3 metadata/media base URL
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Drive v3 upload base URL
    #[serde(default = "default_upload_base_url")]
    pub upload_base_url: String,
    /// Connect and idle-read timeout in seconds (default: 300). Transfers that
    /// keep receiving data are never cut off.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Directory for per-request downloads and transcodes
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            upload_base_url: default_upload_base_url(),
            timeout_secs: default_timeout(),
            work_dir: default_work_dir(),
        }
    }
}

fn default_api_base_url() -> String {
    "https://www.googleapis.com/drive/v3".to_string()
}

fn default_upload_base_url() -> String {
    "https://www.googleapis.com/upload/drive/v3".to_string()
}

fn default_timeout() -> u64 {
    300
}

fn default_work_dir() -> PathBuf {
    std::env::temp_dir().join("driveconv")
}

/// Sanitized config for API responses (credential file locations hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub auth: SanitizedAuthConfig,
    pub storage: SanitizedStorageConfig,
    pub transcoder: SanitizedTranscoderConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedAuthConfig {
    pub interactive: bool,
    pub scopes: Vec<String>,
    pub client_secrets_configured: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedStorageConfig {
    pub api_base_url: String,
    pub upload_base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedTranscoderConfig {
    pub format: AudioFormat,
    pub bitrate_kbps: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channels: Option<u8>,
    pub timeout_secs: u64,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            auth: SanitizedAuthConfig {
                interactive: config.auth.interactive,
                scopes: config.auth.scopes.clone(),
                client_secrets_configured: !config.auth.client_secrets_path.as_os_str().is_empty(),
            },
            storage: SanitizedStorageConfig {
                api_base_url: config.storage.api_base_url.clone(),
                upload_base_url: config.storage.upload_base_url.clone(),
                timeout_secs: config.storage.timeout_secs,
            },
            transcoder: SanitizedTranscoderConfig {
                format: config.transcoder.format.clone(),
                bitrate_kbps: config.transcoder.bitrate_kbps,
                channels: config.transcoder.channels,
                timeout_secs: config.transcoder.timeout_secs,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.server.host.to_string(), "0.0.0.0");
        assert_eq!(config.auth.token_path, PathBuf::from("token.json"));
        assert_eq!(
            config.auth.client_secrets_path,
            PathBuf::from("credentials.json")
        );
        assert!(config.auth.interactive);
        assert_eq!(config.auth.scopes, vec![DRIVE_SCOPE.to_string()]);
        assert_eq!(config.transcoder.bitrate_kbps, 32);
    }

    #[test]
    fn test_deserialize_full_config() {
        let toml = r#"
[server]
host = "127.0.0.1"
port = 9000

[auth]
client_secrets_path = "/etc/driveconv/credentials.json"
token_path = "/var/lib/driveconv/token.json"
interactive = false
redirect_port = 8765

[storage]
api_base_url = "http://localhost:1234/drive/v3"
timeout_secs = 60
work_dir = "/tmp/work"

[transcoder]
bitrate_kbps = 64
channels = 1
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.port, 9000);
        assert!(!config.auth.interactive);
        assert_eq!(config.auth.redirect_port, 8765);
        assert_eq!(config.storage.api_base_url, "http://localhost:1234/drive/v3");
        assert_eq!(
            config.storage.upload_base_url,
            "https://www.googleapis.com/upload/drive/v3"
        );
        assert_eq!(config.storage.timeout_secs, 60);
        assert_eq!(config.storage.work_dir, PathBuf::from("/tmp/work"));
        assert_eq!(config.transcoder.bitrate_kbps, 64);
        assert_eq!(config.transcoder.channels, Some(1));
    }

    #[test]
    fn test_sanitized_config() {
        let config = Config::default();
        let sanitized = SanitizedConfig::from(&config);
        assert_eq!(sanitized.server.port, 8000);
        assert!(sanitized.auth.client_secrets_configured);
        assert_eq!(sanitized.transcoder.bitrate_kbps, 32);

        let json = serde_json::to_value(&sanitized).unwrap();
        assert!(json["auth"].get("token_path").is_none());
        assert!(json["auth"].get("client_secrets_path").is_none());
    }
}
