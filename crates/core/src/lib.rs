pub mod auth;
pub mod config;
pub mod drive_url;
pub mod metrics;
pub mod orchestrator;
pub mod sanitize;
pub mod storage;
pub mod testing;
pub mod transcoder;

pub use auth::{
    authenticate, load_credentials, save_credentials, AuthError, ClientSecrets, ConsentFlow,
    Credentials, LoopbackConsentFlow, OAuthClient,
};
pub use config::{
    load_config, load_config_from_str, load_config_or_default, validate_config, AuthConfig,
    Config, ConfigError, SanitizedConfig, ServerConfig, StorageConfig,
};
pub use drive_url::extract_id;
pub use orchestrator::{
    ConversionOrchestrator, ConversionRequest, ConversionResult, PipelineError, RequestError,
    Stage, StageFailure,
};
pub use sanitize::{sanitize_filename, UNNAMED_FILE};
pub use storage::{DriveClient, FileMetadata, StorageClient, StorageError};
pub use transcoder::{
    AudioFormat, FfmpegTranscoder, MediaInfo, TranscodeJob, TranscodeOutput, Transcoder,
    TranscoderConfig, TranscoderError,
};
