//! Builds a ready-to-run orchestrator from configuration.
//!
//! Shared by the HTTP server and the smoke harness so both authenticate
//! exactly the same way at startup.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, warn};

use driveconv_core::{
    authenticate, Config, ConversionOrchestrator, DriveClient, FfmpegTranscoder,
    LoopbackConsentFlow, OAuthClient, Transcoder,
};

pub async fn build_orchestrator(config: &Config) -> Result<ConversionOrchestrator> {
    let oauth = OAuthClient::new(Duration::from_secs(config.storage.timeout_secs))
        .context("Failed to create OAuth client")?;
    let consent = LoopbackConsentFlow::new(oauth.clone(), config.auth.redirect_port);

    let credentials = authenticate(&config.auth, &oauth, &consent)
        .await
        .context("Failed to authenticate with Google Drive")?;
    info!("Authenticated with Google Drive");

    let storage = DriveClient::new(config.storage.clone(), credentials)
        .context("Failed to create Drive client")?
        .with_token_path(&config.auth.token_path);

    let transcoder = FfmpegTranscoder::new(config.transcoder.clone());
    match transcoder.validate().await {
        Ok(()) => info!(transcoder = transcoder.name(), "Transcoder available"),
        Err(e) => warn!("Transcoder check failed, conversions will fail: {}", e),
    }

    tokio::fs::create_dir_all(&config.storage.work_dir)
        .await
        .with_context(|| {
            format!(
                "Failed to create work directory {:?}",
                config.storage.work_dir
            )
        })?;

    Ok(ConversionOrchestrator::new(
        Arc::new(storage),
        Arc::new(transcoder),
        config.storage.work_dir.clone(),
    ))
}
