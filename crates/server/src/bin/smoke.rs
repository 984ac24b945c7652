//! One-shot conversion of a fixed video into a fixed folder.
//!
//! Prints the result as JSON and exits non-zero when the conversion failed.

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::error;

use driveconv_core::{load_config_or_default, validate_config, ConversionRequest};
use driveconv_server::{bootstrap::build_orchestrator, telemetry};

const DEFAULT_VIDEO_URL: &str =
    "https://drive.google.com/file/d/17IlHTmWUGf3yOAlzO4Nnx7ANX3EjQSX4/view?usp=sharing";
const DEFAULT_FOLDER_URL: &str =
    "https://drive.google.com/drive/folders/17We1iX19Osse1tSX3JIg3DicwqKIUlmR?usp=sharing";

#[tokio::main]
async fn main() {
    match run().await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            error!("Fatal error: {:#}", e);
            std::process::exit(1);
        }
    }
}

async fn run() -> Result<bool> {
    telemetry::init_tracing();

    let config_path = std::env::var("DRIVECONV_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));
    let config = load_config_or_default(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;
    validate_config(&config).context("Configuration validation failed")?;

    let video_url = std::env::var("DRIVECONV_SMOKE_VIDEO_URL")
        .unwrap_or_else(|_| DEFAULT_VIDEO_URL.to_string());
    let folder_url = std::env::var("DRIVECONV_SMOKE_FOLDER_URL")
        .unwrap_or_else(|_| DEFAULT_FOLDER_URL.to_string());
    let request = ConversionRequest::new(&video_url, &folder_url)
        .context("Invalid smoke test URLs")?;

    let orchestrator = build_orchestrator(&config).await?;
    let result = orchestrator.run(&request).await;

    let output = serde_json::to_string_pretty(&result).context("Failed to encode result")?;
    println!("{}", output);

    Ok(result.success)
}
