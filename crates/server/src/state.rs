use std::sync::Arc;

use driveconv_core::{Config, ConversionOrchestrator, SanitizedConfig};

/// Shared application state
pub struct AppState {
    config: Config,
    orchestrator: Arc<ConversionOrchestrator>,
}

impl AppState {
    pub fn new(config: Config, orchestrator: Arc<ConversionOrchestrator>) -> Self {
        Self {
            config,
            orchestrator,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn orchestrator(&self) -> &Arc<ConversionOrchestrator> {
        &self.orchestrator
    }
}
