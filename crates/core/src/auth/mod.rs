//! Google OAuth credentials: loading, refreshing, persisting and, when
//! nothing else works, asking the user.

mod loopback;
mod oauth;
mod store;
mod traits;
mod types;

pub use loopback::LoopbackConsentFlow;
pub use oauth::OAuthClient;
pub use store::{load_client_secrets, load_credentials, remove_credentials, save_credentials};
pub use traits::*;
pub use types::{ClientSecrets, Credentials, DEFAULT_AUTH_URI, DEFAULT_TOKEN_URI, DRIVE_SCOPE};

use chrono::Utc;
use tracing::{info, instrument, warn};

use crate::config::AuthConfig;

/// One pass with the stored token, plus one more after an unusable token has
/// been discarded.
pub const MAX_AUTH_ATTEMPTS: usize = 2;

/// Produce usable credentials for the configured account.
///
/// Reuses a valid stored token, refreshes an expired one, and otherwise runs
/// `consent`. A token that cannot be parsed or refreshed is deleted and the
/// loop tries again; missing client secrets end the loop immediately.
#[instrument(skip_all, fields(token_path = %config.token_path.display()))]
pub async fn authenticate(
    config: &AuthConfig,
    oauth: &OAuthClient,
    consent: &dyn ConsentFlow,
) -> Result<Credentials, AuthError> {
    for attempt in 1..=MAX_AUTH_ATTEMPTS {
        let stored = match load_credentials(&config.token_path).await {
            Ok(stored) => stored,
            Err(AuthError::InvalidToken(reason)) => {
                warn!("Discarding unreadable token file: {}", reason);
                remove_credentials(&config.token_path).await?;
                None
            }
            Err(e) => return Err(e),
        };

        if let Some(credentials) = stored {
            if credentials.is_valid(Utc::now()) {
                info!("Using stored credentials");
                return Ok(credentials);
            }

            if credentials.can_refresh() {
                match oauth.refresh(&credentials).await {
                    Ok(refreshed) => {
                        save_credentials(&config.token_path, &refreshed).await?;
                        info!("Refreshed stored credentials");
                        return Ok(refreshed);
                    }
                    Err(e) => {
                        warn!(attempt, "Token refresh failed, discarding token: {}", e);
                        remove_credentials(&config.token_path).await?;
                        continue;
                    }
                }
            }
        }

        let secrets = load_client_secrets(&config.client_secrets_path).await?;
        if !config.interactive {
            return Err(AuthError::InteractiveFlowDisabled);
        }

        info!(flow = consent.name(), "Starting consent flow");
        let credentials = consent.obtain(&secrets, &config.scopes).await?;
        save_credentials(&config.token_path, &credentials).await?;
        info!("Saved new credentials");
        return Ok(credentials);
    }

    Err(AuthError::AttemptsExhausted(MAX_AUTH_ATTEMPTS))
}
