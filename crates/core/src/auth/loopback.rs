//! Installed-app consent flow with a loopback redirect.
//!
//! A one-route HTTP server is bound on `127.0.0.1`, the user is pointed at
//! Google's consent page, and the authorization code arrives on the redirect.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::{Query, State};
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::sync::{oneshot, Mutex};
use tracing::{info, warn};

use super::oauth::OAuthClient;
use super::traits::{AuthError, ConsentFlow};
use super::types::{ClientSecrets, Credentials};

const COMPLETION_MESSAGE: &str =
    "The authentication flow has completed. You may close this window.";

#[derive(Debug, Deserialize)]
struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

type CallbackSender = Arc<Mutex<Option<oneshot::Sender<CallbackParams>>>>;

async fn handle_callback(
    State(sender): State<CallbackSender>,
    Query(params): Query<CallbackParams>,
) -> &'static str {
    if let Some(tx) = sender.lock().await.take() {
        let _ = tx.send(params);
    }
    COMPLETION_MESSAGE
}

/// Browser consent via a local redirect listener.
pub struct LoopbackConsentFlow {
    oauth: OAuthClient,
    port: u16,
    timeout: Duration,
}

impl LoopbackConsentFlow {
    /// `port` 0 lets the OS pick a free port.
    pub fn new(oauth: OAuthClient, port: u16) -> Self {
        Self {
            oauth,
            port,
            timeout: Duration::from_secs(300),
        }
    }

    /// How long to wait for the user to finish in the browser.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl ConsentFlow for LoopbackConsentFlow {
    async fn obtain(
        &self,
        secrets: &ClientSecrets,
        scopes: &[String],
    ) -> Result<Credentials, AuthError> {
        let listener =
            TcpListener::bind(SocketAddr::from((Ipv4Addr::LOCALHOST, self.port))).await?;
        let port = listener.local_addr()?.port();
        let redirect_uri = format!("http://127.0.0.1:{}/", port);

        let (callback_tx, callback_rx) = oneshot::channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let sender: CallbackSender = Arc::new(Mutex::new(Some(callback_tx)));

        let app = Router::new()
            .route("/", get(handle_callback))
            .with_state(sender);

        let server = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
        });

        let state = uuid::Uuid::new_v4().to_string();
        let auth_url = OAuthClient::authorization_url(secrets, &redirect_uri, scopes, &state)?;

        println!("Please visit this URL to authorize this application: {}", auth_url);
        info!(redirect_uri = %redirect_uri, "Waiting for OAuth consent");

        let received = tokio::time::timeout(self.timeout, callback_rx).await;

        let _ = shutdown_tx.send(());
        if let Err(e) = server.await {
            warn!("Consent listener task failed: {}", e);
        }

        let params = match received {
            Ok(Ok(params)) => params,
            Ok(Err(_)) => {
                return Err(AuthError::ConsentFailed(
                    "redirect listener closed before a response arrived".to_string(),
                ))
            }
            Err(_) => {
                return Err(AuthError::ConsentFailed(format!(
                    "no response within {} seconds",
                    self.timeout.as_secs()
                )))
            }
        };

        if let Some(error) = params.error {
            return Err(AuthError::ConsentFailed(error));
        }
        if params.state.as_deref() != Some(state.as_str()) {
            return Err(AuthError::ConsentFailed("state mismatch".to_string()));
        }
        let code = params
            .code
            .ok_or_else(|| AuthError::ConsentFailed("missing authorization code".to_string()))?;

        self.oauth
            .exchange_code(secrets, &code, &redirect_uri, scopes)
            .await
    }

    fn name(&self) -> &'static str {
        "loopback"
    }
}
