//! Mock consent flow for testing.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::auth::{AuthError, ClientSecrets, ConsentFlow, Credentials};

/// Consent flow that hands out preset credentials instead of asking anyone.
#[derive(Debug, Default)]
pub struct MockConsentFlow {
    credentials: Arc<RwLock<Option<Credentials>>>,
    calls: Arc<AtomicUsize>,
}

impl MockConsentFlow {
    /// A flow that grants `credentials`.
    pub fn granting(credentials: Credentials) -> Self {
        Self {
            credentials: Arc::new(RwLock::new(Some(credentials))),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// A flow where the user never grants access.
    pub fn denying() -> Self {
        Self::default()
    }

    /// How many times the flow has been run.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConsentFlow for MockConsentFlow {
    async fn obtain(
        &self,
        _secrets: &ClientSecrets,
        _scopes: &[String],
    ) -> Result<Credentials, AuthError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.credentials
            .read()
            .await
            .clone()
            .ok_or_else(|| AuthError::ConsentFailed("access_denied".to_string()))
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
