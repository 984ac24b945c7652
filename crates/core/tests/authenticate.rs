//! Startup authentication: token reuse, refresh, and the consent fallback.

use std::path::Path;
use std::time::Duration;

use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use driveconv_core::{
    auth::remove_credentials, authenticate, load_credentials, save_credentials,
    testing::{fixtures, MockConsentFlow},
    AuthConfig, AuthError, Credentials, OAuthClient,
};

fn auth_config(dir: &Path, interactive: bool) -> AuthConfig {
    AuthConfig {
        client_secrets_path: dir.join("credentials.json"),
        token_path: dir.join("token.json"),
        interactive,
        ..Default::default()
    }
}

fn oauth() -> OAuthClient {
    OAuthClient::new(Duration::from_secs(5)).unwrap()
}

fn granted() -> Credentials {
    Credentials {
        access_token: "ya29.consented".to_string(),
        ..fixtures::valid_credentials()
    }
}

async fn write_client_secrets(dir: &Path, token_uri: &str) {
    tokio::fs::write(
        dir.join("credentials.json"),
        fixtures::client_secrets_json(token_uri),
    )
    .await
    .unwrap();
}

#[tokio::test]
async fn test_valid_token_is_reused() {
    let dir = TempDir::new().unwrap();
    let config = auth_config(dir.path(), true);
    let stored = fixtures::valid_credentials();
    save_credentials(&config.token_path, &stored).await.unwrap();
    let consent = MockConsentFlow::granting(granted());

    let credentials = authenticate(&config, &oauth(), &consent).await.unwrap();

    assert_eq!(credentials, stored);
    assert_eq!(consent.call_count(), 0);
}

#[tokio::test]
async fn test_expired_token_is_refreshed_and_saved() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "ya29.refreshed",
            "expires_in": 3599
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = auth_config(dir.path(), true);
    let expired = fixtures::expired_credentials(&format!("{}/token", server.uri()));
    save_credentials(&config.token_path, &expired).await.unwrap();
    let consent = MockConsentFlow::granting(granted());

    let credentials = authenticate(&config, &oauth(), &consent).await.unwrap();

    assert_eq!(credentials.access_token, "ya29.refreshed");
    assert_eq!(consent.call_count(), 0);
    let saved = load_credentials(&config.token_path).await.unwrap().unwrap();
    assert_eq!(saved.access_token, "ya29.refreshed");
    assert_eq!(saved.refresh_token, expired.refresh_token);
}

#[tokio::test]
async fn test_failed_refresh_falls_back_to_consent_once() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": "invalid_grant",
            "error_description": "Token has been expired or revoked."
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let token_uri = format!("{}/token", server.uri());
    let config = auth_config(dir.path(), true);
    write_client_secrets(dir.path(), &token_uri).await;
    save_credentials(&config.token_path, &fixtures::expired_credentials(&token_uri))
        .await
        .unwrap();
    let consent = MockConsentFlow::granting(granted());

    let credentials = authenticate(&config, &oauth(), &consent).await.unwrap();

    assert_eq!(credentials.access_token, "ya29.consented");
    assert_eq!(consent.call_count(), 1);
    let saved = load_credentials(&config.token_path).await.unwrap().unwrap();
    assert_eq!(saved.access_token, "ya29.consented");
}

#[tokio::test]
async fn test_corrupt_token_is_discarded() {
    let dir = TempDir::new().unwrap();
    let config = auth_config(dir.path(), true);
    write_client_secrets(dir.path(), "https://oauth2.googleapis.com/token").await;
    tokio::fs::write(&config.token_path, "{ definitely not json")
        .await
        .unwrap();
    let consent = MockConsentFlow::granting(granted());

    let credentials = authenticate(&config, &oauth(), &consent).await.unwrap();

    assert_eq!(credentials.access_token, "ya29.consented");
    assert_eq!(consent.call_count(), 1);
}

#[tokio::test]
async fn test_missing_client_secrets_is_fatal() {
    let dir = TempDir::new().unwrap();
    let config = auth_config(dir.path(), true);
    let consent = MockConsentFlow::granting(granted());

    let err = authenticate(&config, &oauth(), &consent).await.unwrap_err();

    assert!(matches!(err, AuthError::MissingClientSecrets { .. }));
    assert_eq!(consent.call_count(), 0);
    assert!(!config.token_path.exists());
}

#[tokio::test]
async fn test_non_interactive_without_token() {
    let dir = TempDir::new().unwrap();
    let config = auth_config(dir.path(), false);
    write_client_secrets(dir.path(), "https://oauth2.googleapis.com/token").await;
    let consent = MockConsentFlow::granting(granted());

    let err = authenticate(&config, &oauth(), &consent).await.unwrap_err();

    assert!(matches!(err, AuthError::InteractiveFlowDisabled));
    assert_eq!(consent.call_count(), 0);
}

#[tokio::test]
async fn test_denied_consent_is_reported() {
    let dir = TempDir::new().unwrap();
    let config = auth_config(dir.path(), true);
    write_client_secrets(dir.path(), "https://oauth2.googleapis.com/token").await;
    let consent = MockConsentFlow::denying();

    let err = authenticate(&config, &oauth(), &consent).await.unwrap_err();

    assert!(matches!(err, AuthError::ConsentFailed(_)));
    assert_eq!(consent.call_count(), 1);
    remove_credentials(&config.token_path).await.unwrap();
}
