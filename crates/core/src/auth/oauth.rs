use chrono::{Duration, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument};
use url::Url;

use super::types::{ClientSecrets, Credentials};
use super::AuthError;

/// Token endpoint response for both the code exchange and refresh grants.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    scope: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Minimal OAuth 2.0 client for Google's token endpoint.
#[derive(Debug, Clone)]
pub struct OAuthClient {
    client: Client,
}

impl OAuthClient {
    pub fn new(timeout: std::time::Duration) -> Result<Self, AuthError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    /// Share an existing HTTP client (and its connection pool).
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Build the browser URL the user visits to grant access.
    pub fn authorization_url(
        secrets: &ClientSecrets,
        redirect_uri: &str,
        scopes: &[String],
        state: &str,
    ) -> Result<Url, AuthError> {
        let mut url = Url::parse(&secrets.auth_uri)
            .map_err(|e| AuthError::InvalidClientSecrets(format!("auth_uri: {}", e)))?;

        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &secrets.client_id)
            .append_pair("redirect_uri", redirect_uri)
            .append_pair("scope", &scopes.join(" "))
            .append_pair("state", state)
            .append_pair("access_type", "offline")
            .append_pair("prompt", "consent");

        Ok(url)
    }

    /// Trade an authorization code for credentials.
    #[instrument(skip(self, secrets, code))]
    pub async fn exchange_code(
        &self,
        secrets: &ClientSecrets,
        code: &str,
        redirect_uri: &str,
        scopes: &[String],
    ) -> Result<Credentials, AuthError> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", secrets.client_id.as_str()),
            ("client_secret", secrets.client_secret.as_str()),
            ("redirect_uri", redirect_uri),
        ];

        let token = self
            .request_token(&secrets.token_uri, &params)
            .await
            .map_err(|e| match e {
                AuthError::RefreshFailed(msg) => AuthError::ConsentFailed(msg),
                other => other,
            })?;

        debug!("Exchanged authorization code for credentials");

        Ok(Credentials {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            token_uri: secrets.token_uri.clone(),
            client_id: secrets.client_id.clone(),
            client_secret: secrets.client_secret.clone(),
            scopes: granted_scopes(token.scope.as_deref(), scopes),
            expiry: token.expires_in.map(|s| Utc::now() + Duration::seconds(s)),
        })
    }

    /// Obtain a new access token using the stored refresh token.
    ///
    /// Google normally omits the refresh token from refresh responses, in
    /// which case the existing one is carried over.
    #[instrument(skip(self, credentials))]
    pub async fn refresh(&self, credentials: &Credentials) -> Result<Credentials, AuthError> {
        let refresh_token = credentials
            .refresh_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::NoRefreshToken)?;

        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.as_str()),
        ];

        let token = self.request_token(&credentials.token_uri, &params).await?;

        debug!("Refreshed access token");

        Ok(Credentials {
            access_token: token.access_token,
            refresh_token: token
                .refresh_token
                .or_else(|| credentials.refresh_token.clone()),
            token_uri: credentials.token_uri.clone(),
            client_id: credentials.client_id.clone(),
            client_secret: credentials.client_secret.clone(),
            scopes: granted_scopes(token.scope.as_deref(), &credentials.scopes),
            expiry: token.expires_in.map(|s| Utc::now() + Duration::seconds(s)),
        })
    }

    async fn request_token(
        &self,
        token_uri: &str,
        params: &[(&str, &str)],
    ) -> Result<TokenResponse, AuthError> {
        let response = self.client.post(token_uri).form(params).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let reason = match serde_json::from_str::<TokenErrorResponse>(&body) {
                Ok(err) => match err.error_description {
                    Some(desc) => format!("{}: {}", err.error, desc),
                    None => err.error,
                },
                Err(_) => format!("HTTP {}", status),
            };
            return Err(AuthError::RefreshFailed(reason));
        }

        response
            .json::<TokenResponse>()
            .await
            .map_err(|e| AuthError::RefreshFailed(format!("invalid token response: {}", e)))
    }
}

fn granted_scopes(granted: Option<&str>, requested: &[String]) -> Vec<String> {
    match granted {
        Some(scope) if !scope.trim().is_empty() => {
            scope.split_whitespace().map(str::to_string).collect()
        }
        _ => requested.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::types::{DEFAULT_AUTH_URI, DEFAULT_TOKEN_URI, DRIVE_SCOPE};
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn secrets(token_uri: &str) -> ClientSecrets {
        ClientSecrets {
            client_id: "client-id".to_string(),
            client_secret: "client-secret".to_string(),
            auth_uri: DEFAULT_AUTH_URI.to_string(),
            token_uri: token_uri.to_string(),
            redirect_uris: vec![],
        }
    }

    fn client() -> OAuthClient {
        OAuthClient::new(std::time::Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_authorization_url_requests_offline_access() {
        let url = OAuthClient::authorization_url(
            &secrets(DEFAULT_TOKEN_URI),
            "http://127.0.0.1:8765/",
            &[DRIVE_SCOPE.to_string()],
            "state-123",
        )
        .unwrap();

        let pairs: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs["client_id"], "client-id");
        assert_eq!(pairs["redirect_uri"], "http://127.0.0.1:8765/");
        assert_eq!(pairs["scope"], DRIVE_SCOPE);
        assert_eq!(pairs["state"], "state-123");
        assert_eq!(pairs["access_type"], "offline");
        assert_eq!(pairs["response_type"], "code");
    }

    #[test]
    fn test_granted_scopes_falls_back_to_requested() {
        let requested = vec![DRIVE_SCOPE.to_string()];
        assert_eq!(granted_scopes(None, &requested), requested);
        assert_eq!(granted_scopes(Some(" "), &requested), requested);
        assert_eq!(granted_scopes(Some("a b"), &requested), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_refresh_keeps_existing_refresh_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "new-access",
                "expires_in": 3599,
                "token_type": "Bearer"
            })))
            .mount(&server)
            .await;

        let creds = Credentials {
            access_token: "old".to_string(),
            refresh_token: Some("keep-me".to_string()),
            token_uri: format!("{}/token", server.uri()),
            client_id: "client-id".to_string(),
            client_secret: "client-secret".to_string(),
            scopes: vec![DRIVE_SCOPE.to_string()],
            expiry: Some(Utc::now() - Duration::hours(1)),
        };

        let refreshed = client().refresh(&creds).await.unwrap();
        assert_eq!(refreshed.access_token, "new-access");
        assert_eq!(refreshed.refresh_token.as_deref(), Some("keep-me"));
        assert!(refreshed.is_valid(Utc::now()));
    }

    #[tokio::test]
    async fn test_refresh_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": "invalid_grant",
                "error_description": "Token has been expired or revoked."
            })))
            .mount(&server)
            .await;

        let creds = Credentials {
            access_token: "old".to_string(),
            refresh_token: Some("revoked".to_string()),
            token_uri: format!("{}/token", server.uri()),
            client_id: "client-id".to_string(),
            client_secret: String::new(),
            scopes: vec![],
            expiry: None,
        };

        let err = client().refresh(&creds).await.unwrap_err();
        match err {
            AuthError::RefreshFailed(msg) => assert!(msg.contains("invalid_grant")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_refresh_without_refresh_token() {
        let creds = Credentials {
            access_token: "old".to_string(),
            refresh_token: None,
            token_uri: DEFAULT_TOKEN_URI.to_string(),
            client_id: "client-id".to_string(),
            client_secret: String::new(),
            scopes: vec![],
            expiry: None,
        };

        let err = client().refresh(&creds).await.unwrap_err();
        assert!(matches!(err, AuthError::NoRefreshToken));
    }

    #[tokio::test]
    async fn test_exchange_code() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=authorization_code"))
            .and(body_string_contains("code=the-code"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "access",
                "refresh_token": "refresh",
                "expires_in": 3600,
                "scope": DRIVE_SCOPE
            })))
            .mount(&server)
            .await;

        let creds = client()
            .exchange_code(
                &secrets(&format!("{}/token", server.uri())),
                "the-code",
                "http://127.0.0.1:1/",
                &[DRIVE_SCOPE.to_string()],
            )
            .await
            .unwrap();

        assert_eq!(creds.access_token, "access");
        assert_eq!(creds.refresh_token.as_deref(), Some("refresh"));
        assert_eq!(creds.client_id, "client-id");
        assert_eq!(creds.scopes, vec![DRIVE_SCOPE.to_string()]);
        assert!(creds.can_refresh());
    }
}
