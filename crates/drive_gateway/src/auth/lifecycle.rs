//! Token lifecycle: load the stored token, refresh it when it is about to
//! expire, and hand out an authenticated client.

use chrono::Duration;

use super::credentials::Token;
use super::oauth::OAuthClient;
use crate::error::{GatewayError, Result};

/// Refresh this long before the access token actually expires.
pub const EAGER_REFRESH_THRESHOLD_SECS: i64 = 5 * 60;

/// An HTTP client bound to the current token, if any.
#[derive(Debug, Clone)]
pub struct ClientHandle {
    http_client: reqwest::Client,
    token: Option<Token>,
}

impl ClientHandle {
    pub fn new(http_client: reqwest::Client, token: Option<Token>) -> Self {
        Self { http_client, token }
    }

    pub fn http_client(&self) -> &reqwest::Client {
        &self.http_client
    }

    pub fn token(&self) -> Option<&Token> {
        self.token.as_ref()
    }

    /// Access token for an `Authorization: Bearer` header.
    pub fn bearer(&self) -> Result<&str> {
        self.token
            .as_ref()
            .map(|t| t.access_token.as_str())
            .ok_or_else(|| {
                GatewayError::Unauthorized(
                    "no token stored; visit /authenticate first".to_string(),
                )
            })
    }
}

#[derive(Debug, Clone)]
pub struct TokenLifecycle {
    oauth: OAuthClient,
    threshold: Duration,
}

impl TokenLifecycle {
    pub fn new(oauth: OAuthClient) -> Self {
        Self {
            oauth,
            threshold: Duration::seconds(EAGER_REFRESH_THRESHOLD_SECS),
        }
    }

    pub fn oauth(&self) -> &OAuthClient {
        &self.oauth
    }

    /// Build a client handle from the stored token, refreshing it first if it
    /// is expired or about to expire.
    ///
    /// With no stored token the handle carries no credentials. A failed refresh
    /// is returned as [`GatewayError::RefreshFailed`].
    pub async fn authenticated_client(&self) -> Result<ClientHandle> {
        let store = self.oauth.store();
        let secret = store.load_client_secret().await?;

        // Held until the refreshed token is on disk
        let _guard = store.lock().await;

        let token = match store.load_token().await? {
            Some(token) => token,
            None => {
                tracing::warn!("[WARN] No token stored at {}", store.token_path().display());
                return Ok(ClientHandle::new(self.oauth.http_client().clone(), None));
            }
        };

        if !token.is_expiring(self.threshold) {
            return Ok(ClientHandle::new(self.oauth.http_client().clone(), Some(token)));
        }

        tracing::info!("[INFO] Token is expired or about to expire. Refreshing token...");

        let refreshed = match self.oauth.refresh_token(&secret, &token).await {
            Ok(refreshed) => refreshed,
            Err(e) => {
                tracing::error!("[ERROR] Error refreshing access token: {}", e);
                return Err(e);
            }
        };

        store.save_token(&refreshed).await?;
        tracing::info!("[OK] Token refreshed successfully");

        Ok(ClientHandle::new(
            self.oauth.http_client().clone(),
            Some(refreshed),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::CredentialStore;
    use mockito::Server;
    use tempfile::TempDir;

    fn lifecycle_in(dir: &TempDir, token_uri: &str) -> TokenLifecycle {
        let credentials = serde_json::json!({
            "web": {
                "client_id": "cid",
                "client_secret": "csecret",
                "redirect_uris": ["http://localhost:3010/googleCallback"],
                "token_uri": token_uri,
            }
        });
        std::fs::write(
            dir.path().join("credentials.json"),
            serde_json::to_vec(&credentials).unwrap(),
        )
        .unwrap();

        let store = CredentialStore::new(
            dir.path().join("credentials.json"),
            dir.path().join("token.json"),
        );
        TokenLifecycle::new(OAuthClient::new(store, reqwest::Client::new()))
    }

    fn token_expiring_in(secs: i64, refresh_token: Option<&str>) -> Token {
        Token {
            access_token: "ya29.current".to_string(),
            refresh_token: refresh_token.map(str::to_string),
            scope: Some("https://www.googleapis.com/auth/drive".to_string()),
            token_type: "Bearer".to_string(),
            id_token: None,
            expiry_date: Token::expiry_from_now(secs),
        }
    }

    #[tokio::test]
    async fn test_no_token_gives_empty_handle() {
        let dir = TempDir::new().unwrap();
        let lifecycle = lifecycle_in(&dir, "http://127.0.0.1:9/token");

        let handle = lifecycle.authenticated_client().await.unwrap();
        assert!(handle.token().is_none());
        assert!(matches!(handle.bearer(), Err(GatewayError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_valid_token_is_not_refreshed() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/token")
            .expect(0)
            .create_async()
            .await;

        let dir = TempDir::new().unwrap();
        let lifecycle = lifecycle_in(&dir, &format!("{}/token", server.url()));
        let token = token_expiring_in(3600, Some("1//r"));
        lifecycle.oauth().store().save_token(&token).await.unwrap();

        let handle = lifecycle.authenticated_client().await.unwrap();
        assert_eq!(handle.bearer().unwrap(), "ya29.current");
        assert_eq!(handle.token(), Some(&token));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_expiring_token_is_refreshed_and_persisted() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/token")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token":"ya29.refreshed","expires_in":3599,"token_type":"Bearer"}"#)
            .expect(1)
            .create_async()
            .await;

        let dir = TempDir::new().unwrap();
        let lifecycle = lifecycle_in(&dir, &format!("{}/token", server.url()));
        let old = token_expiring_in(60, Some("1//r"));
        lifecycle.oauth().store().save_token(&old).await.unwrap();

        let handle = lifecycle.authenticated_client().await.unwrap();
        mock.assert_async().await;
        assert_eq!(handle.bearer().unwrap(), "ya29.refreshed");

        let stored = lifecycle.oauth().store().load_token().await.unwrap().unwrap();
        assert_eq!(stored.access_token, "ya29.refreshed");
        assert_eq!(stored.refresh_token.as_deref(), Some("1//r"));
        assert!(stored.expiry_date > old.expiry_date);

        // Now fresh: a second call stays local
        let again = lifecycle.authenticated_client().await.unwrap();
        assert_eq!(again.bearer().unwrap(), "ya29.refreshed");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_concurrent_refresh_hits_token_endpoint_once() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/token")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token":"ya29.refreshed","expires_in":3599,"token_type":"Bearer"}"#)
            .expect(1)
            .create_async()
            .await;

        let dir = TempDir::new().unwrap();
        let lifecycle = lifecycle_in(&dir, &format!("{}/token", server.url()));
        lifecycle
            .oauth()
            .store()
            .save_token(&token_expiring_in(60, Some("1//r")))
            .await
            .unwrap();

        let other = lifecycle.clone();
        let (first, second) = tokio::join!(
            lifecycle.authenticated_client(),
            other.authenticated_client()
        );
        let (first, second) = (first.unwrap(), second.unwrap());

        mock.assert_async().await;
        assert_eq!(first.bearer().unwrap(), "ya29.refreshed");
        assert_eq!(second.bearer().unwrap(), "ya29.refreshed");

        let stored = lifecycle.oauth().store().load_token().await.unwrap();
        assert_eq!(stored.as_ref(), first.token());
        assert_eq!(stored.as_ref(), second.token());
    }

    #[tokio::test]
    async fn test_failed_refresh_is_propagated() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/token")
            .with_status(400)
            .with_body(r#"{"error":"invalid_grant"}"#)
            .create_async()
            .await;

        let dir = TempDir::new().unwrap();
        let lifecycle = lifecycle_in(&dir, &format!("{}/token", server.url()));
        let old = token_expiring_in(-60, Some("1//revoked"));
        lifecycle.oauth().store().save_token(&old).await.unwrap();

        let err = lifecycle.authenticated_client().await.unwrap_err();
        assert!(matches!(err, GatewayError::RefreshFailed(_)));

        // Stored token left untouched
        let stored = lifecycle.oauth().store().load_token().await.unwrap();
        assert_eq!(stored, Some(old));
    }

    #[tokio::test]
    async fn test_expired_token_without_refresh_token() {
        let dir = TempDir::new().unwrap();
        let lifecycle = lifecycle_in(&dir, "http://127.0.0.1:9/token");
        lifecycle
            .oauth()
            .store()
            .save_token(&token_expiring_in(-60, None))
            .await
            .unwrap();

        let err = lifecycle.authenticated_client().await.unwrap_err();
        assert!(matches!(err, GatewayError::RefreshFailed(_)));
    }

    #[tokio::test]
    async fn test_missing_credentials() {
        let dir = TempDir::new().unwrap();
        let store = CredentialStore::new(
            dir.path().join("credentials.json"),
            dir.path().join("token.json"),
        );
        let lifecycle = TokenLifecycle::new(OAuthClient::new(store, reqwest::Client::new()));

        let err = lifecycle.authenticated_client().await.unwrap_err();
        assert!(matches!(err, GatewayError::ConfigMissing(_)));
    }
}
