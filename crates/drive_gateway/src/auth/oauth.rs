use serde::Deserialize;
use url::Url;

use super::credentials::{ClientSecret, CredentialStore, Token};
use crate::error::{GatewayError, Result};

/// Successful response from the token endpoint
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>, // Google only returns it on the first consent
    expires_in: Option<i64>,
    scope: Option<String>,
    token_type: Option<String>,
    id_token: Option<String>,
}

/// Lifetime assumed when the token endpoint omits `expires_in`
pub const DEFAULT_EXPIRES_IN_SECS: i64 = 3600;

impl TokenResponse {
    /// Absolute expiry in epoch milliseconds, `None` if `expires_in` is out of range.
    fn expiry_date(&self) -> Option<i64> {
        Token::expiry_from_now(self.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS))
    }
}

/// Error body of the token endpoint (RFC 6749 section 5.2)
#[derive(Debug, Default, Deserialize)]
struct OAuthErrorBody {
    #[serde(default)]
    error: String,
    error_description: Option<String>,
}

impl OAuthErrorBody {
    fn parse(body: &str) -> Self {
        serde_json::from_str(body).unwrap_or_default()
    }

    fn describe(&self, status: reqwest::StatusCode, body: &str) -> String {
        match (&self.error_description, self.error.is_empty()) {
            (Some(desc), false) => format!("{} - {}: {}", status, self.error, desc),
            (None, false) => format!("{} - {}", status, self.error),
            _ => format!("{} - {}", status, body),
        }
    }
}

/// Build the consent URL the browser is redirected to.
///
/// `access_type=offline` makes Google issue a refresh token alongside the
/// access token.
pub fn authorization_url(secret: &ClientSecret, scopes: &[String]) -> Result<Url> {
    let mut url = Url::parse(&secret.auth_uri).map_err(|e| {
        GatewayError::ConfigMissing(format!("invalid auth_uri {}: {}", secret.auth_uri, e))
    })?;

    url.query_pairs_mut()
        .append_pair("access_type", "offline")
        .append_pair("scope", &scopes.join(" "))
        .append_pair("response_type", "code")
        .append_pair("client_id", &secret.client_id)
        .append_pair("redirect_uri", &secret.redirect_uri);

    Ok(url)
}

/// OAuth client for the authorization-code and refresh grants
#[derive(Debug, Clone)]
pub struct OAuthClient {
    store: CredentialStore,
    http_client: reqwest::Client,
}

impl OAuthClient {
    pub fn new(store: CredentialStore, http_client: reqwest::Client) -> Self {
        Self { store, http_client }
    }

    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    pub fn http_client(&self) -> &reqwest::Client {
        &self.http_client
    }

    /// Authorization URL for the configured client
    pub async fn get_authorization_url(&self, scopes: &[String]) -> Result<Url> {
        let secret = self.store.load_client_secret().await?;
        authorization_url(&secret, scopes)
    }

    /// Exchange an authorization code for a token and persist it.
    ///
    /// Codes are single use; a replayed or expired code is rejected by the
    /// provider and surfaces as [`GatewayError::InvalidGrant`].
    pub async fn exchange_code(&self, code: &str) -> Result<Token> {
        let secret = self.store.load_client_secret().await?;

        if code.trim().is_empty() {
            return Err(GatewayError::InvalidGrant(
                "missing authorization code".to_string(),
            ));
        }

        tracing::debug!(
            "Token exchange: redirect_uri={}, client_id={}",
            secret.redirect_uri,
            secret.client_id
        );

        let form_params = [
            ("grant_type", "authorization_code"),
            ("client_id", secret.client_id.as_str()),
            ("client_secret", secret.client_secret.as_str()),
            ("code", code),
            ("redirect_uri", secret.redirect_uri.as_str()),
        ];

        let response = self
            .http_client
            .post(&secret.token_uri)
            .form(&form_params)
            .send()
            .await
            .map_err(|e| {
                GatewayError::RemoteApiError(format!("failed to exchange code for token: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let error = OAuthErrorBody::parse(&body);
            let message = format!("token exchange failed: {}", error.describe(status, &body));

            let rejected = error.error == "invalid_grant"
                || status == reqwest::StatusCode::BAD_REQUEST
                || status == reqwest::StatusCode::UNAUTHORIZED;
            return Err(if rejected {
                GatewayError::InvalidGrant(message)
            } else {
                GatewayError::RemoteApiError(message)
            });
        }

        let token_response: TokenResponse = response.json().await.map_err(|e| {
            GatewayError::RemoteApiError(format!("failed to parse token response: {}", e))
        })?;

        let expiry_date = token_response.expiry_date().ok_or_else(|| {
            GatewayError::RemoteApiError(format!(
                "token endpoint returned out-of-range expires_in: {:?}",
                token_response.expires_in
            ))
        })?;

        if token_response.refresh_token.is_none() {
            tracing::warn!("[WARN] Token response carried no refresh_token; re-consent will be required once it expires");
        }

        let token = Token {
            access_token: token_response.access_token,
            refresh_token: token_response.refresh_token,
            scope: token_response.scope,
            token_type: token_response
                .token_type
                .unwrap_or_else(|| "Bearer".to_string()),
            id_token: token_response.id_token,
            expiry_date: Some(expiry_date),
        };

        {
            let _guard = self.store.lock().await;
            self.store.save_token(&token).await?;
        }

        Ok(token)
    }

    /// Refresh an access token. Does not persist the result.
    pub async fn refresh_token(&self, secret: &ClientSecret, existing: &Token) -> Result<Token> {
        let refresh_token = existing.refresh_token.as_deref().ok_or_else(|| {
            GatewayError::RefreshFailed("token has no refresh_token; re-authorize".to_string())
        })?;

        let form_params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", secret.client_id.as_str()),
            ("client_secret", secret.client_secret.as_str()),
        ];

        let response = self
            .http_client
            .post(&secret.token_uri)
            .form(&form_params)
            .send()
            .await
            .map_err(|e| GatewayError::RefreshFailed(format!("failed to refresh token: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let error = OAuthErrorBody::parse(&body);
            return Err(GatewayError::RefreshFailed(error.describe(status, &body)));
        }

        let token_response: TokenResponse = response.json().await.map_err(|e| {
            GatewayError::RefreshFailed(format!("failed to parse token response: {}", e))
        })?;

        let expiry_date = token_response.expiry_date().ok_or_else(|| {
            GatewayError::RefreshFailed(format!(
                "token endpoint returned out-of-range expires_in: {:?}",
                token_response.expires_in
            ))
        })?;

        Ok(Token {
            access_token: token_response.access_token,
            // Keep the existing refresh_token when Google doesn't rotate it
            refresh_token: token_response
                .refresh_token
                .or_else(|| existing.refresh_token.clone()),
            scope: token_response.scope.or_else(|| existing.scope.clone()),
            token_type: token_response
                .token_type
                .unwrap_or_else(|| existing.token_type.clone()),
            id_token: token_response.id_token.or_else(|| existing.id_token.clone()),
            expiry_date: Some(expiry_date),
        })
    }
}
