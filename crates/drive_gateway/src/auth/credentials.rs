//! Credential store: the client secrets file and the issued token file.
//!
//! These two JSON documents are the only persisted state of the gateway.

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

use crate::error::{GatewayError, Result};

pub const GOOGLE_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub const GOOGLE_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

fn default_auth_uri() -> String {
    GOOGLE_AUTH_URI.to_string()
}

fn default_token_uri() -> String {
    GOOGLE_TOKEN_URI.to_string()
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

/// OAuth application credentials issued by Google.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClientSecret {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

/// Layout of a credentials file downloaded from the Google Cloud console.
#[derive(Debug, Deserialize)]
struct GoogleClientConfig {
    client_id: String,
    client_secret: String,
    #[serde(default)]
    redirect_uris: Vec<String>,
    auth_uri: Option<String>,
    token_uri: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CredentialsFile {
    Web { web: GoogleClientConfig },
    Installed { installed: GoogleClientConfig },
    Flat(ClientSecret),
}

impl CredentialsFile {
    fn into_client_secret(self) -> std::result::Result<ClientSecret, String> {
        let config = match self {
            CredentialsFile::Flat(secret) => return Ok(secret),
            CredentialsFile::Web { web } => web,
            CredentialsFile::Installed { installed } => installed,
        };

        let redirect_uri = config
            .redirect_uris
            .into_iter()
            .next()
            .ok_or_else(|| "redirect_uris is empty".to_string())?;

        Ok(ClientSecret {
            client_id: config.client_id,
            client_secret: config.client_secret,
            redirect_uri,
            auth_uri: config.auth_uri.unwrap_or_else(default_auth_uri),
            token_uri: config.token_uri.unwrap_or_else(default_token_uri),
        })
    }
}

/// OAuth access/refresh credential pair plus expiry metadata.
///
/// `expiry_date` is milliseconds since the Unix epoch, the layout Google client
/// libraries write to `token.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Token {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<i64>,
}

impl Token {
    /// Expiry timestamp from an `expires_in` seconds value, `None` when the
    /// value does not fit a timestamp.
    pub fn expiry_from_now(expires_in: i64) -> Option<i64> {
        Duration::try_seconds(expires_in)
            .and_then(|delta| Utc::now().checked_add_signed(delta))
            .map(|at| at.timestamp_millis())
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expiry_date
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
    }

    /// True if the access token is expired or expires within `threshold`.
    /// A token without an expiry is treated as still valid.
    pub fn is_expiring(&self, threshold: Duration) -> bool {
        match self.expires_at() {
            Some(expires_at) => Utc::now() + threshold >= expires_at,
            None => false,
        }
    }
}

/// File-backed store for the client secret and token.
///
/// Clones share the same writer lock; hold [`CredentialStore::lock`] across any
/// read-modify-write of the token file.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    credentials_path: PathBuf,
    token_path: PathBuf,
    writer: Arc<Mutex<()>>,
}

impl CredentialStore {
    pub fn new(credentials_path: impl Into<PathBuf>, token_path: impl Into<PathBuf>) -> Self {
        Self {
            credentials_path: credentials_path.into(),
            token_path: token_path.into(),
            writer: Arc::new(Mutex::new(())),
        }
    }

    pub fn token_path(&self) -> &Path {
        &self.token_path
    }

    /// Serialize token updates across requests.
    pub async fn lock(&self) -> MutexGuard<'_, ()> {
        self.writer.lock().await
    }

    pub async fn load_client_secret(&self) -> Result<ClientSecret> {
        let raw = tokio::fs::read(&self.credentials_path).await.map_err(|e| {
            GatewayError::ConfigMissing(format!(
                "cannot read {}: {}",
                self.credentials_path.display(),
                e
            ))
        })?;

        let file: CredentialsFile = serde_json::from_slice(&raw).map_err(|e| {
            GatewayError::ConfigMissing(format!(
                "cannot parse {}: {}",
                self.credentials_path.display(),
                e
            ))
        })?;

        file.into_client_secret().map_err(|e| {
            GatewayError::ConfigMissing(format!("{}: {}", self.credentials_path.display(), e))
        })
    }

    /// Load the issued token, `None` if the flow has never completed.
    pub async fn load_token(&self) -> Result<Option<Token>> {
        let raw = match tokio::fs::read(&self.token_path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        serde_json::from_slice(&raw).map(Some).map_err(|e| {
            GatewayError::ConfigMissing(format!(
                "cannot parse {}: {}",
                self.token_path.display(),
                e
            ))
        })
    }

    /// Replace the token file. Written to a sibling file first and renamed, so
    /// readers see either the previous token or the complete new one.
    pub async fn save_token(&self, token: &Token) -> Result<()> {
        let json = serde_json::to_vec_pretty(token)
            .map_err(|e| GatewayError::Io(std::io::Error::other(e)))?;

        let staging = self.token_path.with_extension("json.tmp");
        tokio::fs::write(&staging, &json).await?;
        tokio::fs::rename(&staging, &self.token_path).await?;

        tracing::info!("[OK] Token saved to {}", self.token_path.display());
        Ok(())
    }
}
