//! Process configuration.
//!
//! Everything has a default that matches a local single-operator setup: the
//! server listens on `127.0.0.1:3010` and keeps `credentials.json`,
//! `token.json` and the `uploads/` staging directory in the working directory.

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 3010;

/// Upload size bound applied to `/upload` request bodies.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;

pub const DEFAULT_AUTHORIZE_DELAY: Duration = Duration::from_secs(2);

pub const GOOGLE_DRIVE_API_BASE: &str = "https://www.googleapis.com";
pub const GOOGLE_PEOPLE_API_BASE: &str = "https://people.googleapis.com";

/// Scopes requested by `/authenticate`.
pub const DEFAULT_SCOPES: [&str; 3] = [
    "https://www.googleapis.com/auth/drive",
    "https://www.googleapis.com/auth/gmail.send",
    "https://www.googleapis.com/auth/userinfo.profile",
];

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
    /// Google OAuth client secrets (read-only)
    pub credentials_path: PathBuf,
    /// Issued token (read-write)
    pub token_path: PathBuf,
    /// Staging directory for in-flight uploads
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
    /// Pause before `/authenticate` answers with its redirect
    pub authorize_delay: Duration,
    pub scopes: Vec<String>,
    pub drive_api_base: String,
    pub people_api_base: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            credentials_path: PathBuf::from("credentials.json"),
            token_path: PathBuf::from("token.json"),
            upload_dir: PathBuf::from("uploads"),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            authorize_delay: DEFAULT_AUTHORIZE_DELAY,
            scopes: DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
            drive_api_base: GOOGLE_DRIVE_API_BASE.to_string(),
            people_api_base: GOOGLE_PEOPLE_API_BASE.to_string(),
        }
    }
}

impl GatewayConfig {
    /// Apply positional `[host] [port]` arguments (program name excluded).
    pub fn with_args<I>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut args = args.into_iter();
        if let Some(host) = args.next() {
            self.host = host;
        }
        if let Some(port) = args.next().and_then(|s| s.parse::<u16>().ok()) {
            self.port = port;
        }
        self
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
