//! Drive Gateway
//!
//! Small web server that uploads browser-submitted files to Google Drive.
//!
//! # Features
//! - Google OAuth2 authorization-code flow with offline access
//! - Token persisted to `token.json`, refreshed before it expires
//! - Multipart upload staged on disk, then sent to Drive
//! - Uploader greeted by name via the People API

pub mod auth;
pub mod config;
pub mod error;
pub mod google;
pub mod server;
pub mod upload;

pub use auth::{ClientHandle, ClientSecret, CredentialStore, OAuthClient, Token, TokenLifecycle};
pub use config::GatewayConfig;
pub use error::{GatewayError, Result};
pub use server::{router, start_server, AppState};
