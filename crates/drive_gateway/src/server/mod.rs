//! Drive Gateway HTTP server
//!
//! Serves the upload form, drives the Google OAuth consent flow and forwards
//! uploaded files to Drive.

pub mod handlers;

use crate::auth::{CredentialStore, OAuthClient, TokenLifecycle};
use crate::config::GatewayConfig;
use crate::google::{DriveClient, PeopleClient};
use crate::upload::Uploader;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router as AxumRouter,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Application state shared across handlers
pub struct AppState {
    pub config: GatewayConfig,
    /// Authorization URL and code exchange
    pub oauth: OAuthClient,
    pub uploader: Uploader,
}

impl AppState {
    pub fn new(config: GatewayConfig) -> Self {
        let store = CredentialStore::new(&config.credentials_path, &config.token_path);
        let oauth = OAuthClient::new(store, reqwest::Client::new());
        let uploader = Uploader::new(
            TokenLifecycle::new(oauth.clone()),
            DriveClient::new(&config.drive_api_base),
            PeopleClient::new(&config.people_api_base),
        );

        Self {
            config,
            oauth,
            uploader,
        }
    }
}

/// Build the router:
/// - GET / - Upload form
/// - POST /upload - Upload a file to Drive
/// - GET /authenticate - Redirect to Google's consent screen
/// - GET /googleCallback - OAuth callback, stores the token
pub fn router(state: Arc<AppState>) -> AxumRouter {
    let upload_limit = state.config.max_upload_bytes;

    AxumRouter::new()
        .route("/", get(handlers::index))
        .route(
            "/upload",
            post(handlers::upload).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/authenticate", get(handlers::authenticate))
        .route("/googleCallback", get(handlers::google_callback))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the Drive Gateway HTTP server
///
/// # Errors
/// Returns error if the upload directory cannot be created or binding fails
pub async fn start_server(config: GatewayConfig) -> anyhow::Result<()> {
    tokio::fs::create_dir_all(&config.upload_dir)
        .await
        .map_err(|e| {
            anyhow::anyhow!(
                "Failed to create upload directory {}: {}",
                config.upload_dir.display(),
                e
            )
        })?;

    if !config.credentials_path.exists() {
        tracing::warn!(
            "[WARN] {} not found; authenticated routes will fail until it is provided",
            config.credentials_path.display()
        );
    }

    let addr = config.bind_addr();
    let state = Arc::new(AppState::new(config));
    let app = router(state);

    let listener = TcpListener::bind(&addr).await?;

    info!("[INFO] Server started on http://{}", addr);
    info!("[INFO] To upload a file, visit the above URL and use the form.");

    axum::serve(listener, app).await?;

    Ok(())
}
