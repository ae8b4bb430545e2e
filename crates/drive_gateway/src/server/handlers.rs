//! Route handlers
//!
//! - `GET /` upload form
//! - `POST /upload` stage, upload to Drive, greet the user
//! - `GET /authenticate` redirect to Google's consent screen
//! - `GET /googleCallback` exchange the returned code for a token

use axum::{
    extract::{multipart::MultipartRejection, Multipart, Query, State},
    http::{header::LOCATION, StatusCode},
    response::{Html, IntoResponse, Response},
};
use serde::Deserialize;
use std::sync::Arc;

use super::AppState;
use crate::error::{GatewayError, Result};
use crate::upload::receive_file;

const INDEX_HTML: &str = include_str!("../../static/index.html");

/// Serve the upload form
pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// Upload the submitted file to Drive
pub async fn upload(
    State(state): State<Arc<AppState>>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<String> {
    let multipart = multipart.map_err(|e| GatewayError::BadRequest(e.body_text()))?;

    // Dropped on every return path, which removes the staged file
    let staged = receive_file(multipart, &state.config.upload_dir).await?;

    state.uploader.upload(&staged).await
}

/// Redirect the browser to the authorization URL
pub async fn authenticate(State(state): State<Arc<AppState>>) -> Result<Response> {
    let url = state
        .oauth
        .get_authorization_url(&state.config.scopes)
        .await?;

    tracing::info!("[INFO] Redirecting to authorization URL: {}", url);

    tokio::time::sleep(state.config.authorize_delay).await;

    Ok((StatusCode::FOUND, [(LOCATION, url.to_string())]).into_response())
}

/// Query parameters Google appends to the redirect URI
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub scope: Option<String>,
    pub error: Option<String>,
}

/// OAuth callback: exchange the code and store the token
pub async fn google_callback(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CallbackQuery>,
) -> Result<(StatusCode, &'static str)> {
    if let Some(error) = params.error {
        return Err(GatewayError::Unauthorized(format!(
            "authorization denied: {}",
            error
        )));
    }

    tracing::info!(
        "[INFO] OAuth callback received: has_code={}, scope={:?}",
        params.code.is_some(),
        params.scope
    );

    let code = params.code.unwrap_or_default();
    state.oauth.exchange_code(&code).await?;

    tracing::info!("[OK] Authorization complete");
    Ok((StatusCode::OK, "OK."))
}
