use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, GatewayError>;

#[derive(Error, Debug)]
pub enum GatewayError {
    /// Client secrets or token file absent or unparsable.
    #[error("Configuration missing: {0}")]
    ConfigMissing(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Invalid grant: {0}")]
    InvalidGrant(String),

    #[error("Remote API error: {0}")]
    RemoteApiError(String),

    #[error("Token refresh failed: {0}")]
    RefreshFailed(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl GatewayError {
    /// Stable machine-readable name, used as the `error` field of responses.
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::ConfigMissing(_) => "config_missing",
            GatewayError::Unauthorized(_) => "unauthorized",
            GatewayError::InvalidGrant(_) => "invalid_grant",
            GatewayError::RemoteApiError(_) => "remote_api_error",
            GatewayError::RefreshFailed(_) => "refresh_failed",
            GatewayError::BadRequest(_) => "bad_request",
            GatewayError::PayloadTooLarge(_) => "payload_too_large",
            GatewayError::Io(_) => "io_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::ConfigMissing(_) | GatewayError::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            GatewayError::Unauthorized(_) | GatewayError::RefreshFailed(_) => {
                StatusCode::UNAUTHORIZED
            }
            GatewayError::InvalidGrant(_) | GatewayError::BadRequest(_) => StatusCode::BAD_REQUEST,
            GatewayError::RemoteApiError(_) => StatusCode::BAD_GATEWAY,
            GatewayError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        tracing::error!("[ERROR] {} ({})", self, status);

        let body = Json(serde_json::json!({
            "error": self.kind(),
            "message": self.to_string(),
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_per_variant() {
        assert_eq!(
            GatewayError::ConfigMissing("x".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            GatewayError::Unauthorized("x".into()).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            GatewayError::RefreshFailed("x".into()).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            GatewayError::InvalidGrant("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            GatewayError::RemoteApiError("x".into()).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            GatewayError::PayloadTooLarge("x".into()).status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
    }

    #[tokio::test]
    async fn test_error_response_body() {
        let response = GatewayError::InvalidGrant("code reused".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["error"], "invalid_grant");
        assert!(json["message"].as_str().unwrap().contains("code reused"));
    }
}
