//! Google Drive v3 file uploads.
//!
//! Goes through the generated `google-drive3` hub, authorized with the access
//! token of the current [`ClientHandle`].

use std::path::Path;

use google_drive3 as drive3;

use crate::auth::ClientHandle;
use crate::error::{GatewayError, Result};

/// Created file, as returned with `fields=id`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriveFile {
    pub id: String,
}

#[derive(Debug, Clone)]
pub struct DriveClient {
    root_url: String,
}

impl DriveClient {
    /// `api_base` is the Drive root, e.g. `https://www.googleapis.com`.
    pub fn new(api_base: impl Into<String>) -> Self {
        Self {
            root_url: format!("{}/", api_base.into().trim_end_matches('/')),
        }
    }

    /// Upload the file at `path` under `file_name`, returning its Drive id.
    pub async fn upload_file(
        &self,
        handle: &ClientHandle,
        path: &Path,
        file_name: &str,
    ) -> Result<DriveFile> {
        let access_token = handle.bearer()?.to_string();

        // TLS connector + HTTP client.
        let connector = drive3::hyper_rustls::HttpsConnectorBuilder::new()
            .with_native_roots()
            .map_err(|e| GatewayError::RemoteApiError(format!("load native root certs: {}", e)))?
            .https_or_http()
            .enable_http1()
            .build();

        let client = drive3::hyper_util::client::legacy::Client::builder(
            drive3::hyper_util::rt::TokioExecutor::new(),
        )
        .build(connector);

        let mut hub = drive3::DriveHub::new(client, access_token);
        hub.root_url(self.root_url.clone());

        let mut metadata = drive3::api::File::default();
        metadata.name = Some(file_name.to_string());

        let file = std::fs::File::open(path)?;
        tracing::debug!("Uploading {} to {}", file_name, self.root_url);

        let (_resp, created) = hub
            .files()
            .create(metadata)
            // Only ask for what we need.
            .param("fields", "id")
            .upload(file, mime::APPLICATION_OCTET_STREAM)
            .await
            .map_err(upload_error)?;

        let id = created.id.ok_or_else(|| {
            GatewayError::RemoteApiError("Drive response carried no file id".to_string())
        })?;

        Ok(DriveFile { id })
    }
}

fn upload_error(e: drive3::Error) -> GatewayError {
    let unauthorized = match &e {
        drive3::Error::BadRequest(body) => body["error"]["code"] == 401,
        drive3::Error::Failure(response) => {
            response.status() == drive3::hyper::StatusCode::UNAUTHORIZED
        }
        _ => false,
    };

    let message = format!("Drive upload failed: {}", e);
    if unauthorized {
        GatewayError::Unauthorized(message)
    } else {
        GatewayError::RemoteApiError(message)
    }
}
