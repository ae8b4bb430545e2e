//! Upload handling: stage the browser's file on disk, push it to Drive and
//! greet the user by name.

use axum::extract::multipart::{Multipart, MultipartError};
use axum::http::StatusCode;
use rand::Rng;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

use crate::auth::TokenLifecycle;
use crate::error::{GatewayError, Result};
use crate::google::{DriveClient, PeopleClient};

/// Multipart field that carries the file. Matched exactly.
pub const FILE_FIELD: &str = "file";

/// A file staged under the upload directory.
///
/// The staged file is removed when this value is dropped, whichever way the
/// request ends.
#[derive(Debug)]
pub struct TempUpload {
    path: PathBuf,
    original_name: String,
    size: u64,
}

impl TempUpload {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn original_name(&self) -> &str {
        &self.original_name
    }

    pub fn size(&self) -> u64 {
        self.size
    }
}

impl Drop for TempUpload {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!("Removed staged upload {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                "[WARN] Failed to remove staged upload {}: {}",
                self.path.display(),
                e
            ),
        }
    }
}

fn staging_name() -> String {
    let mut rng = rand::thread_rng();
    (0..16).map(|_| format!("{:02x}", rng.gen::<u8>())).collect()
}

fn multipart_error(e: MultipartError) -> GatewayError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        GatewayError::PayloadTooLarge(e.body_text())
    } else {
        GatewayError::BadRequest(e.body_text())
    }
}

/// Read the multipart body, staging the single `file` part under `upload_dir`.
pub async fn receive_file(mut multipart: Multipart, upload_dir: &Path) -> Result<TempUpload> {
    let mut staged: Option<TempUpload> = None;

    while let Some(mut field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().map(str::to_string);
        let file_name = field.file_name().map(str::to_string);

        if name.as_deref() != Some(FILE_FIELD) {
            if file_name.is_some() {
                return Err(GatewayError::BadRequest(format!(
                    "unexpected file field {:?}; expected '{}'",
                    name.unwrap_or_default(),
                    FILE_FIELD
                )));
            }
            continue;
        }

        if staged.is_some() {
            return Err(GatewayError::BadRequest(format!(
                "more than one '{}' part",
                FILE_FIELD
            )));
        }

        let original_name = file_name.ok_or_else(|| {
            GatewayError::BadRequest(format!("'{}' part has no filename", FILE_FIELD))
        })?;

        tokio::fs::create_dir_all(upload_dir).await?;
        let mut upload = TempUpload {
            path: upload_dir.join(staging_name()),
            original_name,
            size: 0,
        };

        let mut file = tokio::fs::File::create(&upload.path).await?;
        while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
            file.write_all(&chunk).await?;
            upload.size += chunk.len() as u64;
        }
        file.flush().await?;

        tracing::info!(
            "[INFO] Received {} ({} bytes) -> {}",
            upload.original_name,
            upload.size,
            upload.path.display()
        );
        staged = Some(upload);
    }

    staged.ok_or_else(|| {
        GatewayError::BadRequest(format!("missing multipart part '{}'", FILE_FIELD))
    })
}

/// Drive upload pipeline for a staged file
#[derive(Debug, Clone)]
pub struct Uploader {
    lifecycle: TokenLifecycle,
    drive: DriveClient,
    people: PeopleClient,
}

impl Uploader {
    pub fn new(lifecycle: TokenLifecycle, drive: DriveClient, people: PeopleClient) -> Self {
        Self {
            lifecycle,
            drive,
            people,
        }
    }

    /// Authenticate, upload, look up the user and build the reply text.
    pub async fn upload(&self, upload: &TempUpload) -> Result<String> {
        let handle = self.lifecycle.authenticated_client().await?;

        let file = self
            .drive
            .upload_file(&handle, upload.path(), upload.original_name())
            .await?;
        tracing::info!(
            "[OK] Uploaded {} ({} bytes) as Drive file {}",
            upload.original_name(),
            upload.size(),
            file.id
        );

        let person = self.people.get_me(&handle).await?;
        tracing::info!(
            "[INFO] User: name={:?}, email={:?}",
            person.display_name(),
            person.primary_email()
        );

        Ok(format!(
            "Hi! {}, File uploaded successfully! File ID: {}",
            person.greeting_name(),
            file.id
        ))
    }
}
