use crate::api::routes::UPLOAD_FIELD;
use crate::session::{SessionError, UploadSession};
use axum::http::StatusCode;
use futures::TryStreamExt;
use reqwest::multipart::{Form, Part};
use std::path::Path;
use thiserror::Error;
use tokio_util::io::ReaderStream;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum UploadError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("failed to read upload file: {0}")]
    Io(#[from] std::io::Error),

    #[error("upload request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("relay rejected the upload with status {0}")]
    Rejected(StatusCode),

    #[error("relay response carried no video id")]
    MissingId,
}

/// Drives an [`UploadSession`] through a real upload against the relay.
///
/// This is the desktop/tooling counterpart of the dashboard upload form: it
/// streams the file as the canonical `video` multipart field and feeds the
/// session's byte counter as chunks leave for the wire.
pub struct UploadClient {
    http: reqwest::Client,
    upload_url: String,
}

impl UploadClient {
    pub fn new(relay_url: impl Into<String>) -> Self {
        let relay_url = relay_url.into();
        Self {
            http: reqwest::Client::new(),
            upload_url: format!("{}/upload", relay_url.trim_end_matches('/')),
        }
    }

    /// Upload one file, leaving the session in `Success` or `Error`.
    ///
    /// Returns the relay's JSON response on success. Selection and submit
    /// guards ([`SessionError`]) surface before the session enters `Loading`.
    pub async fn upload_file(
        &self,
        session: &mut UploadSession,
        path: &Path,
    ) -> Result<serde_json::Value, UploadError> {
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(UPLOAD_FIELD)
            .to_string();

        let size = tokio::fs::metadata(path).await.ok().map(|meta| meta.len());
        session.select_file(&file_name, size)?;
        let progress = session.begin_upload()?;

        let file = match tokio::fs::File::open(path).await {
            Ok(file) => file,
            Err(err) => {
                session.finish_error()?;
                return Err(err.into());
            }
        };

        let counted =
            ReaderStream::new(file).inspect_ok(move |chunk| progress.add(chunk.len() as u64));
        let body = reqwest::Body::wrap_stream(counted);
        let part = match size {
            Some(size) => Part::stream_with_length(body, size),
            None => Part::stream(body),
        }
        .file_name(file_name);

        let response = self
            .http
            .post(&self.upload_url)
            .multipart(Form::new().part(UPLOAD_FIELD, part))
            .send()
            .await;

        let response = match response {
            Ok(response) => response,
            Err(err) => {
                warn!(%err, "Upload request failed");
                session.finish_error()?;
                return Err(err.into());
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!(%status, "Relay rejected upload");
            session.finish_error()?;
            return Err(UploadError::Rejected(status));
        }

        let body = match response.json::<serde_json::Value>().await {
            Ok(body) => body,
            Err(err) => {
                session.finish_error()?;
                return Err(err.into());
            }
        };

        let Some(id) = video_id(&body) else {
            session.finish_error()?;
            return Err(UploadError::MissingId);
        };

        debug!(%id, "Upload acknowledged");
        session.finish_success(&id)?;
        Ok(body)
    }
}

/// The server-assigned identifier, however the upstream spells it.
fn video_id(body: &serde_json::Value) -> Option<String> {
    match body.get("id")? {
        serde_json::Value::String(id) => Some(id.clone()),
        other => Some(other.to_string()),
    }
}
