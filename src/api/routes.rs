use crate::AppState;
use crate::error::{ErrorCategory, RelayError};
use axum::extract::Extension;
use axum::extract::multipart::{Field, Multipart};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use bytes::Bytes;
use futures::SinkExt;
use serde_json::json;
use tracing::{error, info, warn};

/// Canonical multipart field name for the uploaded file. The two historical
/// front-end contracts (`video` vs `file`) are unified on this one.
pub const UPLOAD_FIELD: &str = "video";

/// Chunks in flight between the inbound multipart stream and the outbound
/// upstream body. Bounded so a slow upstream backpressures the client instead
/// of buffering the file in memory.
const FORWARD_CHANNEL_DEPTH: usize = 8;

#[axum::debug_handler]
pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "ok" })))
}

/// POST /upload: relay one multipart-encoded video to the upstream service.
pub async fn upload_video(
    Extension(state): Extension<AppState>,
    mut multipart: Multipart,
) -> Response {
    match relay_upload(&state, &mut multipart).await {
        Ok(upstream_json) => {
            info!("Upload relayed upstream");
            (StatusCode::OK, Json(upstream_json)).into_response()
        }
        Err(err) => {
            match err.category() {
                ErrorCategory::Client => warn!(%err, "Upload rejected"),
                category => error!(%err, ?category, "Upload relay failed"),
            }
            err.into_response()
        }
    }
}

/// Scan the form for the canonical upload field, skipping unrelated parts,
/// and forward the first match.
async fn relay_upload(
    state: &AppState,
    multipart: &mut Multipart,
) -> Result<serde_json::Value, RelayError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some(UPLOAD_FIELD) {
            let file_name = field.file_name().unwrap_or(UPLOAD_FIELD).to_string();
            return forward_field(state, field, &file_name).await;
        }
    }

    Err(RelayError::MissingFile)
}

/// Pump the multipart field into the upstream request body chunk by chunk,
/// enforcing the upload size cap as bytes arrive.
async fn forward_field(
    state: &AppState,
    mut field: Field<'_>,
    file_name: &str,
) -> Result<serde_json::Value, RelayError> {
    let cap = state.max_upload_bytes;
    let (mut tx, rx) =
        futures::channel::mpsc::channel::<Result<Bytes, std::io::Error>>(FORWARD_CHANNEL_DEPTH);

    let forward = state
        .upstream
        .forward(file_name, reqwest::Body::wrap_stream(rx));

    let feed = async move {
        let mut received: u64 = 0;
        loop {
            match field.chunk().await {
                Ok(Some(chunk)) => {
                    received += chunk.len() as u64;
                    if received > cap {
                        // Poison the body stream so the upstream request
                        // aborts instead of observing a short but
                        // well-formed upload.
                        let _ = tx
                            .send(Err(std::io::Error::other("upload size limit exceeded")))
                            .await;
                        return Err(RelayError::PayloadTooLarge(cap));
                    }
                    if tx.send(Ok(chunk)).await.is_err() {
                        // Upstream hung up; its error surfaces from `forward`
                        return Ok(());
                    }
                }
                Ok(None) => return Ok(()),
                Err(err) => {
                    let _ = tx
                        .send(Err(std::io::Error::other("inbound body error")))
                        .await;
                    return Err(RelayError::BodyRead(err));
                }
            }
        }
    };

    let (fed, forwarded) = futures::join!(feed, forward);
    // A feed-side failure explains the forward failure, so report it first
    fed?;
    forwarded
}
