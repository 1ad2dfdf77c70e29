use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

/// Broad classification of a failed relay attempt. Only logged; the client
/// always sees one of the fixed user-safe messages below.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ErrorCategory {
    /// The inbound request itself was unacceptable
    Client,
    /// The upstream rejected the upload (4xx); retrying won't help
    UpstreamPermanent,
    /// The upstream failed transiently (5xx, timeout, connection reset)
    UpstreamTransient,
}

/// Upload relay errors
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("no video file in multipart body")]
    MissingFile,

    #[error("upload exceeds the {0} byte limit")]
    PayloadTooLarge(u64),

    #[error("failed to read upload body: {0}")]
    BodyRead(#[from] axum::extract::multipart::MultipartError),

    #[error("upstream responded with {status}")]
    UpstreamStatus { status: StatusCode },

    #[error("upstream request failed: {0}")]
    UpstreamTransport(#[from] reqwest::Error),

    #[error("upstream returned an unparseable body: {0}")]
    UpstreamBody(#[source] reqwest::Error),
}

impl RelayError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            RelayError::MissingFile | RelayError::PayloadTooLarge(_) | RelayError::BodyRead(_) => {
                ErrorCategory::Client
            }
            RelayError::UpstreamStatus { status } if status.is_client_error() => {
                ErrorCategory::UpstreamPermanent
            }
            RelayError::UpstreamStatus { .. }
            | RelayError::UpstreamTransport(_)
            | RelayError::UpstreamBody(_) => ErrorCategory::UpstreamTransient,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            RelayError::MissingFile | RelayError::BodyRead(_) => StatusCode::BAD_REQUEST,
            RelayError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            RelayError::UpstreamStatus { .. }
            | RelayError::UpstreamTransport(_)
            | RelayError::UpstreamBody(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Fixed message shown to the caller; the underlying detail stays in logs
    pub fn user_message(&self) -> &'static str {
        match self {
            RelayError::MissingFile => "No video file provided",
            RelayError::PayloadTooLarge(_) => "Video exceeds maximum upload size",
            RelayError::BodyRead(_) => "Invalid multipart payload",
            RelayError::UpstreamStatus { .. }
            | RelayError::UpstreamTransport(_)
            | RelayError::UpstreamBody(_) => "Failed to upload video to storage",
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        (
            self.status_code(),
            Json(json!({ "error": self.user_message() })),
        )
            .into_response()
    }
}
