pub mod api;
pub mod app_state;
pub mod client;
pub mod config;
pub mod error;
pub mod session;
pub mod upstream;

use axum::Router;
use axum::extract::{DefaultBodyLimit, Extension};
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tower_http::cors::Any;
use tower_http::cors::CorsLayer;
use tracing::info;

//
// Re-export
//
pub use api::{healthz, log_request_errors, upload_video};
pub use app_state::AppState;
pub use client::{UploadClient, UploadError};
pub use config::Config;
pub use error::{ErrorCategory, RelayError};
pub use session::{PendingUpload, ProgressHandle, SessionError, UploadSession, UploadStatus};
pub use upstream::{UpstreamClient, encode_file_name};

/// Build the relay router around a prepared state.
///
/// Split from [`run`] so tests can serve it on an ephemeral port.
pub fn app(state: AppState) -> Router {
    // CORS layer
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/upload", post(upload_video))
        .route("/healthz", get(healthz))
        .layer(axum::middleware::from_fn(api::log_request_errors))
        // The streaming upload handler enforces its own size cap
        .layer(DefaultBodyLimit::disable())
        .layer(cors)
        .layer(Extension(state))
}

pub async fn run(config: Config) -> anyhow::Result<()> {
    let upstream = UpstreamClient::from_config(&config)?;
    let state = AppState::new(upstream, config.max_upload_bytes);
    let app = app(state);

    let addr = format!("0.0.0.0:{}", config.listen_on_port);
    info!("Upload relay listening on {addr}");
    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
