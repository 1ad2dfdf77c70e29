use crate::upstream::UpstreamClient;
use std::sync::Arc;

/// Shared handler state. One upstream client is reused across all requests so
/// connections are pooled by reqwest.
#[derive(Clone)]
pub struct AppState {
    pub upstream: Arc<UpstreamClient>,
    pub max_upload_bytes: u64,
}

impl AppState {
    pub fn new(upstream: UpstreamClient, max_upload_bytes: u64) -> Self {
        Self {
            upstream: Arc::new(upstream),
            max_upload_bytes,
        }
    }
}
