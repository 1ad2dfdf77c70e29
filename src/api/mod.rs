pub mod middleware;
pub mod routes;

pub use middleware::log_request_errors;
pub use routes::{healthz, upload_video};
