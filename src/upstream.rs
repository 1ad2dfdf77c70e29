use crate::Config;
use crate::error::RelayError;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use std::time::Duration;
use tracing::debug;

pub const API_KEY_HEADER: &str = "X-API-Key";
pub const FILE_NAME_HEADER: &str = "X-File-Name";

/// Everything except unreserved characters gets escaped, so a percent-decode
/// on the upstream side recovers the original filename byte for byte.
const FILE_NAME_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Escape a filename for transport in the X-File-Name header.
pub fn encode_file_name(name: &str) -> String {
    utf8_percent_encode(name, FILE_NAME_SET).to_string()
}

/// Client for the upstream storage/processing service.
///
/// Built once from the service configuration and shared through `AppState`;
/// nothing here touches process environment, so tests can point it at a local
/// mock server.
pub struct UpstreamClient {
    http: reqwest::Client,
    upload_url: String,
    api_key: String,
}

impl UpstreamClient {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let mut builder = reqwest::Client::builder();
        if config.upstream_timeout_secs > 0 {
            builder = builder.timeout(Duration::from_secs(config.upstream_timeout_secs));
        }

        Ok(Self {
            http: builder.build()?,
            upload_url: format!("{}/upload", config.upstream_url.trim_end_matches('/')),
            api_key: config.upstream_api_key.clone(),
        })
    }

    /// Forward one upload to the upstream service.
    ///
    /// The body is streamed as-is; the original filename travels
    /// percent-encoded in the X-File-Name header. A 2xx response yields the
    /// upstream JSON verbatim, anything else becomes a classified
    /// [`RelayError`].
    pub async fn forward(
        &self,
        file_name: &str,
        body: reqwest::Body,
    ) -> Result<serde_json::Value, RelayError> {
        let encoded_name = encode_file_name(file_name);
        debug!(file_name, %encoded_name, "Forwarding upload upstream");

        let response = self
            .http
            .post(&self.upload_url)
            .header(CONTENT_TYPE, HeaderValue::from_static("application/octet-stream"))
            .header(API_KEY_HEADER, self.api_key.as_str())
            .header(FILE_NAME_HEADER, encoded_name)
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RelayError::UpstreamStatus { status });
        }

        response
            .json::<serde_json::Value>()
            .await
            .map_err(RelayError::UpstreamBody)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use percent_encoding::percent_decode_str;

    #[test]
    fn test_plain_filename_unchanged() {
        assert_eq!(encode_file_name("clip_01.mp4"), "clip_01.mp4");
    }

    #[test]
    fn test_reserved_characters_escaped() {
        assert_eq!(encode_file_name("my clip.mp4"), "my%20clip.mp4");
        assert_eq!(encode_file_name("50%.mp4"), "50%25.mp4");
        assert_eq!(encode_file_name("a\nb.mp4"), "a%0Ab.mp4");
    }

    #[test]
    fn test_encoding_round_trips() {
        for name in [
            "clip.mp4",
            "mön ster%.mp4",
            "emoji 🎬.mov",
            "line\nbreak.mkv",
            "semi;colon:and/slash.mp4",
        ] {
            let encoded = encode_file_name(name);
            // Header values must stay visible ASCII
            assert!(encoded.chars().all(|c| c.is_ascii_graphic()));

            let decoded = percent_decode_str(&encoded).decode_utf8().unwrap();
            assert_eq!(decoded, name);
        }
    }

    #[test]
    fn test_upload_url_joins_without_double_slash() {
        let config = Config {
            upstream_url: "http://vm.example.com/".into(),
            upstream_api_key: "secret".into(),
            ..Default::default()
        };
        let client = UpstreamClient::from_config(&config).unwrap();
        assert_eq!(client.upload_url, "http://vm.example.com/upload");
    }
}
