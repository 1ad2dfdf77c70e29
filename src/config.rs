use anyhow::Result;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure that can be loaded from CLI, config file, or environment
///
/// Example configuration file content
/// # Marine Relay Configuration
///
/// # Server configuration
/// listen_on_port = 8080
///
/// # Upstream configuration
/// upstream_url = "https://vm.example.com"
/// upstream_api_key = "secret"
///
/// # Upload limits
/// max_upload_bytes = 1073741824
/// upstream_timeout_secs = 0
#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(version, about, long_about = None)]
#[serde(default)]
pub struct Config {
    /// Port to listen on
    #[arg(short, long, default_value_t = 8080)]
    #[serde(default = "default_port")]
    pub listen_on_port: u16,

    /// Base URL of the upstream storage/processing service
    #[arg(short, long, default_value = "")]
    #[serde(default)]
    pub upstream_url: String,

    /// API key forwarded to the upstream service
    #[arg(short = 'k', long, default_value = "")]
    #[serde(default)]
    pub upstream_api_key: String,

    /// Maximum accepted upload size in bytes
    #[arg(short, long, default_value_t = default_max_upload_bytes())]
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: u64,

    /// Upstream request timeout in seconds (0 = disabled)
    #[arg(short = 't', long, default_value_t = 0)]
    #[serde(default)]
    pub upstream_timeout_secs: u64,

    /// Configuration file path (overrides all other arguments)
    #[arg(short, long)]
    #[serde(skip)]
    pub config: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_on_port: default_port(),
            upstream_url: String::new(),
            upstream_api_key: String::new(),
            max_upload_bytes: default_max_upload_bytes(),
            upstream_timeout_secs: 0,
            config: None,
        }
    }
}

impl Config {
    /// Load configuration from CLI args, optionally merging with a config file
    pub fn load() -> Result<Self> {
        // First parse CLI args
        let mut config = Config::parse();

        // If a config file is specified, load it and merge
        if let Some(config_path) = &config.config {
            let file_config = Self::from_file(Path::new(config_path))?;
            config = config.merge_with_file(file_config);
        }

        config.apply_env_fallback();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Merge with file config, CLI args take precedence
    fn merge_with_file(mut self, file_config: Config) -> Self {
        // If CLI value is default, use file value
        if self.listen_on_port == default_port() {
            self.listen_on_port = file_config.listen_on_port;
        }
        if self.upstream_url.is_empty() {
            self.upstream_url = file_config.upstream_url;
        }
        if self.upstream_api_key.is_empty() {
            self.upstream_api_key = file_config.upstream_api_key;
        }
        if self.max_upload_bytes == default_max_upload_bytes() {
            self.max_upload_bytes = file_config.max_upload_bytes;
        }
        if self.upstream_timeout_secs == 0 {
            self.upstream_timeout_secs = file_config.upstream_timeout_secs;
        }

        self
    }

    /// Legacy deployments provide the upstream settings through VM_API_URL and
    /// VM_API_KEY; honor them when nothing more explicit was given.
    fn apply_env_fallback(&mut self) {
        if self.upstream_url.is_empty()
            && let Ok(url) = std::env::var("VM_API_URL")
        {
            self.upstream_url = url;
        }
        if self.upstream_api_key.is_empty()
            && let Ok(key) = std::env::var("VM_API_KEY")
        {
            self.upstream_api_key = key;
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.upstream_url.is_empty() {
            return Err(anyhow::anyhow!(
                "Upstream URL is required (--upstream-url or VM_API_URL)"
            ));
        }
        if !self.upstream_url.starts_with("http://") && !self.upstream_url.starts_with("https://") {
            return Err(anyhow::anyhow!(
                "Upstream URL must start with http:// or https://"
            ));
        }
        if self.upstream_api_key.is_empty() {
            return Err(anyhow::anyhow!(
                "Upstream API key is required (--upstream-api-key or VM_API_KEY)"
            ));
        }
        if self.max_upload_bytes == 0 {
            return Err(anyhow::anyhow!("max_upload_bytes must be greater than 0"));
        }

        Ok(())
    }
}

// Default value functions
fn default_port() -> u16 {
    8080
}

fn default_max_upload_bytes() -> u64 {
    1024 * 1024 * 1024
}
