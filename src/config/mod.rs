use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Transcript provider (YouTube) settings
    pub provider: ProviderConfig,

    /// Transcript selection settings
    pub transcript: TranscriptConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Base URL of the YouTube frontend
    pub base_url: String,

    /// Accept-Language header sent with every request
    pub accept_language: String,

    /// User-Agent header sent with every request
    pub user_agent: String,

    /// Innertube client name used for the player request
    pub client_name: String,

    /// Innertube client version used for the player request
    pub client_version: String,

    /// Request timeout in seconds (no timeout when unset)
    pub timeout_secs: Option<u64>,

    /// Optional HTTP(S) proxy for all requests
    pub proxy: Option<String>,

    /// Honour the HTTP_PROXY/HTTPS_PROXY environment variables
    pub system_proxy: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptConfig {
    /// Language code tried first for manual and generated tracks
    pub preferred_language: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.youtube.com".to_string(),
            accept_language: "en-US".to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            client_name: "ANDROID".to_string(),
            client_version: "20.10.38".to_string(),
            timeout_secs: None,
            proxy: None,
            system_proxy: true,
        }
    }
}

impl Default for TranscriptConfig {
    fn default() -> Self {
        Self {
            preferred_language: "en".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from `explicit`, the default locations, or fall back to defaults.
    ///
    /// Never writes anything to disk.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => Self::config_path(),
        };

        let Some(path) = path else {
            tracing::debug!("No config file found, using defaults");
            return Ok(Self::default());
        };

        tracing::debug!("Loading config from {}", path.display());
        let content = fs_err::read_to_string(&path).context("Failed to read config file")?;
        Self::from_yaml(&content)
    }

    /// Parse and validate a YAML document
    pub fn from_yaml(content: &str) -> Result<Self> {
        // An empty document deserializes as unit, not as an empty map.
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config =
            serde_yaml::from_str(content).context("Failed to parse config file")?;

        config.validate()?;
        Ok(config)
    }

    /// Locate an existing config file
    fn config_path() -> Option<PathBuf> {
        let local_config = PathBuf::from("yt-transcript.yaml");
        if local_config.exists() {
            return Some(local_config);
        }

        dirs::config_dir()
            .map(|dir| dir.join("yt-transcript").join("config.yaml"))
            .filter(|path| path.exists())
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        validate_http_url(&self.provider.base_url).context("Invalid provider.base_url")?;

        if let Some(proxy) = &self.provider.proxy {
            validate_http_url(proxy).context("Invalid provider.proxy")?;
        }

        if self.transcript.preferred_language.trim().is_empty() {
            anyhow::bail!("transcript.preferred_language must not be empty");
        }

        Ok(())
    }
}

impl ProviderConfig {
    /// Request timeout, if one is configured
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

fn validate_http_url(url: &str) -> Result<Url> {
    let parsed = Url::parse(url).map_err(|_| anyhow::anyhow!("Invalid URL format: {}", url))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        anyhow::bail!("URL must use HTTP or HTTPS protocol");
    }

    Ok(parsed)
}
