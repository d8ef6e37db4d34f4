//! Configuration of the Orcasound player core
//!
//! The YAML block mirrors the other source crates: every field has a
//! default, so an empty document is a valid configuration.
//!
//! ```yaml
//! storage_endpoint: https://s3-us-west-2.amazonaws.com
//! bucket: streaming-orcasound-net
//! polling:
//!   interval_secs: 10
//!   request_timeout_secs: 5
//! playback:
//!   autoplay: true
//! ```

use crate::error::{Error, Result};
use crate::pointer::{PointerClient, DEFAULT_USER_AGENT};
use crate::poller::DEFAULT_POLL_INTERVAL_SECS;
use crate::resolver::{ManifestResolver, DEFAULT_BUCKET, DEFAULT_STORAGE_ENDPOINT};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Top-level configuration block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrcasoundConfig {
    #[serde(default = "OrcasoundConfig::default_storage_endpoint")]
    pub storage_endpoint: String,
    #[serde(default = "OrcasoundConfig::default_bucket")]
    pub bucket: String,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub playback: PlaybackConfig,
}

impl OrcasoundConfig {
    fn default_storage_endpoint() -> String {
        DEFAULT_STORAGE_ENDPOINT.to_string()
    }

    fn default_bucket() -> String {
        DEFAULT_BUCKET.to_string()
    }
}

impl Default for OrcasoundConfig {
    fn default() -> Self {
        Self {
            storage_endpoint: Self::default_storage_endpoint(),
            bucket: Self::default_bucket(),
            polling: PollingConfig::default(),
            playback: PlaybackConfig::default(),
        }
    }
}

/// Pointer polling parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollingConfig {
    #[serde(default = "PollingConfig::default_interval_secs")]
    pub interval_secs: u64,
    /// No timeout unless set: a hung request is simply replaced on the next tick
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    #[serde(default = "PollingConfig::default_user_agent")]
    pub user_agent: String,
}

impl PollingConfig {
    const fn default_interval_secs() -> u64 {
        DEFAULT_POLL_INTERVAL_SECS
    }

    fn default_user_agent() -> String {
        DEFAULT_USER_AGENT.to_string()
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_secs: Self::default_interval_secs(),
            request_timeout_secs: None,
            user_agent: Self::default_user_agent(),
        }
    }
}

/// Playback engine parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackConfig {
    #[serde(default = "PlaybackConfig::default_autoplay")]
    pub autoplay: bool,
}

impl PlaybackConfig {
    const fn default_autoplay() -> bool {
        true
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            autoplay: Self::default_autoplay(),
        }
    }
}

impl OrcasoundConfig {
    /// Parse and validate a YAML document
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a YAML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Check that the values can produce working addresses
    pub fn validate(&self) -> Result<()> {
        let endpoint = Url::parse(&self.storage_endpoint)?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(Error::invalid_config(format!(
                "storage_endpoint must be http(s), got {}",
                endpoint.scheme()
            )));
        }

        if self.bucket.trim().is_empty() || self.bucket.contains('/') {
            return Err(Error::invalid_config(format!(
                "invalid bucket name: {:?}",
                self.bucket
            )));
        }

        if self.polling.interval_secs == 0 {
            return Err(Error::invalid_config("polling.interval_secs must be > 0"));
        }

        Ok(())
    }

    /// Resolver for the configured endpoint and bucket
    pub fn resolver(&self) -> ManifestResolver {
        ManifestResolver::new(&self.storage_endpoint, &self.bucket)
    }

    /// HTTP pointer client with the configured timeout and user agent
    pub fn pointer_client(&self) -> Result<PointerClient> {
        let mut builder = PointerClient::builder().user_agent(&self.polling.user_agent);
        if let Some(timeout) = self.polling.request_timeout() {
            builder = builder.timeout(timeout);
        }
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = OrcasoundConfig::from_yaml_str("{}").unwrap();
        assert_eq!(config, OrcasoundConfig::default());
        assert_eq!(config.polling.interval(), Duration::from_secs(10));
        assert_eq!(config.polling.request_timeout(), None);
        assert!(config.playback.autoplay);
    }

    #[test]
    fn test_partial_document() {
        let yaml = r#"
bucket: dev-streaming-orcasound-net
polling:
  request_timeout_secs: 5
"#;
        let config = OrcasoundConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.bucket, "dev-streaming-orcasound-net");
        assert_eq!(config.storage_endpoint, DEFAULT_STORAGE_ENDPOINT);
        assert_eq!(config.polling.interval_secs, 10);
        assert_eq!(config.polling.request_timeout(), Some(Duration::from_secs(5)));
        assert_eq!(
            config.resolver().storage_root(),
            "https://s3-us-west-2.amazonaws.com/dev-streaming-orcasound-net"
        );
    }

    #[test]
    fn test_validation() {
        assert!(matches!(
            OrcasoundConfig::from_yaml_str("storage_endpoint: not a url"),
            Err(Error::InvalidUrl(_))
        ));
        assert!(matches!(
            OrcasoundConfig::from_yaml_str("storage_endpoint: ftp://example.com"),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(
            OrcasoundConfig::from_yaml_str("bucket: ''"),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(
            OrcasoundConfig::from_yaml_str("polling:\n  interval_secs: 0"),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_bad_yaml() {
        assert!(matches!(
            OrcasoundConfig::from_yaml_str("polling: [1, 2"),
            Err(Error::Yaml(_))
        ));
    }
}
