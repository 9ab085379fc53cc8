//! Collector configuration, read from TOML.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::collector::BatchCollector;
use crate::error::ClientError;
use crate::fetch::{FetchConfig, SnapshotFetcher, DEFAULT_MAX_BODY_BYTES, DEFAULT_METRICS_PATH};

pub const DESCRIPTION: &str = "Read Mesos agents state information";

pub const SAMPLE_CONFIG: &str = r#"# An array of addresses to gather stats about. That is, Mesos masters
# or/and agents URIs.
urls = ["http://localhost:5050", "http://localhost:5051"]

# Deadline for response headers, per request.
timeout = "3s"

# How often `run` gathers.
interval = "10s"

# metrics_path = "/metrics/snapshot"
# max_body_bytes = 8388608

# Stop in-flight requests once one endpoint has failed the batch.
cancel_on_error = false
"#;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid duration for '{field}': {value}")]
    Duration { field: &'static str, value: String },

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error(transparent)]
    Client(#[from] ClientError),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct GatherConfig {
    pub urls: Vec<String>,
    pub timeout: String,
    pub interval: String,
    pub metrics_path: String,
    pub max_body_bytes: usize,
    pub cancel_on_error: bool,
}

impl Default for GatherConfig {
    fn default() -> Self {
        Self {
            urls: Vec::new(),
            timeout: "3s".to_string(),
            interval: "10s".to_string(),
            metrics_path: DEFAULT_METRICS_PATH.to_string(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            cancel_on_error: false,
        }
    }
}

impl GatherConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: GatherConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let timeout = self.timeout()?;
        if timeout.is_zero() {
            return Err(ConfigError::Invalid("timeout must be greater than zero".to_string()));
        }
        if self.interval()?.is_zero() {
            return Err(ConfigError::Invalid("interval must be greater than zero".to_string()));
        }
        if self.max_body_bytes == 0 {
            return Err(ConfigError::Invalid("max_body_bytes must be greater than zero".to_string()));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Result<Duration, ConfigError> {
        parse_duration(&self.timeout).ok_or_else(|| ConfigError::Duration {
            field: "timeout",
            value: self.timeout.clone(),
        })
    }

    pub fn interval(&self) -> Result<Duration, ConfigError> {
        parse_duration(&self.interval).ok_or_else(|| ConfigError::Duration {
            field: "interval",
            value: self.interval.clone(),
        })
    }

    pub fn fetch_config(&self) -> Result<FetchConfig, ConfigError> {
        Ok(FetchConfig {
            timeout: self.timeout()?,
            metrics_path: self.metrics_path.clone(),
            max_body_bytes: self.max_body_bytes,
            ..FetchConfig::default()
        })
    }

    /// A collector wired with this configuration and the system hostname.
    pub fn build_collector(&self) -> Result<BatchCollector, ConfigError> {
        let fetcher = SnapshotFetcher::new(self.fetch_config()?)?;
        Ok(BatchCollector::new(fetcher).with_cancel_on_error(self.cancel_on_error))
    }
}

/// Parse a duration string like "5s", "500ms", "1m", or bare seconds.
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if let Some(ms) = s.strip_suffix("ms") {
        ms.trim().parse::<u64>().ok().map(Duration::from_millis)
    } else if let Some(secs) = s.strip_suffix('s') {
        secs.trim().parse::<u64>().ok().map(Duration::from_secs)
    } else if let Some(mins) = s.strip_suffix('m') {
        mins.trim().parse::<u64>().ok().map(|m| Duration::from_secs(m * 60))
    } else {
        s.parse::<u64>().ok().map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_config_parses() {
        let config = GatherConfig::parse(SAMPLE_CONFIG).unwrap();
        assert_eq!(config.urls, vec!["http://localhost:5050", "http://localhost:5051"]);
        assert_eq!(config.timeout().unwrap(), Duration::from_secs(3));
        assert_eq!(config.interval().unwrap(), Duration::from_secs(10));
        assert!(!config.cancel_on_error);
    }

    #[test]
    fn missing_keys_take_defaults() {
        let config = GatherConfig::parse(r#"urls = ["http://m:5050"]"#).unwrap();
        assert_eq!(config.metrics_path, "/metrics/snapshot");
        assert_eq!(config.max_body_bytes, DEFAULT_MAX_BODY_BYTES);
        let fetch = config.fetch_config().unwrap();
        assert_eq!(fetch.timeout, Duration::from_secs(3));
    }

    #[test]
    fn rejects_bad_duration() {
        let err = GatherConfig::parse("timeout = \"soon\"").unwrap_err();
        assert!(matches!(err, ConfigError::Duration { field: "timeout", .. }));
    }

    #[test]
    fn rejects_zero_timeout() {
        let err = GatherConfig::parse("timeout = \"0s\"").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_unknown_keys() {
        let err = GatherConfig::parse("servers = []").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn parse_duration_units() {
        assert_eq!(parse_duration("5s"), Some(Duration::from_secs(5)));
        assert_eq!(parse_duration("500ms"), Some(Duration::from_millis(500)));
        assert_eq!(parse_duration("2m"), Some(Duration::from_secs(120)));
        assert_eq!(parse_duration("10"), Some(Duration::from_secs(10)));
        assert_eq!(parse_duration("fast"), None);
    }
}
