//! Access configuration
//!
//! Tunables shared by every streamer and batch splitter a resource builds.
//! Loaded from YAML, or JSON since YAML accepts it.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Paging, batching and timeout settings for remote collections
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AccessConfig {
    /// Expected number of items on a full page or cursor window
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Maximum number of ids sent in one bulk request
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Number of bulk requests in flight at once
    #[serde(default = "default_batch_concurrency")]
    pub batch_concurrency: usize,

    /// Hard cap on requests per traversal
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_pages: Option<u32>,

    /// Per-request timeout in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_ms: Option<u64>,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            batch_size: default_batch_size(),
            batch_concurrency: default_batch_concurrency(),
            max_pages: None,
            request_timeout_ms: None,
        }
    }
}

fn default_page_size() -> usize {
    100
}

fn default_batch_size() -> usize {
    100
}

fn default_batch_concurrency() -> usize {
    1
}

impl AccessConfig {
    /// Set the expected full-page size
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Set the maximum ids per bulk request
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Set how many bulk requests may run at once
    #[must_use]
    pub fn with_batch_concurrency(mut self, concurrency: usize) -> Self {
        self.batch_concurrency = concurrency;
        self
    }

    /// Cap the number of requests per traversal
    #[must_use]
    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = Some(max_pages);
        self
    }

    /// Set the per-request timeout
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    /// Per-request timeout, if one is configured
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }

    /// Reject settings that would stall or never issue a request
    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(Error::invalid_value("page_size", "must be at least 1"));
        }
        if self.batch_size == 0 {
            return Err(Error::invalid_value("batch_size", "must be at least 1"));
        }
        if self.batch_concurrency == 0 {
            return Err(Error::invalid_value(
                "batch_concurrency",
                "must be at least 1",
            ));
        }
        if self.max_pages == Some(0) {
            return Err(Error::invalid_value("max_pages", "must be at least 1"));
        }
        if self.request_timeout_ms == Some(0) {
            return Err(Error::invalid_value(
                "request_timeout_ms",
                "must be greater than 0",
            ));
        }
        Ok(())
    }
}

/// Load and validate an access config from a YAML or JSON file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AccessConfig> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(Error::FileNotFound {
            path: path.display().to_string(),
        });
    }
    let content = std::fs::read_to_string(path)?;
    load_config_from_str(&content)
}

/// Parse and validate an access config from a YAML or JSON string
pub fn load_config_from_str(content: &str) -> Result<AccessConfig> {
    let config: AccessConfig = serde_yaml::from_str(content)?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = AccessConfig::default();
        assert_eq!(config.page_size, 100);
        assert_eq!(config.batch_size, 100);
        assert_eq!(config.batch_concurrency, 1);
        assert!(config.max_pages.is_none());
        assert!(config.request_timeout().is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_yaml_with_defaults() {
        let config = load_config_from_str(
            r"
page_size: 50
request_timeout_ms: 1500
",
        )
        .unwrap();

        assert_eq!(config.page_size, 50);
        assert_eq!(config.batch_size, 100);
        assert_eq!(config.request_timeout(), Some(Duration::from_millis(1500)));
    }

    #[test]
    fn test_parse_json() {
        let config =
            load_config_from_str(r#"{"batch_size": 25, "batch_concurrency": 4, "max_pages": 10}"#)
                .unwrap();

        assert_eq!(config.batch_size, 25);
        assert_eq!(config.batch_concurrency, 4);
        assert_eq!(config.max_pages, Some(10));
    }

    #[test]
    fn test_rejects_zero_sizes() {
        let err = load_config_from_str("batch_size: 0").unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidConfigValue { ref field, .. } if field == "batch_size"
        ));

        let err = AccessConfig::default().with_page_size(0).validate().unwrap_err();
        assert!(err.to_string().contains("page_size"));
    }

    #[test]
    fn test_rejects_unknown_fields() {
        let err = load_config_from_str("page_sise: 10").unwrap_err();
        assert!(matches!(err, Error::YamlParse(_)));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "page_size: 20\nbatch_size: 5").unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.page_size, 20);
        assert_eq!(config.batch_size, 5);
    }

    #[test]
    fn test_load_config_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(dir.path().join("absent.yaml")).unwrap_err();
        assert!(matches!(err, Error::FileNotFound { .. }));
    }
}
