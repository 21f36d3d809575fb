//! Coordinator configuration

use std::time::Duration;

use onebox_core::env;
use url::Url;

use crate::error::{IndexingError, Result};
use crate::retry::RetryConfig;

/// Immutable per-coordinator configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexingConfig {
    /// Write to the keyword backend
    pub enable_keyword: bool,
    /// Write to the vector backend
    pub enable_vector: bool,
    /// Require every attempted write to succeed, compensating otherwise
    pub transaction_safety: bool,
    /// Documents per concurrent chunk
    pub batch_size: usize,
    /// Total attempts per backend write
    pub max_retries: usize,
    /// Base retry delay; attempt `n` waits `retry_delay * n`
    pub retry_delay: Duration,
    /// Vector service base URL
    pub vector_endpoint: String,
    /// Vector writes are skipped for shorter content
    pub min_vector_content_len: usize,
    /// Pause between batch chunks
    pub chunk_pause: Duration,
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            enable_keyword: true,
            enable_vector: true,
            transaction_safety: true,
            batch_size: 20,
            max_retries: 3,
            retry_delay: Duration::from_millis(1000),
            vector_endpoint: "http://localhost:8001".to_string(),
            min_vector_content_len: 10,
            chunk_pause: Duration::from_millis(100),
        }
    }
}

impl IndexingConfig {
    /// Read `ONEBOX_*` variables, falling back to defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let retry_delay_ms = u64::try_from(defaults.retry_delay.as_millis()).unwrap_or(1000);
        Self {
            enable_keyword: env::flag("ONEBOX_ENABLE_KEYWORD", defaults.enable_keyword),
            enable_vector: env::flag("ONEBOX_ENABLE_VECTOR", defaults.enable_vector),
            transaction_safety: env::flag("ONEBOX_TRANSACTION_SAFETY", defaults.transaction_safety),
            batch_size: env::parsed("ONEBOX_BATCH_SIZE", defaults.batch_size),
            max_retries: env::parsed("ONEBOX_MAX_RETRIES", defaults.max_retries),
            retry_delay: Duration::from_millis(env::parsed("ONEBOX_RETRY_DELAY_MS", retry_delay_ms)),
            vector_endpoint: env::string("ONEBOX_VECTOR_URL", &defaults.vector_endpoint),
            ..defaults
        }
    }

    pub fn with_keyword(mut self, enabled: bool) -> Self {
        self.enable_keyword = enabled;
        self
    }

    pub fn with_vector(mut self, enabled: bool) -> Self {
        self.enable_vector = enabled;
        self
    }

    pub fn with_transaction_safety(mut self, enabled: bool) -> Self {
        self.transaction_safety = enabled;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    pub fn with_vector_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.vector_endpoint = endpoint.into();
        self
    }

    pub fn with_min_vector_content_len(mut self, len: usize) -> Self {
        self.min_vector_content_len = len;
        self
    }

    pub fn with_chunk_pause(mut self, pause: Duration) -> Self {
        self.chunk_pause = pause;
        self
    }

    /// Retry settings derived from this configuration
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.max_retries,
            base_delay: self.retry_delay,
        }
    }

    /// Reject settings the coordinator cannot run with
    pub fn validate(&self) -> Result<()> {
        if !self.enable_keyword && !self.enable_vector {
            return Err(IndexingError::Config("at least one backend must be enabled".to_string()));
        }
        if self.batch_size == 0 {
            return Err(IndexingError::Config("batch_size must be at least 1".to_string()));
        }
        if self.max_retries == 0 {
            return Err(IndexingError::Config("max_retries must be at least 1".to_string()));
        }
        if self.enable_vector {
            let url = Url::parse(&self.vector_endpoint)
                .map_err(|e| IndexingError::Config(format!("vector_endpoint {}: {e}", self.vector_endpoint)))?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(IndexingError::Config(format!(
                    "vector_endpoint {} must use http or https",
                    self.vector_endpoint
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = IndexingConfig::default();
        assert!(config.enable_keyword && config.enable_vector && config.transaction_safety);
        assert_eq!(config.batch_size, 20);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.retry_delay, Duration::from_millis(1000));
        assert_eq!(config.vector_endpoint, "http://localhost:8001");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validation_failures() {
        let bad = [
            IndexingConfig::default().with_batch_size(0),
            IndexingConfig::default().with_max_retries(0),
            IndexingConfig::default().with_keyword(false).with_vector(false),
            IndexingConfig::default().with_vector_endpoint("localhost:8001"),
            IndexingConfig::default().with_vector_endpoint("not a url"),
        ];
        for config in bad {
            assert!(
                matches!(config.validate(), Err(IndexingError::Config(_))),
                "{config:?} should be rejected"
            );
        }
    }

    #[test]
    fn vector_endpoint_ignored_when_vector_disabled() {
        let config = IndexingConfig::default()
            .with_vector(false)
            .with_vector_endpoint("garbage");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn retry_config_mirrors_settings() {
        let retry = IndexingConfig::default()
            .with_max_retries(5)
            .with_retry_delay(Duration::from_millis(250))
            .retry_config();
        assert_eq!(retry.max_attempts, 5);
        assert_eq!(retry.base_delay, Duration::from_millis(250));
    }
}
