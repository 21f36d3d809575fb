//! Retry logic for backend writes

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Total attempts, including the first
    pub max_attempts: usize,
    /// Failed attempt `n` waits `base_delay * n`
    pub base_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
        }
    }
}

pub struct RetryPolicy {
    config: RetryConfig,
    failed_attempts: usize,
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self {
            config,
            failed_attempts: 0,
        }
    }

    /// Record a failed attempt. Returns the wait before the next one, or
    /// `None` once every attempt is used.
    pub fn next_delay(&mut self) -> Option<Duration> {
        self.failed_attempts += 1;
        if self.failed_attempts >= self.config.max_attempts {
            return None;
        }
        let factor = u32::try_from(self.failed_attempts).unwrap_or(u32::MAX);
        Some(self.config.base_delay.saturating_mul(factor))
    }

    pub fn attempt(&self) -> usize {
        self.failed_attempts
    }
}

/// Run `operation` until it succeeds or the attempts run out. Intermediate
/// failures are logged; only the last one is returned.
pub async fn with_retry<F, Fut, T, E>(operation_name: &str, mut operation: F, config: &RetryConfig) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut policy = RetryPolicy::new(config.clone());

    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) => {
                if let Some(delay) = policy.next_delay() {
                    warn!(
                        operation = operation_name,
                        attempt = policy.attempt(),
                        delay_ms = delay.as_millis(),
                        error = %e,
                        "Operation failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                } else {
                    debug!(
                        operation = operation_name,
                        attempts = policy.attempt(),
                        error = %e,
                        "Operation failed after all retries"
                    );
                    return Err(e);
                }
            }
        }
    }
}
