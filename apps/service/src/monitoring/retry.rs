use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

use super::checker::Prober;
use super::types::CheckResult;

/// Exponential backoff policy for probe retries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries after the first attempt
    pub retry_count: u32,
    pub initial_delay_ms: u64,
    pub multiplier: f64,
    /// Upper bound for a single backoff sleep
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            retry_count: 3,
            initial_delay_ms: 1000,
            multiplier: 2.0,
            max_delay_ms: 5000,
        }
    }
}

impl RetryConfig {
    /// Delay before the retry following 0-indexed `attempt_index`:
    /// `min(initial_delay * multiplier^attempt_index, max_delay)`.
    pub fn backoff_delay(&self, attempt_index: u32) -> Duration {
        let exponent = i32::try_from(attempt_index).unwrap_or(i32::MAX);
        let raw = self.initial_delay_ms as f64 * self.multiplier.powi(exponent);
        let capped = if raw.is_nan() { 0.0 } else { raw.clamp(0.0, self.max_delay_ms as f64) };
        Duration::from_millis(capped as u64)
    }

    /// Total attempts made when every probe fails
    pub fn total_attempts(&self) -> u32 {
        self.retry_count.saturating_add(1)
    }

    /// Worst-case wall-clock cost of one retry sequence
    pub fn worst_case(&self, timeout: Duration) -> Duration {
        let sleeps: Duration = (0..self.retry_count).map(|i| self.backoff_delay(i)).sum();
        sleeps + timeout * self.total_attempts()
    }
}

/// Wraps a prober with a fixed attempt budget and exponential backoff
#[derive(Clone)]
pub struct RetryController {
    prober: Arc<dyn Prober>,
    config: RetryConfig,
}

impl RetryController {
    pub fn new(prober: Arc<dyn Prober>, config: RetryConfig) -> Self {
        Self { prober, config }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Probe with the process-wide retry policy
    pub async fn check(&self, url: &str, timeout: Duration) -> CheckResult {
        self.check_with(url, timeout, &self.config).await
    }

    /// Probe with an explicit policy for this call only.
    ///
    /// Returns on the first success; otherwise returns the last attempt's
    /// result. Either way `response_time` is cumulative since the sequence
    /// began (backoff sleeps included) and `attempt_number` is the number of
    /// attempts made.
    pub async fn check_with(&self, url: &str, timeout: Duration, config: &RetryConfig) -> CheckResult {
        let total_attempts = config.total_attempts();
        let started = Instant::now();
        let mut attempt: u32 = 0;

        loop {
            let mut result = self.prober.probe(url, timeout).await;
            attempt += 1;

            if result.success || attempt >= total_attempts {
                result.response_time = started.elapsed().as_millis() as u64;
                result.attempt_number = Some(attempt);
                return result;
            }

            let delay = config.backoff_delay(attempt - 1);
            info!(
                url,
                attempt,
                total_attempts,
                delay_ms = delay.as_millis() as u64,
                "Check failed, retrying"
            );
            debug!(url, error = result.error_message(), "Last attempt error");
            tokio::time::sleep(delay).await;
        }
    }
}
