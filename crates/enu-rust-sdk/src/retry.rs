//! Retry with exponential backoff for read requests.
//!
//! Broadcasting is never retried; a timed-out push may still have reached
//! the chain. Only idempotent reads (chain info, ABIs, required keys) go
//! through [`RetryExecutor`].

use crate::error::{EnuError, EnuResult};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// Configuration for retry behavior on read requests.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Maximum number of retry attempts after the initial try.
    pub max_retries: u32,
    /// Initial delay before the first retry, in milliseconds.
    pub initial_delay_ms: u64,
    /// Cap on any single delay, in milliseconds.
    pub max_delay_ms: u64,
    /// Base of the exponential backoff.
    pub exponential_base: f64,
    /// Whether to randomize delays.
    pub jitter: bool,
    /// Fraction of the delay used as the jitter range.
    pub jitter_factor: f64,
    /// HTTP status codes that warrant a retry.
    pub retryable_status_codes: Vec<u16>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 100,
            max_delay_ms: 10_000,
            exponential_base: 2.0,
            jitter: true,
            jitter_factor: 0.5,
            retryable_status_codes: vec![408, 429, 500, 502, 503, 504],
        }
    }
}

impl RetryConfig {
    /// A config that never retries.
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    /// Retries more times with shorter delays. Suits latency-sensitive
    /// callers talking to a nearby node.
    pub fn aggressive() -> Self {
        Self {
            max_retries: 5,
            initial_delay_ms: 50,
            max_delay_ms: 5_000,
            exponential_base: 1.5,
            jitter: true,
            jitter_factor: 0.3,
            ..Default::default()
        }
    }

    /// Fewer retries with longer delays, for congested public endpoints.
    pub fn conservative() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 500,
            max_delay_ms: 30_000,
            exponential_base: 2.0,
            jitter: true,
            jitter_factor: 0.5,
            ..Default::default()
        }
    }

    /// Returns a builder for custom configs.
    pub fn builder() -> RetryConfigBuilder {
        RetryConfigBuilder::default()
    }

    /// The delay to apply before the given attempt (1-based).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let exp = self.exponential_base.powi(attempt.saturating_sub(1) as i32);
        let mut delay_ms = (self.initial_delay_ms as f64 * exp).min(self.max_delay_ms as f64);

        if self.jitter {
            let jitter_range = delay_ms * self.jitter_factor;
            let offset = rand::random::<f64>() * jitter_range * 2.0 - jitter_range;
            delay_ms = (delay_ms + offset).max(0.0);
        }

        Duration::from_millis(delay_ms as u64)
    }

    /// Whether an HTTP status code warrants a retry.
    pub fn is_retryable_status(&self, status: u16) -> bool {
        self.retryable_status_codes.contains(&status)
    }

    /// Whether an error warrants a retry under this config.
    pub fn is_retryable_error(&self, error: &EnuError) -> bool {
        match error {
            EnuError::Api { status_code, .. } => self.is_retryable_status(*status_code),
            _ => error.is_retryable(),
        }
    }
}

/// Builder for [`RetryConfig`].
#[derive(Debug, Default)]
pub struct RetryConfigBuilder {
    max_retries: Option<u32>,
    initial_delay_ms: Option<u64>,
    max_delay_ms: Option<u64>,
    exponential_base: Option<f64>,
    jitter: Option<bool>,
    jitter_factor: Option<f64>,
    retryable_status_codes: Option<Vec<u16>>,
}

impl RetryConfigBuilder {
    /// Sets the maximum number of retries.
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    /// Sets the initial delay in milliseconds.
    pub fn initial_delay_ms(mut self, ms: u64) -> Self {
        self.initial_delay_ms = Some(ms);
        self
    }

    /// Sets the maximum delay in milliseconds.
    pub fn max_delay_ms(mut self, ms: u64) -> Self {
        self.max_delay_ms = Some(ms);
        self
    }

    /// Sets the exponential base.
    pub fn exponential_base(mut self, base: f64) -> Self {
        self.exponential_base = Some(base);
        self
    }

    /// Enables or disables jitter.
    pub fn jitter(mut self, jitter: bool) -> Self {
        self.jitter = Some(jitter);
        self
    }

    /// Sets the jitter factor.
    pub fn jitter_factor(mut self, factor: f64) -> Self {
        self.jitter_factor = Some(factor);
        self
    }

    /// Sets the retryable status codes.
    pub fn retryable_status_codes(mut self, codes: Vec<u16>) -> Self {
        self.retryable_status_codes = Some(codes);
        self
    }

    /// Builds the config, filling unset fields from the default.
    pub fn build(self) -> RetryConfig {
        let default = RetryConfig::default();
        RetryConfig {
            max_retries: self.max_retries.unwrap_or(default.max_retries),
            initial_delay_ms: self.initial_delay_ms.unwrap_or(default.initial_delay_ms),
            max_delay_ms: self.max_delay_ms.unwrap_or(default.max_delay_ms),
            exponential_base: self.exponential_base.unwrap_or(default.exponential_base),
            jitter: self.jitter.unwrap_or(default.jitter),
            jitter_factor: self.jitter_factor.unwrap_or(default.jitter_factor),
            retryable_status_codes: self
                .retryable_status_codes
                .unwrap_or(default.retryable_status_codes),
        }
    }
}

/// Executes an async operation with automatic retry.
#[derive(Debug, Clone)]
pub struct RetryExecutor {
    config: RetryConfig,
}

impl RetryExecutor {
    /// Creates an executor with the given config.
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Creates an executor with the default config.
    pub fn with_defaults() -> Self {
        Self::new(RetryConfig::default())
    }

    /// Runs the operation, retrying retryable failures up to the configured
    /// limit.
    pub async fn execute<F, Fut, T>(&self, operation: F) -> EnuResult<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = EnuResult<T>>,
    {
        let mut attempt = 0;

        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(error) => {
                    if attempt >= self.config.max_retries
                        || !self.config.is_retryable_error(&error)
                    {
                        return Err(error);
                    }

                    attempt += 1;
                    tracing::debug!(attempt, %error, "retrying request");

                    let delay = self.config.delay_for_attempt(attempt);
                    if !delay.is_zero() {
                        sleep(delay).await;
                    }
                }
            }
        }
    }
}
