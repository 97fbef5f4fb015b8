//! Retry with exponential backoff for CF API, UAA and BBS requests.
//!
//! Only transient failures are retried: connection and timeout errors, HTTP 5xx
//! and HTTP 429. Everything else fails on the first attempt.

use std::future::Future;
use std::time::Duration;

use crate::error::{ClientError, Result};

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts after the first one (default: 3).
    pub max_retries: u32,
    /// Initial backoff duration (default: 200ms).
    pub initial_backoff: Duration,
    /// Maximum backoff duration (default: 5 seconds).
    pub max_backoff: Duration,
    /// Multiplier for exponential backoff (default: 2.0).
    pub backoff_multiplier: f64,
    /// Whether to add jitter to the backoff (default: true).
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(5),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Configuration with the given retry count and default timings.
    pub fn with_retries(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    /// Computes `initial_backoff * backoff_multiplier^attempt`, capped at
    /// `max_backoff`, plus up to 50% jitter when enabled.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let base_ms = self.initial_backoff.as_millis() as f64;
        let max_ms = self.max_backoff.as_millis() as f64;
        let capped = (base_ms * self.backoff_multiplier.powi(attempt as i32)).min(max_ms);

        if self.jitter {
            let jitter_ms = simple_jitter(capped as u64 / 2);
            Duration::from_millis((capped as u64).saturating_add(jitter_ms))
        } else {
            Duration::from_millis(capped as u64)
        }
    }

    /// Runs `operation` until it succeeds, fails permanently, or the retry
    /// budget is spent. The last error is returned on exhaustion.
    pub async fn run<F, Fut, T>(&self, endpoint: &str, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0u32;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(err) if is_retryable(&err) && attempt < self.max_retries => {
                    let backoff = self.backoff(attempt);
                    tracing::debug!(
                        endpoint,
                        attempt = attempt + 1,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %err,
                        "retrying request"
                    );
                    attempt += 1;
                    tokio::time::sleep(backoff).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

/// Cheap jitter from the sub-second part of the wall clock.
fn simple_jitter(max_ms: u64) -> u64 {
    if max_ms == 0 {
        return 0;
    }
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.subsec_nanos() as u64)
        .unwrap_or(0);
    nanos % max_ms
}

/// True for HTTP statuses worth retrying: any 5xx and 429.
pub fn is_retryable_status(status: u16) -> bool {
    status == 429 || (500..600).contains(&status)
}

/// Check if an error is transient.
pub fn is_retryable(error: &ClientError) -> bool {
    match error {
        ClientError::Status { status, .. } => is_retryable_status(*status),
        ClientError::Http { source, .. } => {
            source.is_timeout()
                || source.is_connect()
                || source.status().map(|s| is_retryable_status(s.as_u16())).unwrap_or(false)
        }
        ClientError::Io(_) => true,
        ClientError::Decode { .. } => false,
        ClientError::Auth { .. } => false,
        ClientError::Tls { .. } => false,
        ClientError::Config { .. } => false,
    }
}
