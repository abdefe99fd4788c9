use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::config::CaptureConfig;
use crate::{CaptureError, Result};

/// Bounded retry with linear backoff (`backoff × attempt`).
///
/// Only transient errors are retried; anything else is returned on the
/// attempt that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    pub fn from_config(config: &CaptureConfig) -> Self {
        Self::new(config.max_retries, config.retry_backoff)
    }

    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.backoff * attempt
    }

    pub fn should_retry(&self, attempt: u32, err: &CaptureError) -> bool {
        attempt < self.max_attempts && err.is_transient()
    }

    /// Logs the failed attempt and sleeps for its backoff.
    pub async fn pause(&self, operation: &str, attempt: u32, err: &CaptureError) {
        let delay = self.delay_for(attempt);
        warn!(
            operation,
            attempt,
            max_attempts = self.max_attempts,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "attempt failed; retrying"
        );
        tokio::time::sleep(delay).await;
    }

    /// Runs `f` until it succeeds or the policy gives up. `f` receives the
    /// 1-based attempt number.
    ///
    /// Operations that need `&mut` access to a page are retried with an
    /// explicit loop over [`should_retry`](Self::should_retry) and
    /// [`pause`](Self::pause) instead.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut f: F) -> Result<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 1;
        loop {
            match f(attempt).await {
                Ok(value) => return Ok(value),
                Err(err) if self.should_retry(attempt, &err) => {
                    self.pause(operation, attempt, &err).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
