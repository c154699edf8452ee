//! Retry policy with exponential backoff
//!
//! Every network operation in the pipeline (feed fetch, landing page fetch,
//! HEAD probe, transfer attempt) runs through [`RetryPolicy::execute`] with its
//! own attempt budget. Only transient failures are retried; anything else is
//! returned straight away.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::app::coordinator::signals::ShutdownSignal;
use crate::constants::limits;
use crate::errors::{DownloadError, DownloadResult};

/// Stateless retry parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts including the first
    pub max_attempts: u32,
    /// Sleep before the first retry
    #[serde(with = "humantime_serde")]
    pub initial_delay: Duration,
    /// Factor applied to the sleep after each retry
    pub backoff_multiplier: f64,
    /// Ceiling on any single sleep
    #[serde(with = "humantime_serde")]
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: limits::MAX_ATTEMPTS,
            initial_delay: limits::RETRY_INITIAL_DELAY,
            backoff_multiplier: limits::RETRY_BACKOFF_MULTIPLIER,
            max_delay: limits::RETRY_MAX_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Sleep before retry number `retry` (zero-based)
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = self.backoff_multiplier.powi(retry.min(i32::MAX as u32) as i32);
        let secs = self.initial_delay.as_secs_f64() * factor;
        if !secs.is_finite() || secs >= self.max_delay.as_secs_f64() {
            self.max_delay
        } else {
            Duration::from_secs_f64(secs.max(0.0))
        }
    }

    /// Run `operation` until it succeeds, fails permanently or the budget runs out
    ///
    /// # Arguments
    ///
    /// * `label` - Short description used in log lines
    /// * `shutdown` - Interrupts backoff sleeps
    /// * `operation` - Produces a fresh attempt each time it is called
    ///
    /// # Errors
    ///
    /// Returns the first non-transient error unchanged,
    /// `DownloadError::RetriesExhausted` when every attempt failed transiently,
    /// or `DownloadError::Cancelled` when shutdown interrupts a backoff sleep.
    pub async fn execute<T, F, Fut>(
        &self,
        label: &str,
        shutdown: &ShutdownSignal,
        mut operation: F,
    ) -> DownloadResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = DownloadResult<T>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            if shutdown.is_triggered() {
                return Err(DownloadError::Cancelled);
            }

            match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!("{} succeeded on attempt {}", label, attempt);
                    }
                    return Ok(value);
                }
                Err(e) if !e.is_transient() => return Err(e),
                Err(e) if attempt >= max_attempts => {
                    warn!("{} failed after {} attempts: {}", label, attempt, e);
                    return Err(DownloadError::RetriesExhausted {
                        attempts: attempt,
                        source: Box::new(e),
                    });
                }
                Err(e) => {
                    let delay = self.delay_for(attempt - 1);
                    warn!(
                        "{} failed (attempt {}/{}): {}. Retrying in {}ms",
                        label,
                        attempt,
                        max_attempts,
                        e,
                        delay.as_millis()
                    );

                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = shutdown.triggered() => return Err(DownloadError::Cancelled),
                    }
                    attempt += 1;
                }
            }
        }
    }
}
