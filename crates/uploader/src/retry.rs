//! Bounded retry with linear backoff.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use camvault_cloud::ApiError;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Attempt budget and delay schedule for a single remote call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    /// Delay after the first failed attempt.
    pub initial_delay: Duration,
    /// Added to the delay for each further failed attempt.
    pub delay_step: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(10),
            delay_step: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_delay: Duration, delay_step: Duration) -> Self {
        Self {
            max_attempts,
            initial_delay,
            delay_step,
        }
    }

    /// Delay after failed attempt `attempt` (1-based).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.initial_delay + self.delay_step * attempt.saturating_sub(1)
    }
}

/// Errors that know whether another attempt may succeed.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

impl Retryable for ApiError {
    fn is_retryable(&self) -> bool {
        ApiError::is_retryable(self)
    }
}

/// Why [`retry`] gave up.
#[derive(Debug)]
pub enum RetryError<E> {
    /// The token fired during an attempt or a backoff sleep.
    Cancelled,
    /// The last error returned by the operation, unchanged.
    Failed(E),
}

/// Runs `op` until it succeeds, fails with a non-retryable error, or the
/// attempt budget is spent.
///
/// Sleeps only between attempts, never after the last one. Each attempt
/// and each sleep races `cancel`.
pub async fn retry<T, E, F, Fut>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    operation: &str,
    mut op: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable + fmt::Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(RetryError::Cancelled),
            r = op() => r,
        };

        let err = match result {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };

        if !err.is_retryable() || attempt >= max_attempts {
            return Err(RetryError::Failed(err));
        }

        let delay = policy.delay_for_attempt(attempt);
        warn!(
            operation,
            attempt,
            max_attempts,
            delay_secs = delay.as_secs_f64(),
            error = %err,
            "remote call failed, retrying"
        );

        tokio::select! {
            _ = cancel.cancelled() => return Err(RetryError::Cancelled),
            _ = tokio::time::sleep(delay) => {}
        }
        attempt += 1;
    }
}
