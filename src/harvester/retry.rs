//! Retry policy for network calls
//!
//! Every upstream failure is assumed to be transient (rate limiting, an
//! outage, a truncated body). The default policy therefore retries forever
//! with a fixed delay and only returns once the call succeeds; a supervising
//! process is expected to impose a wall-clock limit if one is needed. A
//! maximum attempt count can be configured instead.

use crate::config::RetryConfig;
use crate::HarvestError;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// Delay between attempts when none is configured
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(10);

/// A bounded policy ran out of attempts
#[derive(Debug)]
pub struct RetryError<E> {
    /// Human-readable name of the operation
    pub operation: String,
    /// Number of attempts made
    pub attempts: u32,
    /// Error returned by the final attempt
    pub last: E,
}

impl<E: Display> From<RetryError<E>> for HarvestError {
    fn from(err: RetryError<E>) -> Self {
        HarvestError::RetriesExhausted {
            operation: err.operation,
            attempts: err.attempts,
            last: err.last.to_string(),
        }
    }
}

/// Fixed-delay retry policy injected into every network call site
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    delay: Duration,
    max_attempts: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::forever(DEFAULT_RETRY_DELAY)
    }
}

impl RetryPolicy {
    /// Retries until the operation succeeds
    pub fn forever(delay: Duration) -> Self {
        Self {
            delay,
            max_attempts: None,
        }
    }

    /// Gives up after `max_attempts` failed attempts
    pub fn bounded(delay: Duration, max_attempts: u32) -> Self {
        Self {
            delay,
            max_attempts: Some(max_attempts.max(1)),
        }
    }

    /// Builds the policy described by the `[retry]` config section
    pub fn from_config(config: &RetryConfig) -> Self {
        let delay = Duration::from_secs(config.delay_secs);
        match config.max_attempts {
            0 => Self::forever(delay),
            n => Self::bounded(delay, n),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn max_attempts(&self) -> Option<u32> {
        self.max_attempts
    }

    /// Runs `attempt` until it succeeds or the policy is exhausted
    ///
    /// Each failure is logged once with `operation` as the subject, then the
    /// policy sleeps for its delay before the next attempt.
    ///
    /// # Arguments
    ///
    /// * `operation` - Name used in log lines (e.g. "Comment query for abc")
    /// * `attempt` - Produces a fresh future for every attempt
    ///
    /// # Returns
    ///
    /// * `Ok(T)` - The value of the first successful attempt
    /// * `Err(RetryError)` - Only for bounded policies, after the last attempt
    pub async fn run<T, E, F, Fut>(&self, operation: &str, mut attempt: F) -> Result<T, RetryError<E>>
    where
        E: Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut failures = 0u32;

        loop {
            match attempt().await {
                Ok(value) => {
                    if failures > 0 {
                        tracing::info!("{} succeeded after {} failed attempts", operation, failures);
                    }
                    return Ok(value);
                }
                Err(e) => {
                    failures += 1;

                    if let Some(max) = self.max_attempts {
                        if failures >= max {
                            tracing::error!(
                                "{} failed: {}. Giving up after {} attempts",
                                operation,
                                e,
                                failures
                            );
                            return Err(RetryError {
                                operation: operation.to_string(),
                                attempts: failures,
                                last: e,
                            });
                        }
                    }

                    tracing::warn!(
                        "{} failed: {}. Retrying in {} seconds...",
                        operation,
                        e,
                        self.delay.as_secs_f64()
                    );
                    tokio::time::sleep(self.delay).await;
                }
            }
        }
    }
}
