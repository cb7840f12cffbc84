//! Backoff schedules for transient failures and submit-then-poll waits.

use std::future::Future;
use std::time::Duration;

use crate::core::error::ProviderError;
use crate::core::types::Provider;

/// Configuration for retry and polling behavior.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first.
    pub max_attempts: u32,

    /// Delay before the first retry.
    pub initial_delay: Duration,

    /// Maximum delay between attempts.
    pub max_delay: Duration,

    /// Multiplier for exponential backoff.
    pub backoff_multiplier: f64,

    /// Whether to add deterministic jitter to delays.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(8),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Creates a new retry configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// A single attempt, no retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Schedule suited to polling a submitted analysis.
    pub fn polling() -> Self {
        Self {
            max_attempts: 10,
            initial_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(15),
            backoff_multiplier: 1.5,
            jitter: false,
        }
    }

    /// Sets the maximum number of attempts.
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Sets the initial delay.
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Sets the maximum delay.
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Sets the backoff multiplier.
    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = if multiplier.is_finite() {
            multiplier.max(1.0)
        } else {
            1.0
        };
        self
    }

    /// Enables or disables jitter.
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Calculates the delay before a given attempt (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let exponent = i32::try_from(attempt - 1).unwrap_or(i32::MAX);
        let base_delay =
            self.initial_delay.as_millis() as f64 * self.backoff_multiplier.powi(exponent);

        let capped_delay = base_delay.min(self.max_delay.as_millis() as f64);

        let final_delay = if self.jitter {
            // golden-ratio sequence keeps the factor in [0.5, 1.0)
            let jitter_factor = 0.5 + (attempt as f64 * 0.618033988749895) % 0.5;
            capped_delay * jitter_factor
        } else {
            capped_delay
        };

        Duration::from_millis(final_delay as u64)
    }

    /// Returns whether another attempt should be made.
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    /// Sum of every delay the schedule can wait through.
    pub fn total_delay(&self) -> Duration {
        (0..self.max_attempts)
            .map(|attempt| self.delay_for_attempt(attempt))
            .sum()
    }
}

/// Runs `operation`, retrying transient provider errors on the schedule.
///
/// Permanent errors and exhausted polls are returned immediately. A
/// `retry_after` hint from the provider is a lower bound on the next delay.
pub async fn retry_async<F, Fut, T>(config: &RetryConfig, mut operation: F) -> Result<T, ProviderError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    let mut attempt = 0;
    let mut hint = None;
    loop {
        let delay = match hint.take() {
            Some(retry_after) => config.delay_for_attempt(attempt).max(retry_after),
            None => config.delay_for_attempt(attempt),
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) => {
                attempt += 1;
                if !e.is_retryable() || !config.should_retry(attempt) {
                    return Err(e);
                }
                hint = e.retry_after();
                tracing::debug!(
                    attempt = attempt,
                    max_attempts = config.max_attempts,
                    error = %e,
                    "Retrying provider call"
                );
            }
        }
    }
}

/// Polls `check` until it yields a value.
///
/// `check` returns `Ok(None)` while the remote work is still pending. After
/// `max_attempts` pending answers the poll gives up with
/// `ProviderError::AnalysisPending`. Errors from `check` end the poll.
pub async fn poll_until_ready<F, Fut, T>(
    config: &RetryConfig,
    provider: Provider,
    mut check: F,
) -> Result<T, ProviderError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, ProviderError>>,
{
    let mut attempt = 0;
    while config.should_retry(attempt) {
        let delay = config.delay_for_attempt(attempt);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if let Some(ready) = check().await? {
            return Ok(ready);
        }
        attempt += 1;
        tracing::trace!(provider = %provider, attempt, "Analysis still pending");
    }

    Err(ProviderError::AnalysisPending {
        provider,
        attempts: attempt,
    })
}
