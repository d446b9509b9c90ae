use std::fmt;
use std::future::Future;
use std::time::Duration;

use rand::Rng;
use serde::Deserialize;
use tracing::{debug, warn};

use super::timeout::{with_timeout, TimeoutError};

/// Jitter is drawn uniformly from `0..=delay / JITTER_DIVISOR` (up to 10%).
const JITTER_DIVISOR: u64 = 10;

/// Governs `retry_with_timeout`. Independent of any batch state.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryOptions {
    /// Total number of attempts, not retries after the first.
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    /// Per-attempt timeout.
    pub timeout_ms: u64,
    pub operation_name: String,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1000,
            max_delay_ms: 10_000,
            timeout_ms: 15_000,
            operation_name: "operation".to_string(),
        }
    }
}

impl RetryOptions {
    /// At least one attempt is always made.
    pub fn attempts(&self) -> u32 {
        self.max_retries.max(1)
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn named(mut self, operation_name: impl Into<String>) -> Self {
        self.operation_name = operation_name.into();
        self
    }

    /// Upper bound on the wall-clock time of one fully retried operation:
    /// every attempt hitting its timeout plus every backoff at maximum jitter.
    pub fn worst_case_ms(&self) -> u64 {
        let attempts = self.attempts();
        let waits: u64 = (0..attempts - 1)
            .map(|attempt| {
                let base = backoff_delay(attempt, self).as_millis() as u64;
                base + base / JITTER_DIVISOR
            })
            .sum();
        self.timeout_ms
            .saturating_mul(attempts as u64)
            .saturating_add(waits)
    }
}

/// Pre-jitter delay after failed attempt `attempt` (0-based):
/// `min(base_delay_ms * 2^attempt, max_delay_ms)`.
pub fn backoff_delay(attempt: u32, options: &RetryOptions) -> Duration {
    let factor = 2u64.checked_pow(attempt).unwrap_or(u64::MAX);
    let delay_ms = options
        .base_delay_ms
        .saturating_mul(factor)
        .min(options.max_delay_ms);
    Duration::from_millis(delay_ms)
}

fn with_jitter(delay: Duration) -> Duration {
    let max_jitter = delay.as_millis() as u64 / JITTER_DIVISOR;
    if max_jitter == 0 {
        return delay;
    }
    delay + Duration::from_millis(rand::thread_rng().gen_range(0..=max_jitter))
}

/// Retries `operation_factory` with exponential backoff and jitter, bounding
/// every attempt with `with_timeout`.
///
/// The factory is called once per attempt because a failed future cannot be
/// polled again. After the last attempt the error from that attempt is
/// returned as-is; earlier errors are only logged.
#[allow(dead_code)]
pub async fn retry_with_timeout<F, Fut, T, E>(
    operation_factory: F,
    options: &RetryOptions,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: From<TimeoutError> + fmt::Display,
{
    retry_with_timeout_if(operation_factory, options, |_| true).await
}

/// Same as `retry_with_timeout`, but gives up immediately on an error for
/// which `should_retry` returns false.
pub async fn retry_with_timeout_if<F, Fut, T, E, P>(
    mut operation_factory: F,
    options: &RetryOptions,
    mut should_retry: P,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: From<TimeoutError> + fmt::Display,
    P: FnMut(&E) -> bool,
{
    let attempts = options.attempts();
    let timeout = Duration::from_millis(options.timeout_ms);
    let mut attempt = 0;

    loop {
        let error = match with_timeout(operation_factory(), timeout, &options.operation_name).await
        {
            Ok(Ok(value)) => {
                if attempt > 0 {
                    debug!(
                        "{} succeeded on attempt {}/{}",
                        options.operation_name,
                        attempt + 1,
                        attempts
                    );
                }
                return Ok(value);
            }
            Ok(Err(e)) => e,
            Err(timed_out) => E::from(timed_out),
        };

        if attempt + 1 >= attempts || !should_retry(&error) {
            return Err(error);
        }

        let delay = with_jitter(backoff_delay(attempt, options));
        warn!(
            "{} attempt {}/{} failed: {}; retrying after {}ms",
            options.operation_name,
            attempt + 1,
            attempts,
            error,
            delay.as_millis()
        );
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use thiserror::Error;
    use tokio::time::Instant;

    #[derive(Debug, Error, PartialEq)]
    enum TestError {
        #[error(transparent)]
        Timeout(#[from] TimeoutError),
        #[error("attempt {0} failed")]
        Failed(u32),
    }

    fn fast_options() -> RetryOptions {
        RetryOptions {
            max_retries: 3,
            base_delay_ms: 1000,
            max_delay_ms: 10_000,
            timeout_ms: 500,
            operation_name: "test-op".to_string(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_always_failing_factory_called_exactly_max_retries_times() {
        let mut calls = 0u32;
        let result: Result<(), TestError> = retry_with_timeout(
            || {
                calls += 1;
                let n = calls;
                async move { Err(TestError::Failed(n)) }
            },
            &fast_options(),
        )
        .await;

        assert_eq!(calls, 3);
        // The surfaced error is the final attempt's, not an aggregate.
        assert_eq!(result, Err(TestError::Failed(3)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_transient_failure() {
        let mut calls = 0u32;
        let result = retry_with_timeout(
            || {
                calls += 1;
                let n = calls;
                async move {
                    if n < 2 {
                        Err(TestError::Failed(n))
                    } else {
                        Ok("done")
                    }
                }
            },
            &fast_options(),
        )
        .await;

        assert_eq!(result, Ok("done"));
        assert_eq!(calls, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_attempts_surface_timeout_error() {
        let mut calls = 0u32;
        let result: Result<(), TestError> = retry_with_timeout(
            || {
                calls += 1;
                std::future::pending()
            },
            &fast_options(),
        )
        .await;

        assert_eq!(calls, 3);
        match result {
            Err(TestError::Timeout(e)) => {
                assert_eq!(e.operation, "test-op");
                assert_eq!(e.timeout_ms, 500);
            }
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_error_stops_immediately() {
        let mut calls = 0u32;
        let result: Result<(), TestError> = retry_with_timeout_if(
            || {
                calls += 1;
                let n = calls;
                async move { Err(TestError::Failed(n)) }
            },
            &fast_options(),
            |e| matches!(e, TestError::Timeout(_)),
        )
        .await;

        assert_eq!(calls, 1);
        assert_eq!(result, Err(TestError::Failed(1)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_observed_delays_grow_within_jitter_bounds() {
        let mut starts = Vec::new();
        let _: Result<(), TestError> = retry_with_timeout(
            || {
                starts.push(Instant::now());
                let n = starts.len() as u32;
                async move { Err(TestError::Failed(n)) }
            },
            &fast_options(),
        )
        .await;

        assert_eq!(starts.len(), 3);
        let first_gap = starts[1] - starts[0];
        let second_gap = starts[2] - starts[1];
        assert!(first_gap >= Duration::from_millis(1000), "{first_gap:?}");
        assert!(first_gap <= Duration::from_millis(1100), "{first_gap:?}");
        assert!(second_gap >= Duration::from_millis(2000), "{second_gap:?}");
        assert!(second_gap <= Duration::from_millis(2200), "{second_gap:?}");
    }

    #[test]
    fn test_backoff_base_is_non_decreasing_and_capped() {
        let options = RetryOptions {
            base_delay_ms: 1000,
            max_delay_ms: 3000,
            ..RetryOptions::default()
        };
        let delays: Vec<u64> = (0..6)
            .map(|a| backoff_delay(a, &options).as_millis() as u64)
            .collect();

        assert_eq!(delays, vec![1000, 2000, 3000, 3000, 3000, 3000]);
        assert!(delays.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_backoff_does_not_overflow_on_huge_attempts() {
        let options = RetryOptions::default();
        assert_eq!(backoff_delay(200, &options), Duration::from_millis(10_000));
    }

    #[test]
    fn test_worst_case_covers_all_attempts_and_waits() {
        let options = RetryOptions {
            max_retries: 3,
            base_delay_ms: 1000,
            max_delay_ms: 10_000,
            timeout_ms: 15_000,
            ..RetryOptions::default()
        };
        // 3 * 15000 + (1000 + 100) + (2000 + 200)
        assert_eq!(options.worst_case_ms(), 48_300);
    }

    #[test]
    fn test_zero_retries_still_attempts_once() {
        let options = RetryOptions {
            max_retries: 0,
            ..RetryOptions::default()
        };
        assert_eq!(options.attempts(), 1);
        assert_eq!(options.worst_case_ms(), options.timeout_ms);
    }
}
