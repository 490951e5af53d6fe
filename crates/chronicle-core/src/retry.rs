//! Timeout and retry helpers for store reads.
//!
//! - [`with_timeout`] races a future against a timer.
//! - [`run_with_retry`] re-runs a fallible operation with exponential backoff.
//! - [`with_timeout_and_retry`] combines the two, giving every attempt its own
//!   time budget.
//!
//! Every error is retried; there is no transient/permanent classification.
//! Attempts never overlap: attempt N+1 starts only after attempt N failed and
//! the backoff delay elapsed.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// An operation did not finish within its time budget.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct TimeoutError {
    pub message: String,
    pub timeout: Duration,
}

impl TimeoutError {
    pub fn new(message: impl Into<String>, timeout: Duration) -> Self {
        Self {
            message: message.into(),
            timeout,
        }
    }
}

/// Backoff schedule for [`run_with_retry`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetryOptions {
    /// Total attempts, including the first. Zero behaves as one.
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub backoff_multiplier: f64,
    pub max_delay_ms: u64,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 1000,
            backoff_multiplier: 2.0,
            max_delay_ms: 10_000,
        }
    }
}

impl RetryOptions {
    /// Delay to wait after the given (1-based) attempt fails.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let scaled = self.initial_delay_ms as f64 * self.backoff_multiplier.powi(exponent);
        let capped = if scaled.is_finite() {
            scaled.clamp(0.0, self.max_delay_ms as f64)
        } else {
            self.max_delay_ms as f64
        };
        Duration::from_millis(capped as u64)
    }

    fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// Await `operation`, failing with `message` if `timeout` elapses first.
///
/// When the timer wins, the operation future is dropped, so its work stops at
/// its next await point.
pub async fn with_timeout<F>(
    operation: F,
    timeout: Duration,
    message: &str,
) -> Result<F::Output, TimeoutError>
where
    F: Future,
{
    tokio::time::timeout(timeout, operation)
        .await
        .map_err(|_| TimeoutError::new(message, timeout))
}

/// Run `operation` until it succeeds or `options.max_attempts` is reached.
///
/// Failures before the last attempt are logged and swallowed; the last error
/// is returned as-is.
pub async fn run_with_retry<T, E, F, Fut>(mut operation: F, options: &RetryOptions) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let max_attempts = options.attempts();
    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::debug!(attempt, "operation succeeded after retry");
                }
                return Ok(value);
            }
            Err(err) if attempt < max_attempts => {
                let delay = options.delay_for_attempt(attempt);
                tracing::warn!(
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "operation failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => {
                tracing::error!(attempt, error = %err, "operation failed, giving up");
                return Err(err);
            }
        }
    }
}

/// [`run_with_retry`] where every attempt is bounded by `timeout`.
pub async fn with_timeout_and_retry<T, E, F, Fut>(
    mut operation: F,
    timeout: Duration,
    message: &str,
    options: &RetryOptions,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display + From<TimeoutError>,
{
    run_with_retry(
        move || {
            let attempt = operation();
            async move {
                match with_timeout(attempt, timeout, message).await {
                    Ok(result) => result,
                    Err(elapsed) => Err(E::from(elapsed)),
                }
            }
        },
        options,
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use tokio::time::Instant;

    #[derive(Debug, PartialEq)]
    enum TestError {
        Failed(u32),
        TimedOut(String),
    }

    impl Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                TestError::Failed(n) => write!(f, "attempt {n} failed"),
                TestError::TimedOut(msg) => f.write_str(msg),
            }
        }
    }

    impl From<TimeoutError> for TestError {
        fn from(err: TimeoutError) -> Self {
            TestError::TimedOut(err.message)
        }
    }

    fn fast_options(max_attempts: u32) -> RetryOptions {
        RetryOptions {
            max_attempts,
            initial_delay_ms: 100,
            backoff_multiplier: 2.0,
            max_delay_ms: 300,
        }
    }

    #[test]
    fn delays_grow_and_cap() {
        let options = fast_options(5);
        assert_eq!(options.delay_for_attempt(1), Duration::from_millis(100));
        assert_eq!(options.delay_for_attempt(2), Duration::from_millis(200));
        assert_eq!(options.delay_for_attempt(3), Duration::from_millis(300));
        assert_eq!(options.delay_for_attempt(10), Duration::from_millis(300));
    }

    #[test]
    fn huge_exponents_stay_capped() {
        let options = RetryOptions::default();
        assert_eq!(options.delay_for_attempt(u32::MAX), Duration::from_millis(10_000));
    }

    #[tokio::test(start_paused = true)]
    async fn exhausts_attempts_and_returns_last_error() {
        let calls = Cell::new(0u32);
        let started = RefCell::new(Vec::new());
        let origin = Instant::now();

        let result: Result<(), TestError> = run_with_retry(
            || {
                calls.set(calls.get() + 1);
                started.borrow_mut().push(origin.elapsed());
                let n = calls.get();
                async move { Err(TestError::Failed(n)) }
            },
            &fast_options(3),
        )
        .await;

        assert_eq!(result, Err(TestError::Failed(3)));
        assert_eq!(calls.get(), 3);
        let started = started.into_inner();
        assert_eq!(started[0], Duration::ZERO);
        assert!(started[1] >= Duration::from_millis(100) && started[1] < Duration::from_millis(150));
        assert!(started[2] >= Duration::from_millis(300) && started[2] < Duration::from_millis(350));
    }

    #[tokio::test(start_paused = true)]
    async fn stops_retrying_after_success() {
        let calls = Cell::new(0u32);
        let result: Result<&str, TestError> = run_with_retry(
            || {
                calls.set(calls.get() + 1);
                let n = calls.get();
                async move {
                    if n < 2 {
                        Err(TestError::Failed(n))
                    } else {
                        Ok("loaded")
                    }
                }
            },
            &fast_options(5),
        )
        .await;

        assert_eq!(result, Ok("loaded"));
        assert_eq!(calls.get(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_attempts_still_runs_once() {
        let calls = Cell::new(0u32);
        let result: Result<(), TestError> = run_with_retry(
            || {
                calls.set(calls.get() + 1);
                async { Err(TestError::Failed(1)) }
            },
            &fast_options(0),
        )
        .await;

        assert!(result.is_err());
        assert_eq!(calls.get(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_preempts_pending_operation() {
        let origin = Instant::now();
        let result = with_timeout(
            std::future::pending::<()>(),
            Duration::from_millis(50),
            "Fetching goal timed out",
        )
        .await;

        let err = result.unwrap_err();
        assert_eq!(err.to_string(), "Fetching goal timed out");
        assert_eq!(err.timeout, Duration::from_millis(50));
        let waited = origin.elapsed();
        assert!(waited >= Duration::from_millis(50) && waited < Duration::from_millis(100));
    }

    #[tokio::test(start_paused = true)]
    async fn fast_operation_beats_timeout() {
        let result = with_timeout(async { 7 }, Duration::from_millis(50), "slow").await;
        assert_eq!(result, Ok(7));
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_applies_to_each_attempt() {
        let calls = Cell::new(0u32);
        let result: Result<u32, TestError> = with_timeout_and_retry(
            || {
                calls.set(calls.get() + 1);
                let n = calls.get();
                async move {
                    if n == 1 {
                        tokio::time::sleep(Duration::from_secs(60)).await;
                    }
                    Ok(n)
                }
            },
            Duration::from_millis(50),
            "Loading chapters timed out",
            &fast_options(3),
        )
        .await;

        assert_eq!(result, Ok(2));
        assert_eq!(calls.get(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_timeouts_surface_timeout_error() {
        let result: Result<(), TestError> = with_timeout_and_retry(
            || std::future::pending::<Result<(), TestError>>(),
            Duration::from_millis(20),
            "Loading goal timed out",
            &fast_options(2),
        )
        .await;

        assert_eq!(
            result,
            Err(TestError::TimedOut("Loading goal timed out".to_string()))
        );
    }
}
