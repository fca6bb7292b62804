//! Bounded retry with exponential backoff for outbound requests.
//!
//! The policy is a plain wrapper applied at the call site of whatever issues
//! the request — nothing is patched globally. Only timeout-class failures
//! are retried; any other error surfaces immediately.

use crate::error::CollectError;
use std::time::Duration;
use tracing::warn;

/// Retry policy: `max_retries` additional attempts after the first, waiting
/// `initial_delay * 2^(k-1)` before retry `k`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, initial_delay: Duration) -> Self {
        Self {
            max_retries,
            initial_delay,
        }
    }

    /// Delay before retry `k` (1-indexed): `initial_delay * 2^(k-1)`.
    pub fn delay_before(&self, retry: u32) -> Duration {
        self.initial_delay * 2u32.saturating_pow(retry.saturating_sub(1))
    }

    /// Run `op`, retrying timeouts with backoff. After `max_retries` retries
    /// the last timeout error is returned.
    pub fn run<T, F>(&self, op: F) -> Result<T, CollectError>
    where
        F: FnMut() -> Result<T, CollectError>,
    {
        self.run_with_sleep(op, std::thread::sleep)
    }

    /// Same as [`run`](Self::run) with the sleep injected, so tests can count
    /// waits without sleeping.
    pub fn run_with_sleep<T, F, S>(&self, mut op: F, mut sleep: S) -> Result<T, CollectError>
    where
        F: FnMut() -> Result<T, CollectError>,
        S: FnMut(Duration),
    {
        let mut last_timeout = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let wait = self.delay_before(attempt);
                warn!(
                    attempt,
                    max_retries = self.max_retries,
                    wait_secs = wait.as_secs_f64(),
                    "request timed out, retrying after backoff"
                );
                sleep(wait);
            }

            match op() {
                Ok(value) => return Ok(value),
                Err(e) if e.is_timeout() => last_timeout = Some(e),
                Err(e) => return Err(e),
            }
        }

        Err(last_timeout
            .unwrap_or_else(|| CollectError::Timeout("retries exhausted".into())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timeout() -> CollectError {
        CollectError::Timeout("read timed out".into())
    }

    #[test]
    fn first_success_needs_no_wait() {
        let policy = RetryPolicy::new(3, Duration::from_secs(5));
        let mut waits = Vec::new();

        let result: Result<u32, _> =
            policy.run_with_sleep(|| Ok(7), |d| waits.push(d));

        assert_eq!(result.unwrap(), 7);
        assert!(waits.is_empty());
    }

    #[test]
    fn backoff_doubles_each_retry() {
        let policy = RetryPolicy::new(3, Duration::from_secs(5));
        let mut waits = Vec::new();

        let result: Result<(), _> =
            policy.run_with_sleep(|| Err(timeout()), |d| waits.push(d));

        assert!(matches!(result, Err(CollectError::Timeout(_))));
        assert_eq!(
            waits,
            vec![
                Duration::from_secs(5),
                Duration::from_secs(10),
                Duration::from_secs(20),
            ]
        );
    }

    #[test]
    fn success_on_later_attempt_stops_retrying() {
        let policy = RetryPolicy::new(5, Duration::from_secs(1));
        let mut calls = 0;
        let mut waits = 0;

        let result = policy.run_with_sleep(
            || {
                calls += 1;
                if calls < 3 {
                    Err(timeout())
                } else {
                    Ok(calls)
                }
            },
            |_| waits += 1,
        );

        assert_eq!(result.unwrap(), 3);
        assert_eq!(waits, 2);
    }

    #[test]
    fn non_timeout_fails_immediately() {
        let policy = RetryPolicy::new(3, Duration::from_secs(5));
        let mut calls = 0;
        let mut waits = 0;

        let result: Result<(), _> = policy.run_with_sleep(
            || {
                calls += 1;
                Err(CollectError::Network("connection refused".into()))
            },
            |_| waits += 1,
        );

        assert!(matches!(result, Err(CollectError::Network(_))));
        assert_eq!(calls, 1);
        assert_eq!(waits, 0);
    }

    #[test]
    fn zero_retries_means_one_attempt() {
        let policy = RetryPolicy::new(0, Duration::from_secs(5));
        let mut calls = 0;

        let result: Result<(), _> = policy.run_with_sleep(
            || {
                calls += 1;
                Err(timeout())
            },
            |_| panic!("no wait expected with zero retries"),
        );

        assert!(result.is_err());
        assert_eq!(calls, 1);
    }
}
