//! Bounded retry with exponential backoff for generator calls
//!
//! The frame generator sits behind a network API that sheds load with rate
//! limits and the occasional 500. Those failures are worth a few patient
//! retries; everything else (bad prompts, decode failures) is returned
//! immediately.

use crate::error::Result;
use log::warn;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

/// Retry policy for transient generator failures.
///
/// An operation is attempted once plus `max_retries` more times. The delay
/// before retry `k` (zero-based) is `base_delay * 2^k`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Retries allowed after the initial attempt
    pub max_retries: u32,
    /// Delay before the first retry; doubles on every subsequent retry
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    /// Create a policy with explicit bounds
    #[must_use]
    pub const fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// Policy that never retries
    #[must_use]
    pub const fn disabled() -> Self {
        Self::new(0, Duration::ZERO)
    }

    /// Backoff delay before the given zero-based retry
    #[must_use]
    pub fn delay_for(&self, retry_index: u32) -> Duration {
        self.base_delay.saturating_mul(2_u32.saturating_pow(retry_index))
    }
}

/// Invoke an async operation, retrying transient failures with backoff.
///
/// Only errors classified transient by
/// [`PawdrobeError::is_transient_generator`](crate::PawdrobeError::is_transient_generator)
/// are retried. Once `max_retries` retries are spent, or on the first
/// permanent error, the last error is returned as-is.
pub async fn invoke_with_retry<T, F, Fut>(policy: &RetryPolicy, mut operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut retries_used: u32 = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if retries_used >= policy.max_retries || !err.is_transient_generator() {
                    return Err(err);
                }

                let delay = policy.delay_for(retries_used);
                retries_used += 1;
                warn!(
                    "Transient generator failure, retry {}/{} in {:?}: {}",
                    retries_used, policy.max_retries, delay, err
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PawdrobeError;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_delay_doubles_per_retry() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(0), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(1), Duration::from_millis(2000));
        assert_eq!(policy.delay_for(2), Duration::from_millis(4000));
    }

    #[tokio::test]
    async fn test_success_needs_no_retry() {
        let attempts = AtomicU32::new(0);
        let result = invoke_with_retry(&RetryPolicy::default(), || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Ok(42) }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failures_are_retried() {
        let attempts = AtomicU32::new(0);
        let result = invoke_with_retry(&RetryPolicy::default(), || {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(PawdrobeError::generator_with_status("rate limited", 429))
                } else {
                    Ok("frame bytes")
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "frame bytes");
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_errors_fail_fast() {
        let attempts = AtomicU32::new(0);
        let result: Result<()> = invoke_with_retry(&RetryPolicy::default(), || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(PawdrobeError::generator_with_status("bad prompt", 400)) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_returns_last_error_after_backoff() {
        let start = tokio::time::Instant::now();
        let attempts = AtomicU32::new(0);
        let result: Result<()> = invoke_with_retry(&RetryPolicy::default(), || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(PawdrobeError::generator("monthly quota exceeded")) }
        })
        .await;

        // One initial attempt plus three retries
        assert_eq!(attempts.load(Ordering::SeqCst), 4);
        let err = result.unwrap_err();
        assert!(err.to_string().contains("quota"));

        // Backoff slept 1s + 2s + 4s on the paused clock
        assert_eq!(start.elapsed(), Duration::from_secs(7));
    }

    #[tokio::test]
    async fn test_disabled_policy_never_sleeps() {
        let attempts = AtomicU32::new(0);
        let result: Result<()> = invoke_with_retry(&RetryPolicy::disabled(), || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(PawdrobeError::generator_with_status("overloaded", 500)) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
