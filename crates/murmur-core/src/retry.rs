//! Bounded exponential-backoff retry for remote calls.
//!
//! [`retry_with_backoff`] wraps a single async operation. Fatal errors
//! (see [`Error::is_fatal`]) re-raise immediately; anything else is retried
//! with doubling delays up to the policy ceiling, then the last error is
//! re-raised. Failures are never swallowed.

use std::future::Future;
use std::time::Duration;

use crate::error::{Error, Result};

/// Retry configuration for [`retry_with_backoff`].
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt; 0 means exactly one attempt.
    pub max_retries: u32,
    pub initial_delay: Duration,
    /// Ceiling applied to every backoff window.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(10_000),
        }
    }
}

impl RetryPolicy {
    /// Backoff before retry number `attempt + 1`: `initial * 2^attempt`,
    /// clamped to the ceiling. A ceiling below `initial_delay` caps the very
    /// first window.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let doubled = self
            .initial_delay
            .saturating_mul(2u32.saturating_pow(attempt));
        doubled.min(self.max_delay)
    }
}

/// Execute `op` under `policy`.
///
/// `on_retry` is invoked before each backoff wait with the 1-based count of
/// attempts made so far and the error that triggered the retry; it is
/// diagnostic only.
pub async fn retry_with_backoff<T, F, Fut>(
    policy: &RetryPolicy,
    mut on_retry: Option<&mut (dyn FnMut(u32, &Error) + Send)>,
    mut op: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt: u32 = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => {
                if attempt >= policy.max_retries {
                    return Err(err);
                }
                if let Some(cb) = on_retry.as_mut() {
                    cb(attempt + 1, &err);
                }
                tokio::time::sleep(policy.backoff_delay(attempt)).await;
                attempt += 1;
            }
        }
    }
}
