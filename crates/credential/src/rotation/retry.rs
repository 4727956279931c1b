//! Retry with exponential backoff
//!
//! Used for the secret-store write, the one step that runs after the live
//! service already holds the new password.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::sleep;

/// Retry policy configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,

    /// Backoff before the second attempt
    #[serde(with = "humantime_serde")]
    pub initial_backoff: Duration,

    /// Backoff multiplier (2.0 doubles every attempt)
    pub backoff_multiplier: f32,

    /// Upper bound on any single backoff
    #[serde(with = "humantime_serde")]
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(200),
            backoff_multiplier: 2.0,
            max_backoff: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Calculate backoff duration for given attempt number
    ///
    /// Applies exponential backoff with ±10% jitter.
    pub fn backoff_duration(&self, attempt: u32) -> Duration {
        use rand::Rng;

        let base_ms = self.initial_backoff.as_millis() as f32;
        let multiplier = self.backoff_multiplier.powi(attempt as i32);
        let backoff_ms = base_ms * multiplier;

        let jitter = rand::rng().random_range(0.9..=1.1);
        let jittered_ms = (backoff_ms * jitter) as u64;

        Duration::from_millis(jittered_ms).min(self.max_backoff)
    }
}

/// Every attempt failed
#[derive(Debug)]
pub struct RetryExhausted<E> {
    /// Attempts made
    pub attempts: u32,
    /// Error from the final attempt
    pub last_error: E,
}

impl<E: fmt::Display> fmt::Display for RetryExhausted<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "gave up after {} attempt(s): {}",
            self.attempts, self.last_error
        )
    }
}

/// Retry an async operation with exponential backoff
///
/// # Example
///
/// ```rust,ignore
/// let policy = RetryPolicy::default();
/// let version = retry_with_backoff(&policy, "secret_store_write", || async {
///     store.set(&secret, next_version()).await
/// }).await?;
/// ```
pub async fn retry_with_backoff<F, Fut, T, E>(
    policy: &RetryPolicy,
    operation_name: &str,
    mut f: F,
) -> Result<T, RetryExhausted<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        match f().await {
            Ok(result) => return Ok(result),
            Err(e) => {
                tracing::warn!(
                    operation = operation_name,
                    attempt = attempt + 1,
                    max_attempts,
                    error = %e,
                    "Retry attempt failed"
                );

                if attempt + 1 >= max_attempts {
                    return Err(RetryExhausted {
                        attempts: attempt + 1,
                        last_error: e,
                    });
                }

                let backoff = policy.backoff_duration(attempt);
                tracing::debug!(
                    operation = operation_name,
                    backoff_ms = backoff.as_millis() as u64,
                    "Backing off before next retry"
                );
                sleep(backoff).await;
                attempt += 1;
            }
        }
    }
}
