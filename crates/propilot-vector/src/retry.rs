//! Bounded retry with exponential backoff for remote calls.

use std::future::Future;
use std::time::Duration;

use backoff::{backoff::Backoff, ExponentialBackoff};
use tracing::{debug, error, warn};

use propilot_types::PineconeSettings;

use crate::error::VectorError;

/// Retry limits for one logical operation.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    /// Delay before the second attempt
    pub initial_interval: Duration,
    /// Give up once this much time has passed since the first attempt
    pub max_elapsed: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_interval: Duration::from_millis(500),
            max_elapsed: Duration::from_secs(120),
        }
    }
}

impl RetryPolicy {
    pub fn from_settings(settings: &PineconeSettings) -> Self {
        Self {
            max_attempts: settings.max_retries.max(1),
            initial_interval: Duration::from_millis(settings.initial_backoff_ms),
            ..Default::default()
        }
    }

    fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            current_interval: self.initial_interval,
            initial_interval: self.initial_interval,
            max_elapsed_time: Some(self.max_elapsed),
            ..Default::default()
        }
    }
}

/// Run `op` until it succeeds, fails permanently, or the policy is exhausted.
///
/// Only errors with [`VectorError::is_retryable`] are retried.
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    operation: &str,
    mut op: F,
) -> Result<T, VectorError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, VectorError>>,
{
    let mut backoff = policy.backoff();
    let mut attempts = 0;

    loop {
        attempts += 1;
        debug!(operation, attempt = attempts, "Calling vector store");

        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if !e.is_retryable() => {
                error!(operation, status = ?e.status(), error = %e, "Permanent failure, not retrying");
                return Err(e);
            }
            Err(e) => {
                if attempts >= policy.max_attempts {
                    error!(operation, error = %e, attempts, "Max retries exceeded");
                    return Err(e);
                }

                match backoff.next_backoff() {
                    Some(duration) => {
                        warn!(
                            operation,
                            status = ?e.status(),
                            error = %e,
                            retry_in_ms = duration.as_millis(),
                            "Call failed, retrying"
                        );
                        tokio::time::sleep(duration).await;
                    }
                    None => {
                        error!(operation, error = %e, "Backoff exhausted");
                        return Err(e);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_interval: Duration::from_millis(1),
            max_elapsed: Duration::from_secs(5),
        }
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result = with_retry(&fast_policy(3), "test", move || async move {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                Err(VectorError::from_status(503, "busy".into()))
            } else {
                Ok(n)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_failure_is_not_retried() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<(), _> = with_retry(&fast_policy(5), "test", move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(VectorError::Unauthorized("invalid api key".into()))
        })
        .await;

        assert!(matches!(result, Err(VectorError::Unauthorized(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<(), _> = with_retry(&fast_policy(4), "test", move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(VectorError::Timeout)
        })
        .await;

        assert!(matches!(result, Err(VectorError::Timeout)));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_policy_from_settings() {
        let mut settings = PineconeSettings::default();
        settings.max_retries = 0;
        settings.initial_backoff_ms = 25;

        let policy = RetryPolicy::from_settings(&settings);
        assert_eq!(policy.max_attempts, 1);
        assert_eq!(policy.initial_interval, Duration::from_millis(25));
    }
}
