use std::time::Duration;

use tokio::time::sleep;

use crate::managers::blockchain::error_classification::is_retryable_rpc_error;

pub(crate) struct RetryPolicy {
    pub max_attempts: usize,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Fixed attempt bound inherited from the upstream contract: transient
    /// endpoint glitches get seven tries, then the last error surfaces as-is.
    pub(crate) fn rpc_default() -> Self {
        Self {
            max_attempts: 7,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(2),
        }
    }
}

pub(crate) trait RetryableError: std::fmt::Display {
    fn is_retryable(&self) -> bool;
}

impl RetryableError for alloy::transports::RpcError<alloy::transports::TransportErrorKind> {
    fn is_retryable(&self) -> bool {
        is_retryable_rpc_error(self)
    }
}

pub(crate) fn backoff_delay(policy: &RetryPolicy, attempt: usize) -> Duration {
    let base_ms = policy.base_delay.as_millis() as u64;
    let exponent = (attempt.saturating_sub(1)).min(6) as u32;
    let factor = 1u64.checked_shl(exponent).unwrap_or(u64::MAX);
    let delay_ms = base_ms.saturating_mul(factor);
    let max_ms = policy.max_delay.as_millis() as u64;

    Duration::from_millis(delay_ms.min(max_ms))
}

/// Execute an upstream call with classified, bounded retry.
///
/// Retryable failures are reattempted with bounded exponential backoff up to
/// `policy.max_attempts` total attempts; the last error is then returned
/// verbatim. Non-retryable failures return immediately.
pub(crate) async fn execute_with_retry<T, E, F, O>(
    policy: &RetryPolicy,
    label: &str,
    mut operation: F,
) -> Result<T, E>
where
    E: RetryableError,
    F: FnMut() -> O,
    O: std::future::IntoFuture<Output = Result<T, E>>,
{
    let mut attempt = 1;

    loop {
        let result = operation().into_future().await;
        match result {
            Ok(value) => return Ok(value),
            Err(err) => {
                let retryable = err.is_retryable();
                if attempt >= policy.max_attempts || !retryable {
                    return Err(err);
                }

                let delay = backoff_delay(policy, attempt);
                tracing::warn!(
                    attempt,
                    max_attempts = policy.max_attempts,
                    delay_ms = delay.as_millis(),
                    error = %err,
                    "{} failed; retrying",
                    label
                );
                sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[derive(Debug, thiserror::Error)]
    enum FakeError {
        #[error("transient glitch")]
        Transient,
        #[error("caller bug")]
        Fatal,
    }

    impl RetryableError for FakeError {
        fn is_retryable(&self) -> bool {
            matches!(self, FakeError::Transient)
        }
    }

    fn instant_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 7,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    #[tokio::test]
    async fn succeeds_on_seventh_attempt() {
        let calls = AtomicUsize::new(0);
        let result = execute_with_retry(&instant_policy(), "test_call", || async {
            if calls.fetch_add(1, Ordering::SeqCst) < 6 {
                Err(FakeError::Transient)
            } else {
                Ok(42u64)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 7);
    }

    #[tokio::test]
    async fn returns_last_error_after_exhaustion() {
        let calls = AtomicUsize::new(0);
        let result: Result<u64, FakeError> =
            execute_with_retry(&instant_policy(), "test_call", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(FakeError::Transient)
            })
            .await;
        assert!(matches!(result, Err(FakeError::Transient)));
        assert_eq!(calls.load(Ordering::SeqCst), 7);
    }

    #[tokio::test]
    async fn fatal_error_is_not_retried() {
        let calls = AtomicUsize::new(0);
        let result: Result<u64, FakeError> =
            execute_with_retry(&instant_policy(), "test_call", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(FakeError::Fatal)
            })
            .await;
        assert!(matches!(result, Err(FakeError::Fatal)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn backoff_grows_and_is_capped() {
        let policy = RetryPolicy {
            max_attempts: 7,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(2),
        };
        assert_eq!(backoff_delay(&policy, 1), Duration::from_millis(200));
        assert_eq!(backoff_delay(&policy, 2), Duration::from_millis(400));
        assert_eq!(backoff_delay(&policy, 6), Duration::from_secs(2));
    }
}
