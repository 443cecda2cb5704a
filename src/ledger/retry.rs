//! Retry and deadline helpers for ledger calls.
//!
//! Only read-only queries are retried. Submissions are never retried here:
//! a lost response does not mean the transaction was not applied, so the
//! caller decides whether to try again.

use super::traits::{LedgerError, LedgerResult};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// Backoff schedule: `base * 2^attempt`, capped at `max_delay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Retry a ledger operation while `is_retryable` says the error is transient.
///
/// Returns the first success, or the last error once retries are exhausted.
pub async fn retry_with_backoff<F, Fut, T>(
    policy: RetryPolicy,
    mut operation: F,
    is_retryable: fn(&LedgerError) -> bool,
) -> LedgerResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = LedgerResult<T>>,
{
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(err) => {
                if !is_retryable(&err) || attempt >= policy.max_retries {
                    return Err(err);
                }

                let backoff = policy.backoff(attempt);
                tracing::warn!(
                    attempt = attempt + 1,
                    backoff_ms = backoff.as_millis() as u64,
                    error = %err,
                    "ledger query failed, retrying"
                );

                sleep(backoff).await;
                attempt += 1;
            }
        }
    }
}

/// Connection-level failures are transient; ledger verdicts are not.
pub fn is_ledger_error_retryable(err: &LedgerError) -> bool {
    matches!(err, LedgerError::Unavailable(_) | LedgerError::Timeout)
}

/// Bound a ledger call. Elapsed deadline becomes [`LedgerError::Timeout`].
pub async fn with_deadline<T>(
    deadline: Duration,
    call: impl Future<Output = LedgerResult<T>>,
) -> LedgerResult<T> {
    match tokio::time::timeout(deadline, call).await {
        Ok(result) => result,
        Err(_) => Err(LedgerError::Timeout),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_retries: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(4),
        }
    }

    #[tokio::test]
    async fn test_retry_succeeds_immediately() {
        let result = retry_with_backoff(
            fast_policy(),
            || async { Ok::<_, LedgerError>(42) },
            is_ledger_error_retryable,
        )
        .await;

        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_retry_succeeds_after_failures() {
        let attempt = Arc::new(AtomicU32::new(0));
        let attempt_clone = attempt.clone();

        let result = retry_with_backoff(
            fast_policy(),
            move || {
                let attempt = attempt_clone.clone();
                async move {
                    if attempt.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(LedgerError::Unavailable("socket closed".into()))
                    } else {
                        Ok(7)
                    }
                }
            },
            is_ledger_error_retryable,
        )
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(attempt.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_gives_up_after_max_retries() {
        let attempt = Arc::new(AtomicU32::new(0));
        let attempt_clone = attempt.clone();

        let result: LedgerResult<()> = retry_with_backoff(
            fast_policy(),
            move || {
                let attempt = attempt_clone.clone();
                async move {
                    attempt.fetch_add(1, Ordering::SeqCst);
                    Err(LedgerError::Unavailable("down".into()))
                }
            },
            is_ledger_error_retryable,
        )
        .await;

        assert!(result.is_err());
        // First attempt plus three retries
        assert_eq!(attempt.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_rejections_are_not_retried() {
        let attempt = Arc::new(AtomicU32::new(0));
        let attempt_clone = attempt.clone();

        let result: LedgerResult<()> = retry_with_backoff(
            fast_policy(),
            move || {
                let attempt = attempt_clone.clone();
                async move {
                    attempt.fetch_add(1, Ordering::SeqCst);
                    Err(LedgerError::AccountNotFound("rNobody".into()))
                }
            },
            is_ledger_error_retryable,
        )
        .await;

        assert!(result.is_err());
        assert_eq!(attempt.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_backoff_is_capped() {
        let policy = fast_policy();
        assert_eq!(policy.backoff(0), Duration::from_millis(1));
        assert_eq!(policy.backoff(1), Duration::from_millis(2));
        assert_eq!(policy.backoff(10), Duration::from_millis(4));
    }

    #[tokio::test]
    async fn test_deadline_elapses() {
        let result: LedgerResult<()> = with_deadline(Duration::from_millis(10), async {
            sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;

        assert_eq!(result, Err(LedgerError::Timeout));
    }

    #[tokio::test]
    async fn test_deadline_passes_through_result() {
        let result = with_deadline(Duration::from_secs(5), async { Ok::<_, LedgerError>(3) }).await;
        assert_eq!(result, Ok(3));
    }
}
