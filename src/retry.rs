//! Bounded exponential backoff shared by the crawler, the detail extractor
//! and the store writes.

use anyhow::Result;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::scrapers::FetchError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Always at least 1.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay: max_delay.max(base_delay),
        }
    }

    /// Same attempt count, no waiting between attempts
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Duration::ZERO, Duration::ZERO)
    }

    /// Pause after the given failed attempt (1-based): `base * 2^(attempt-1)`, capped
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.base_delay
            .checked_mul(1u32 << exponent)
            .map_or(self.max_delay, |d| d.min(self.max_delay))
    }

    /// Whether another attempt is allowed after `attempt` failed
    pub fn allows_retry_after(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}

/// Typed fetch errors decide for themselves; anything else is a bug in our
/// own parsing setup and retrying will not help.
pub fn is_retryable(err: &anyhow::Error) -> bool {
    err.downcast_ref::<FetchError>()
        .map_or(false, FetchError::is_retryable)
}

/// Run `op` until it succeeds, `retryable` rejects the error, or the policy
/// runs out of attempts. The last error is returned with attempt context.
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    what: &str,
    retryable: impl Fn(&anyhow::Error) -> bool,
    mut op: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if retryable(&err) && policy.allows_retry_after(attempt) => {
                let delay = policy.delay_for(attempt);
                warn!(
                    attempt,
                    max_attempts = policy.max_attempts,
                    error = %err,
                    "{} failed, retrying in {:?}",
                    what,
                    delay
                );
                tokio::time::sleep(delay).await;
            }
            Err(err) => {
                return Err(err.context(format!("{} failed after {} attempt(s)", what, attempt)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn unavailable() -> anyhow::Error {
        anyhow::Error::new(FetchError::Status {
            url: "https://example.com".into(),
            status: 503,
        })
    }

    #[test]
    fn delay_doubles_until_capped() {
        let policy = RetryPolicy::new(10, Duration::from_secs(1), Duration::from_secs(5));
        assert_eq!(policy.delay_for(1), Duration::from_secs(1));
        assert_eq!(policy.delay_for(2), Duration::from_secs(2));
        assert_eq!(policy.delay_for(3), Duration::from_secs(4));
        assert_eq!(policy.delay_for(4), Duration::from_secs(5));
        assert_eq!(policy.delay_for(40), Duration::from_secs(5));
    }

    #[test]
    fn attempts_are_bounded() {
        let policy = RetryPolicy::immediate(2);
        assert!(policy.allows_retry_after(1));
        assert!(!policy.allows_retry_after(2));
        assert_eq!(RetryPolicy::immediate(0).max_attempts, 1);
    }

    #[test]
    fn only_transient_fetch_errors_are_retryable() {
        let transient = anyhow::Error::new(FetchError::Status {
            url: "https://example.com".into(),
            status: 503,
        });
        let missing = anyhow::Error::new(FetchError::Status {
            url: "https://example.com".into(),
            status: 404,
        });
        assert!(is_retryable(&transient));
        assert!(!is_retryable(&missing));
        assert!(!is_retryable(&anyhow::anyhow!("invalid selector")));
    }

    #[tokio::test]
    async fn retries_until_success() {
        let calls = AtomicU32::new(0);
        let value = with_retry(&RetryPolicy::immediate(3), "flaky op", is_retryable, || async {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(unavailable())
            } else {
                Ok(7)
            }
        })
        .await
        .unwrap();

        assert_eq!(value, 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_when_attempts_run_out() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = with_retry(&RetryPolicy::immediate(2), "down op", is_retryable, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(unavailable())
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn fatal_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = with_retry(&RetryPolicy::immediate(5), "broken op", is_retryable, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(anyhow::anyhow!("invalid selector"))
        })
        .await;

        let err = result.unwrap_err();
        assert!(err.to_string().contains("after 1 attempt"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
