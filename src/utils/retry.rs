use crate::utils::error::Result;
use std::future::Future;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Extra attempts after the first one.
    pub attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            attempts: 0,
            delay: Duration::ZERO,
        }
    }
}

/// Runs `op` until it succeeds, fails with a non-retryable error, or the
/// policy's attempts are used up.
pub async fn with_retry<T, F, Fut>(policy: RetryPolicy, label: &str, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < policy.attempts => {
                attempt += 1;
                tracing::warn!(
                    "⚠️ {} failed ({}), retrying {}/{} in {:?}",
                    label,
                    e,
                    attempt,
                    policy.attempts,
                    policy.delay
                );
                tokio::time::sleep(policy.delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::NotifyError;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn server_error() -> NotifyError {
        NotifyError::PortalStatusError {
            url: "https://portal.example".to_string(),
            status: 502,
        }
    }

    #[tokio::test]
    async fn test_retries_transient_failures() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy {
            attempts: 2,
            delay: Duration::from_millis(1),
        };

        let result = with_retry(policy, "portal", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(server_error())
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_attempts() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy {
            attempts: 1,
            delay: Duration::from_millis(1),
        };

        let result: Result<()> = with_retry(policy, "portal", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(server_error()) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_authentication_failure_not_retried() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy {
            attempts: 3,
            delay: Duration::from_millis(1),
        };

        let result: Result<()> = with_retry(policy, "login", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(NotifyError::authentication("rejected")) }
        })
        .await;

        assert!(matches!(
            result,
            Err(NotifyError::AuthenticationError { .. })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
