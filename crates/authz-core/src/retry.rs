//! Retry/backoff helper for calls into external collaborators (card
//! directory, ledger, FX, database) whose failures classify as
//! [`crate::FailureKind::TransientUpstream`]: up to 3 attempts, 500ms
//! initial backoff, doubling.

use crate::failure::{Classify, FailureKind};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(5),
        }
    }
}

/// Run `op` up to `config.max_attempts` times, doubling the backoff delay
/// between attempts, but only while the error classifies as
/// [`FailureKind::TransientUpstream`]. Any other failure kind is returned
/// immediately without consuming a retry.
pub async fn retry_with_backoff<T, E, F, Fut>(config: &RetryConfig, mut op: F) -> Result<T, E>
where
    E: Classify,
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
{
    let mut attempt = 0;
    let mut backoff = config.initial_backoff;
    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.kind() == FailureKind::TransientUpstream && attempt < config.max_attempts => {
                tracing::warn!(attempt, ?backoff, "transient upstream failure, retrying");
                tokio::time::sleep(backoff).await;
                backoff = (backoff * 2).min(config.max_backoff);
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug, PartialEq, Eq)]
    struct FlakyError(FailureKind);

    impl Classify for FlakyError {
        fn kind(&self) -> FailureKind {
            self.0
        }
    }

    #[tokio::test]
    async fn retries_until_success() {
        let calls = AtomicU32::new(0);
        let config = RetryConfig {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(2),
        };
        let result: Result<u32, FlakyError> = retry_with_backoff(&config, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(FlakyError(FailureKind::TransientUpstream))
                } else {
                    Ok(42)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn non_transient_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let config = RetryConfig::default();
        let result: Result<u32, FlakyError> = retry_with_backoff(&config, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async move { Err(FlakyError(FailureKind::Validation)) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
