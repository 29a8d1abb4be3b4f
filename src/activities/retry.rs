//! Activity retry policy (`SPEC_FULL.md` §4.7 failure semantics): at most 3
//! attempts with exponential backoff (initial 1 s, factor 2, cap 30 s) for
//! idempotent activities, 1 attempt for non-idempotent ones (commit, revert).

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::warn;

use crate::error::{CoreError, Result};

const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const BACKOFF_FACTOR: u32 = 2;
const MAX_BACKOFF: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy)]
pub enum Idempotency {
    Idempotent,
    NonIdempotent,
}

/// Run `f` under the retry policy appropriate to `idempotency`. Only retries
/// on [`CoreError::is_recoverable`] errors; any other error propagates
/// immediately, matching §7's "recovered locally wherever a retry budget
/// exists" policy.
pub async fn with_retry<F, Fut, T>(idempotency: Idempotency, mut f: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = match idempotency {
        Idempotency::Idempotent => 3,
        Idempotency::NonIdempotent => 1,
    };

    let mut backoff = INITIAL_BACKOFF;
    let mut last_err = CoreError::other("retry loop never ran");
    for attempt in 1..=max_attempts {
        match f().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < max_attempts && e.is_recoverable() => {
                warn!(attempt, max_attempts, error = %e, "activity failed, retrying");
                let jitter = rand::rng().random_range(0..100);
                tokio::time::sleep(backoff + Duration::from_millis(jitter)).await;
                backoff = (backoff * BACKOFF_FACTOR).min(MAX_BACKOFF);
                last_err = e;
            }
            Err(e) => return Err(e),
        }
    }
    Err(last_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn non_idempotent_activities_are_never_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = calls.clone();
        let result: Result<()> = with_retry(Idempotency::NonIdempotent, || {
            let calls = calls_clone.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(CoreError::ActivityTimeout)
            }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn idempotent_activities_retry_up_to_three_times() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = calls.clone();
        let result: Result<u32> = with_retry(Idempotency::Idempotent, || {
            let calls = calls_clone.clone();
            async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 3 {
                    Err(CoreError::ActivityTimeout)
                } else {
                    Ok(n)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 3);
    }

    #[tokio::test]
    async fn non_recoverable_errors_are_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = calls.clone();
        let result: Result<()> = with_retry(Idempotency::Idempotent, || {
            let calls = calls_clone.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(CoreError::PortsExhausted)
            }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
