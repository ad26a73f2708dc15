//! Bounded retry with a fixed delay.

use std::future::Future;
use std::time::Duration;

/// How many times to try and how long to wait between tries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub const fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }
}

/// Poll `op` until it yields `Some`, an error, or attempts run out.
///
/// `Ok(None)` after the last attempt means the value never appeared.
/// Errors are returned immediately without further attempts.
pub async fn retry_until_some<T, E, F, Fut>(policy: RetryPolicy, mut op: F) -> Result<Option<T>, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Option<T>, E>>,
{
    for attempt in 1..=policy.max_attempts {
        if let Some(value) = op(attempt).await? {
            return Ok(Some(value));
        }
        if attempt < policy.max_attempts {
            tokio::time::sleep(policy.delay).await;
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    const FAST: RetryPolicy = RetryPolicy::fixed(5, Duration::from_millis(1));

    #[tokio::test]
    async fn test_returns_first_value() {
        let calls = AtomicU32::new(0);
        let result: Result<Option<u32>, ()> = retry_until_some(FAST, |attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move { Ok((attempt == 3).then_some(attempt)) }
        })
        .await;

        assert_eq!(result, Ok(Some(3)));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<Option<u32>, ()> = retry_until_some(FAST, |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(None) }
        })
        .await;

        assert_eq!(result, Ok(None));
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_error_stops_immediately() {
        let calls = AtomicU32::new(0);
        let result: Result<Option<u32>, &str> = retry_until_some(FAST, |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err("boom") }
        })
        .await;

        assert_eq!(result, Err("boom"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_zero_attempts_never_calls() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::fixed(0, Duration::from_millis(1));
        let result: Result<Option<u32>, ()> = retry_until_some(policy, |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(Some(1)) }
        })
        .await;

        assert_eq!(result, Ok(None));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
