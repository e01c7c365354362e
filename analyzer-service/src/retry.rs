//! Bounded immediate retry for unreliable external calls.

use std::future::Future;

use tracing::debug;

/// Run `operation`, retrying immediately on failure up to `max_retries`
/// additional attempts (so `max_retries + 1` attempts in total).
///
/// There is no backoff or jitter; the callers here wrap stateless analysis
/// calls that are safe to repeat. The final failure is returned unmodified.
pub async fn with_retry<T, E, F, Fut>(max_retries: usize, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if attempt >= max_retries {
                    return Err(err);
                }
                attempt += 1;
                debug!(attempt, max_retries, "Operation failed, retrying");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_success_on_first_attempt() {
        let calls = AtomicUsize::new(0);
        let result: Result<i32, &str> = with_retry(3, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(7) }
        })
        .await;
        assert_eq!(result, Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_success_after_transient_failures() {
        let calls = AtomicUsize::new(0);
        let result: Result<i32, String> = with_retry(3, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(format!("transient failure {n}"))
                } else {
                    Ok(42)
                }
            }
        })
        .await;
        assert_eq!(result, Ok(42));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_persistent_failure_exhausts_attempts() {
        let calls = AtomicUsize::new(0);
        let result: Result<i32, &str> = with_retry(3, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err("always fails") }
        })
        .await;
        assert_eq!(result, Err("always fails"));
        // Initial attempt plus max_retries retries.
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_zero_retries_attempts_once() {
        let calls = AtomicUsize::new(0);
        let result: Result<i32, &str> = with_retry(0, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err("nope") }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
