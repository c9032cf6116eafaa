//! Retry with exponential backoff for WooCommerce REST calls.
//!
//! Only transient conditions (429 responses, network failures, 5xx) are
//! retried. Credential, not-found and parse errors are returned at once.

use std::future::Future;
use std::time::Duration;

use crate::error::WooError;

fn is_retriable(err: &WooError) -> bool {
    match err {
        WooError::RateLimited { .. } | WooError::Http(_) => true,
        WooError::UnexpectedStatus { status, .. } => *status >= 500,
        _ => false,
    }
}

/// Executes `operation`, retrying transient failures up to `max_retries`
/// additional times.
///
/// The wait before the n-th retry is `backoff_base_secs * 2^(n-1)` seconds
/// with ±25% jitter, never shorter than a 429's `Retry-After`. With
/// `max_retries = 3` the operation runs at most 4 times.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_secs: u64,
    mut operation: F,
) -> Result<T, WooError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, WooError>>,
{
    let mut attempt = 0u32;

    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };
        if !is_retriable(&err) || attempt >= max_retries {
            return Err(err);
        }

        let delay = backoff_delay(backoff_base_secs, attempt, &err);
        tracing::warn!(
            attempt,
            max_retries,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            error = %err,
            "transient WooCommerce error, retrying after backoff"
        );
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}

fn backoff_delay(backoff_base_secs: u64, attempt: u32, err: &WooError) -> Duration {
    let base_ms = backoff_base_secs
        .saturating_mul(1u64 << attempt.min(30))
        .saturating_mul(1000);
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    let jittered_ms = (base_ms as f64 * (rand::random::<f64>() * 0.5 + 0.75)) as u64;

    let floor_ms = match err {
        WooError::RateLimited { retry_after_secs } => retry_after_secs.saturating_mul(1000),
        _ => 0,
    };
    Duration::from_millis(jittered_ms.max(floor_ms))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[test]
    fn backoff_delay_doubles_within_jitter_bounds() {
        let err = WooError::UnexpectedStatus {
            status: 503,
            url: "https://shop.example/wp-json/wc/v3/orders".to_owned(),
        };
        for attempt in 0..4 {
            let nominal = 2_000u64 << attempt;
            let ms = u64::try_from(backoff_delay(2, attempt, &err).as_millis()).unwrap();
            assert!(ms >= nominal * 3 / 4, "attempt {attempt}: {ms}ms too short");
            assert!(ms <= nominal * 5 / 4, "attempt {attempt}: {ms}ms too long");
        }
    }

    #[test]
    fn backoff_delay_respects_retry_after() {
        let err = WooError::RateLimited {
            retry_after_secs: 30,
        };
        assert!(backoff_delay(1, 0, &err) >= Duration::from_secs(30));
    }

    #[tokio::test]
    async fn succeeds_immediately_on_first_try() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(3, 0, || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Ok::<u32, WooError>(42)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_server_errors_then_succeeds() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(3, 0, || {
            let c = Arc::clone(&c);
            async move {
                let n = c.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(WooError::UnexpectedStatus {
                        status: 502,
                        url: "https://shop.example/wp-json/wc/v3/orders".to_owned(),
                    })
                } else {
                    Ok::<u32, WooError>(7)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(2, 0, || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err::<u32, WooError>(WooError::RateLimited {
                    retry_after_secs: 0,
                })
            }
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(matches!(result, Err(WooError::RateLimited { .. })));
    }

    #[tokio::test]
    async fn does_not_retry_unauthorized() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(3, 0, || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err::<u32, WooError>(WooError::Unauthorized {
                    url: "https://shop.example/wp-json/wc/v3/products".to_owned(),
                })
            }
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(result, Err(WooError::Unauthorized { .. })));
    }
}
