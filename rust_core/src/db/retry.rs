//! Retry with exponential backoff for transient subscriber-store failures.

use crate::error::RelayResult;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Run `f` up to `max_attempts` times, backing off `base_backoff_ms * 2^n`
/// (capped at `max_backoff_ms`) between attempts that failed transiently.
///
/// # Example
/// ```ignore
/// let ids = execute_with_retry(|| directory.query_active(), 3, 100, 2_000).await?;
/// ```
pub async fn execute_with_retry<F, Fut, T>(
    mut f: F,
    max_attempts: u32,
    base_backoff_ms: u64,
    max_backoff_ms: u64,
) -> RelayResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = RelayResult<T>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match f().await {
            Ok(result) => return Ok(result),
            Err(e) if attempt < max_attempts && e.is_transient() => {
                let backoff_ms = base_backoff_ms
                    .saturating_mul(2_u64.saturating_pow(attempt - 1))
                    .min(max_backoff_ms);
                warn!(
                    "Subscriber store call failed (attempt {}/{}): {}. Retrying in {}ms",
                    attempt, max_attempts, e, backoff_ms
                );
                tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
            }
            Err(e) => return Err(e),
        }
    }
}
