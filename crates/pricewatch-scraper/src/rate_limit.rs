//! Retry with exponential back-off and jitter for page fetches.
//!
//! Only [`ScraperError::is_transient`] failures are retried. A 404, a bad URL
//! or a page without a price fails on the first attempt.

use std::future::Future;
use std::time::Duration;

use crate::error::ScraperError;

const MAX_DELAY_MS: u64 = 60_000;

/// Runs `operation` with up to `max_retries` additional attempts on transient
/// errors.
///
/// The wait before retry `n` is `backoff_base_secs * 2^(n-1)` seconds with
/// ±25 % jitter, capped at 60 s. A `Retry-After` hint from a 429 raises the
/// wait to at least that many seconds (still capped).
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_secs: u64,
    mut operation: F,
) -> Result<T, ScraperError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, ScraperError>>,
{
    let backoff_base_ms = backoff_base_secs.saturating_mul(1_000);
    let mut attempt = 0u32;
    loop {
        match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !err.is_transient() || attempt >= max_retries {
                    return Err(err);
                }
                attempt += 1;
                let computed = backoff_base_ms.saturating_mul(1u64 << (attempt - 1).min(10));
                let floor = match &err {
                    ScraperError::RateLimited {
                        retry_after_secs, ..
                    } => retry_after_secs.saturating_mul(1_000),
                    _ => 0,
                };
                let capped = computed.max(floor).min(MAX_DELAY_MS);
                #[allow(
                    clippy::cast_possible_truncation,
                    clippy::cast_sign_loss,
                    clippy::cast_precision_loss
                )]
                let delay_ms = (capped as f64 * (rand::random::<f64>() * 0.5 + 0.75)) as u64;
                tracing::warn!(
                    attempt,
                    max_retries,
                    delay_ms,
                    error = %err,
                    "transient fetch error, retrying after back-off"
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }
    }
}
