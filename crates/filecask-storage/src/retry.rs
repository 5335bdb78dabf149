//! Bounded retry for transient storage errors.
//!
//! Transient failures (throttling, backend hiccups) are retried by the
//! caller with exponential backoff; permanent failures, missing objects,
//! and invalid keys surface immediately.

use std::future::Future;
use std::time::Duration;

use crate::traits::{StorageError, StorageResult};

/// Maximum backoff between storage retry attempts. Caps exponential backoff
/// so high attempt counts do not produce excessively long delays.
pub const MAX_RETRY_BACKOFF_MS: u64 = 5_000;

/// Computes backoff in milliseconds for a given attempt (exponential with cap).
#[inline]
pub(crate) fn compute_retry_backoff_ms(attempt: u32) -> u64 {
    (100_u64.saturating_mul(2_u64.saturating_pow(attempt))).min(MAX_RETRY_BACKOFF_MS)
}

/// Run a storage operation, retrying transient errors up to `max_attempts`
/// total attempts.
pub async fn with_storage_retries<T, F, Fut>(
    op_name: &str,
    max_attempts: u32,
    mut op: F,
) -> StorageResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = StorageResult<T>>,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 0;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() && attempt + 1 < max_attempts => {
                let backoff_ms = compute_retry_backoff_ms(attempt);
                tracing::warn!(
                    op = %op_name,
                    attempt = attempt + 1,
                    max_attempts = max_attempts,
                    backoff_ms = backoff_ms,
                    error = %err,
                    "Transient storage error, retrying"
                );
                tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
