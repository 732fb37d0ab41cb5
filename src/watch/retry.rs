// src/watch/retry.rs

//! Bounded retry with linear backoff around a single snapshot read.

use std::time::Duration;

use anyhow::Result;
use tokio::time::sleep;
use tracing::warn;

use crate::store::{KvRead, Snapshot};

/// Additional attempts after the first failure.
const MAX_RETRIES: u32 = 3;

/// Read a snapshot through the given store, retrying transient failures.
///
/// On failure the read is retried up to three more times, sleeping
/// `attempt * 2` seconds before each retry. Retrying is always safe because
/// the read is idempotent; erring early is much more costly than delaying
/// configuration propagation. After the last retry fails, its error is
/// returned to the caller.
pub async fn list_with_retries<S>(store: &S, prefix: &str, wait_index: Option<u64>) -> Result<Snapshot>
where
    S: KvRead + ?Sized,
{
    let mut attempt = 0u32;
    loop {
        match store.list(prefix, wait_index).await {
            Ok(snapshot) => return Ok(snapshot),
            Err(err) if attempt < MAX_RETRIES => {
                attempt += 1;
                warn!(
                    prefix = %prefix,
                    attempt,
                    error = %err,
                    "store read failed; backing off before retry"
                );
                sleep(Duration::from_secs(u64::from(attempt) * 2)).await;
            }
            Err(err) => return Err(err),
        }
    }
}
