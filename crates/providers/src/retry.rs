//! Bounded retry with exponential backoff and jitter.
//!
//! Every generation call goes through [`with_retry`]. Only errors whose
//! [`ErrorCode`](shared::ErrorCode) is retryable get another attempt; an
//! invalid key fails on the first try and is never hammered against the
//! provider.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use shared::ApiError;
use tracing::warn;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 4;
const BASE_DELAY_MS: u64 = 1000;
const MAX_JITTER_MS: u64 = 1000;

/// Run `op` up to `max_attempts` times. `op` is a factory producing one
/// attempt's future. Delay before attempt n+1 is `base * 2^(n-1)` plus up to
/// one second of jitter.
pub async fn with_retry<T, F, Fut>(max_attempts: u32, mut op: F) -> Result<T, ApiError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !err.retryable() || attempt >= max_attempts {
                    return Err(err);
                }
                let jitter = rand::thread_rng().gen_range(0..MAX_JITTER_MS);
                let delay = BASE_DELAY_MS * (1u64 << (attempt - 1)) + jitter;
                warn!(
                    provider = err.provider.as_str(),
                    code = ?err.code,
                    attempt,
                    delay_ms = delay,
                    "retryable provider error, backing off"
                );
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }
        }
    }
}
