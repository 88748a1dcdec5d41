//! Retry logic for transient control API failures.
//!
//! Only idempotent requests (info, volume, zone) go through here. Key presses
//! are never retried: a duplicated press would be a second user action.

use std::time::Duration;

use crate::soundtouch::control::ControlResult;

/// Retry delays for transient failures (exponential backoff).
const RETRY_DELAYS_MS: [u64; 3] = [200, 500, 1000];

/// Executes a control request with retry logic for transient errors.
///
/// Retries timeouts, connection failures and 503 responses with backoff
/// (200ms, 500ms, 1000ms). Any other error is returned immediately.
///
/// # Arguments
/// * `action` - Action name for logging
/// * `operation` - Closure that performs the request
pub(crate) async fn with_retry<F, Fut>(action: &str, mut operation: F) -> ControlResult<String>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = ControlResult<String>>,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(r) => return Ok(r),
            Err(e) if e.is_transient() && attempt < RETRY_DELAYS_MS.len() => {
                let delay_ms = RETRY_DELAYS_MS[attempt];
                attempt += 1;
                log::warn!(
                    "[HTTP] {} transient error, retrying (attempt {}/{}) after {}ms: {}",
                    action,
                    attempt + 1,
                    RETRY_DELAYS_MS.len() + 1,
                    delay_ms,
                    e
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
            Err(e) => return Err(e),
        }
    }
}
