use std::future::Future;

use tracing::warn;

use crate::error::AppResult;

use super::timings::RetryPolicy;

/// Runs `operation` until it succeeds, fails with a non-transient error, or
/// the attempts are used up. The last error is returned.
///
/// # Errors
///
/// Returns the error of the final attempt.
pub async fn with_retry<T, F, Fut>(
    policy: RetryPolicy,
    what: &str,
    mut operation: F,
) -> AppResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = AppResult<T>>,
{
    let attempts = policy.attempts.max(1);
    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() && attempt < attempts => {
                warn!(
                    "{} failed (attempt {}/{}), retrying in {}ms: {}",
                    what,
                    attempt,
                    attempts,
                    policy.delay.as_millis(),
                    err
                );
                attempt = attempt.saturating_add(1);
                tokio::time::sleep(policy.delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}
