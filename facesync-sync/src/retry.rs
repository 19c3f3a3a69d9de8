//! Retry loop for collaborator calls.
//!
//! `Transient` failures back off exponentially; `RateLimited` waits for the
//! delay the remote asked for (or the current backoff when it gave none).
//! Both share one attempt budget. Everything else returns at once.

use std::future::Future;

use facesync_core::RetryConfig;

use crate::error::ClientError;

pub async fn with_retry<T, F, Fut>(
    policy: &RetryConfig,
    operation: &'static str,
    mut call: F,
) -> Result<T, ClientError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ClientError>>,
{
    let mut attempt: u32 = 1;
    loop {
        match call().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt < policy.max_attempts => {
                let delay = match &err {
                    ClientError::RateLimited {
                        retry_after: Some(delay),
                    } => *delay,
                    _ => policy.backoff(attempt),
                };
                tracing::warn!(
                    operation,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "retrying after recoverable client error",
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
