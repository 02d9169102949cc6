use std::future::Future;
use std::time::Duration;

use crate::report::Reporter;

/// Exponential backoff without jitter. Every error is treated as transient.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    pub base_delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_secs: 1,
        }
    }
}

impl RetryConfig {
    /// Delay after a failed attempt (0-indexed): `base_delay * 2^attempt`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let secs = self
            .base_delay_secs
            .saturating_mul(1u64.checked_shl(attempt).unwrap_or(u64::MAX));
        Duration::from_secs(secs)
    }
}

/// Retry an async operation with exponential backoff.
///
/// Before each retry a line is emitted to `reporter`. The final failure is
/// returned as-is, without a wait or a retry line.
pub async fn retry_with_backoff<F, Fut, T, E>(
    config: &RetryConfig,
    reporter: &dyn Reporter,
    operation: F,
) -> Result<T, E>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let total_attempts = config.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(val) => return Ok(val),
            Err(e) => {
                if attempt + 1 >= total_attempts {
                    return Err(e);
                }
                let delay = config.delay_for_attempt(attempt);
                tracing::warn!(
                    "Transient error (attempt {}/{}), retrying in {}s: {}",
                    attempt + 1,
                    total_attempts,
                    delay.as_secs(),
                    e
                );
                reporter.emit(&format!(
                    "  Transient error: {}. Retrying in {}s...",
                    e,
                    delay.as_secs()
                ));
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
