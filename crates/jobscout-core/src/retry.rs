use std::future::Future;
use std::time::Duration;

use crate::error::AppError;
use crate::event_log::EventLog;

/// Retry configuration for a fallible async operation.
///
/// `max_retries` counts re-invocations, so the operation runs at most
/// `max_retries + 1` times. No jitter is added.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub exponential_backoff: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 1,
            retry_delay: Duration::from_secs(2),
            exponential_backoff: true,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, retry_delay: Duration) -> Self {
        Self {
            max_retries,
            retry_delay,
            exponential_backoff: true,
        }
    }

    pub fn with_fixed_delay(mut self) -> Self {
        self.exponential_backoff = false;
        self
    }

    /// Delay after the given failed attempt (1-indexed).
    ///
    /// Exponential: `retry_delay * 2^(attempt - 1)`; fixed: `retry_delay`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if !self.exponential_backoff {
            return self.retry_delay;
        }
        let exponent = attempt.saturating_sub(1).min(16);
        self.retry_delay.saturating_mul(1u32 << exponent)
    }
}

/// Run `operation` under `policy`, sleeping between failed attempts.
///
/// Emits one event per failed attempt and one on exhaustion, then returns
/// the last error.
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    site: &str,
    log: &EventLog,
    mut operation: F,
) -> Result<T, AppError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AppError>>,
{
    let max_attempts = policy.max_retries.saturating_add(1);
    let mut attempt = 1;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < max_attempts => {
                let delay = policy.delay_for_attempt(attempt);
                log.warn(
                    site,
                    format!(
                        "Attempt {attempt}/{max_attempts} failed: {err}. Retrying in {}ms",
                        delay.as_millis()
                    ),
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => {
                log.error(site, format!("All {max_attempts} attempts failed: {err}"));
                return Err(err);
            }
        }
    }
}
