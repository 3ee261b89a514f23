use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

// ============================================================================
// Exponential Backoff Retry
// ============================================================================
//
// Used for startup dependencies (the Postgres pool) that may come up after
// this process does. Message handling never goes through here: a failed
// handler is logged and the message is considered consumed.
//
// ============================================================================

#[derive(Clone, Debug)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(10),
            multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    fn next_delay(&self, delay: Duration) -> Duration {
        let scaled = Duration::from_millis((delay.as_millis() as f64 * self.multiplier) as u64);
        scaled.min(self.max_delay)
    }
}

#[derive(Debug)]
pub enum RetryResult<T, E> {
    Success(T),
    /// Every attempt failed; carries the last error.
    Failed(E),
}

impl<T, E> RetryResult<T, E> {
    pub fn into_result(self) -> Result<T, E> {
        match self {
            RetryResult::Success(value) => Ok(value),
            RetryResult::Failed(error) => Err(error),
        }
    }
}

/// Run `operation` until it succeeds or `max_attempts` is reached.
/// The closure receives the 1-based attempt number.
pub async fn retry_with_backoff<F, Fut, T, E>(
    config: RetryConfig,
    mut operation: F,
) -> RetryResult<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt = 0;
    let mut delay = config.initial_delay;

    loop {
        attempt += 1;

        match operation(attempt).await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::info!(attempt = attempt, "Operation succeeded after retry");
                }
                return RetryResult::Success(value);
            }
            Err(error) if attempt >= config.max_attempts => {
                tracing::error!(
                    attempt = attempt,
                    error = %error,
                    "Operation failed after all retries"
                );
                return RetryResult::Failed(error);
            }
            Err(error) => {
                tracing::warn!(
                    attempt = attempt,
                    error = %error,
                    delay_ms = delay.as_millis() as u64,
                    "Operation failed, retrying after delay"
                );
                sleep(delay).await;
                delay = config.next_delay(delay);
            }
        }
    }
}
