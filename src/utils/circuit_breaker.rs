use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

// ============================================================================
// Circuit Breaker
// ============================================================================
//
// Wraps calls to a remote dependency (the Kafka producer here). After
// `failure_threshold` consecutive failures the circuit opens and calls fail
// fast until `open_for` has elapsed; the next call then tries the
// dependency in HalfOpen, and `success_threshold` successes close it again.
//
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub open_for: Duration,
    pub success_threshold: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            open_for: Duration::from_secs(30),
            success_threshold: 3,
        }
    }
}

#[derive(Debug)]
struct Inner {
    state: CircuitState,
    consecutive_failures: u32,
    half_open_successes: u32,
    opened_at: Option<Instant>,
}

#[derive(Clone)]
pub struct CircuitBreaker {
    inner: Arc<Mutex<Inner>>,
    config: CircuitBreakerConfig,
}

#[derive(Debug, thiserror::Error)]
pub enum CircuitBreakerError<E> {
    #[error("Circuit breaker is open")]
    CircuitOpen,

    #[error("Operation failed: {0}")]
    OperationFailed(E),
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                half_open_successes: 0,
                opened_at: None,
            })),
            config,
        }
    }

    /// Run `operation` unless the circuit is open.
    pub async fn call<F, T, E>(&self, operation: F) -> Result<T, CircuitBreakerError<E>>
    where
        F: Future<Output = Result<T, E>>,
    {
        if !self.admit().await {
            return Err(CircuitBreakerError::CircuitOpen);
        }

        let result = operation.await;
        self.settle(result.is_ok()).await;
        result.map_err(CircuitBreakerError::OperationFailed)
    }

    /// Whether a call may go through, moving Open to HalfOpen once cooled down.
    async fn admit(&self) -> bool {
        let mut inner = self.inner.lock().await;
        if inner.state != CircuitState::Open {
            return true;
        }

        let cooled_down = inner
            .opened_at
            .map_or(true, |at| at.elapsed() >= self.config.open_for);
        if !cooled_down {
            return false;
        }

        tracing::info!("Circuit breaker half-open, probing dependency");
        inner.state = CircuitState::HalfOpen;
        inner.half_open_successes = 0;
        true
    }

    async fn settle(&self, success: bool) {
        let mut inner = self.inner.lock().await;

        if success {
            inner.consecutive_failures = 0;
            if inner.state == CircuitState::HalfOpen {
                inner.half_open_successes += 1;
                if inner.half_open_successes >= self.config.success_threshold {
                    tracing::info!("Circuit breaker closed");
                    inner.state = CircuitState::Closed;
                    inner.opened_at = None;
                }
            }
            return;
        }

        inner.consecutive_failures += 1;
        let trip = match inner.state {
            CircuitState::HalfOpen => true,
            CircuitState::Closed => inner.consecutive_failures >= self.config.failure_threshold,
            CircuitState::Open => false,
        };
        if trip {
            tracing::warn!(
                failures = inner.consecutive_failures,
                "Circuit breaker opened"
            );
            inner.state = CircuitState::Open;
            inner.opened_at = Some(Instant::now());
        }
    }

    pub async fn state(&self) -> CircuitState {
        self.inner.lock().await.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker(failure_threshold: u32, open_for: Duration, success_threshold: u32) -> CircuitBreaker {
        CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold,
            open_for,
            success_threshold,
        })
    }

    #[tokio::test]
    async fn test_opens_after_consecutive_failures() {
        let cb = breaker(3, Duration::from_secs(60), 1);

        for _ in 0..3 {
            let result = cb.call(async { Err::<(), _>("broker down") }).await;
            assert!(matches!(result, Err(CircuitBreakerError::OperationFailed("broker down"))));
        }
        assert_eq!(cb.state().await, CircuitState::Open);

        let result = cb.call(async { Ok::<_, &str>(()) }).await;
        assert!(matches!(result, Err(CircuitBreakerError::CircuitOpen)));
    }

    #[tokio::test]
    async fn test_success_resets_failure_streak() {
        let cb = breaker(2, Duration::from_secs(60), 1);

        let _ = cb.call(async { Err::<(), _>("e") }).await;
        let _ = cb.call(async { Ok::<_, &str>(()) }).await;
        let _ = cb.call(async { Err::<(), _>("e") }).await;

        assert_eq!(cb.state().await, CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_half_open_success_closes_circuit() {
        let cb = breaker(1, Duration::from_millis(50), 1);

        let _ = cb.call(async { Err::<(), _>("e") }).await;
        assert_eq!(cb.state().await, CircuitState::Open);

        tokio::time::sleep(Duration::from_millis(80)).await;

        assert!(cb.call(async { Ok::<_, &str>(()) }).await.is_ok());
        assert_eq!(cb.state().await, CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_half_open_failure_reopens_circuit() {
        let cb = breaker(1, Duration::from_millis(50), 2);

        let _ = cb.call(async { Err::<(), _>("e") }).await;
        tokio::time::sleep(Duration::from_millis(80)).await;
        let _ = cb.call(async { Err::<(), _>("still down") }).await;

        assert_eq!(cb.state().await, CircuitState::Open);
    }
}
