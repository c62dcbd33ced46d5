use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

// ============================================================================
// Circuit Breaker
// ============================================================================
//
// Stops calling an external gateway that keeps failing, then probes it again
// after a cool-down.
//
// States:
// - Closed: calls pass through
// - Open: calls are refused without touching the gateway
// - HalfOpen: cool-down elapsed, calls pass and decide the next state
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
    /// Consecutive failures that open the circuit
    pub failure_threshold: u32,
    /// How long the circuit stays open before probing
    pub cool_down: Duration,
    /// Successes in half-open needed to close again
    pub success_threshold: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            cool_down: Duration::from_secs(30),
            success_threshold: 2,
        }
    }
}

#[derive(Debug)]
pub enum CircuitBreakerError<E> {
    CircuitOpen,
    OperationFailed(E),
}

impl<E: std::fmt::Display> std::fmt::Display for CircuitBreakerError<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CircuitBreakerError::CircuitOpen => write!(f, "circuit breaker is open"),
            CircuitBreakerError::OperationFailed(e) => write!(f, "operation failed: {}", e),
        }
    }
}

#[derive(Debug)]
struct Breaker {
    state: CircuitState,
    failures: u32,
    successes: u32,
    opened_at: Option<Instant>,
}

#[derive(Clone)]
pub struct CircuitBreaker {
    breaker: Arc<Mutex<Breaker>>,
    config: CircuitBreakerConfig,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            breaker: Arc::new(Mutex::new(Breaker {
                state: CircuitState::Closed,
                failures: 0,
                successes: 0,
                opened_at: None,
            })),
            config,
        }
    }

    // State updates never panic midway, so a poisoned lock is still consistent
    fn lock(&self) -> MutexGuard<'_, Breaker> {
        self.breaker.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `operation` unless the circuit is open.
    pub async fn call<F, T, E>(&self, operation: F) -> Result<T, CircuitBreakerError<E>>
    where
        F: std::future::Future<Output = Result<T, E>>,
    {
        if !self.admit() {
            return Err(CircuitBreakerError::CircuitOpen);
        }

        match operation.await {
            Ok(value) => {
                self.on_success();
                Ok(value)
            }
            Err(err) => {
                self.on_failure();
                Err(CircuitBreakerError::OperationFailed(err))
            }
        }
    }

    fn admit(&self) -> bool {
        let mut breaker = self.lock();
        if breaker.state != CircuitState::Open {
            return true;
        }

        let cooled = breaker
            .opened_at
            .map_or(true, |at| at.elapsed() >= self.config.cool_down);
        if cooled {
            tracing::info!("Circuit breaker half-open, probing gateway");
            breaker.state = CircuitState::HalfOpen;
            breaker.successes = 0;
        }
        cooled
    }

    fn on_success(&self) {
        let mut breaker = self.lock();
        match breaker.state {
            CircuitState::HalfOpen => {
                breaker.successes += 1;
                if breaker.successes >= self.config.success_threshold {
                    tracing::info!(successes = breaker.successes, "Circuit breaker closed");
                    breaker.state = CircuitState::Closed;
                    breaker.failures = 0;
                    breaker.successes = 0;
                    breaker.opened_at = None;
                }
            }
            CircuitState::Closed => breaker.failures = 0,
            CircuitState::Open => {}
        }
    }

    fn on_failure(&self) {
        let mut breaker = self.lock();
        breaker.failures += 1;

        let trips = match breaker.state {
            CircuitState::Closed => breaker.failures >= self.config.failure_threshold,
            CircuitState::HalfOpen => true,
            CircuitState::Open => false,
        };
        if trips {
            tracing::warn!(failures = breaker.failures, "Circuit breaker opened");
            breaker.state = CircuitState::Open;
            breaker.successes = 0;
            breaker.opened_at = Some(Instant::now());
        }
    }

    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    pub fn failure_count(&self) -> u32 {
        self.lock().failures
    }

    pub fn reset(&self) {
        let mut breaker = self.lock();
        breaker.state = CircuitState::Closed;
        breaker.failures = 0;
        breaker.successes = 0;
        breaker.opened_at = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker(failures: u32, cool_down: Duration, successes: u32) -> CircuitBreaker {
        CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: failures,
            cool_down,
            success_threshold: successes,
        })
    }

    #[tokio::test]
    async fn test_opens_after_threshold() {
        let cb = breaker(3, Duration::from_secs(60), 1);

        for _ in 0..3 {
            let result = cb.call(async { Err::<(), _>("gateway down") }).await;
            assert!(matches!(result, Err(CircuitBreakerError::OperationFailed(_))));
        }
        assert_eq!(cb.state(), CircuitState::Open);

        let result = cb.call(async { Ok::<_, &str>(()) }).await;
        assert!(matches!(result, Err(CircuitBreakerError::CircuitOpen)));
    }

    #[tokio::test]
    async fn test_success_resets_failure_count() {
        let cb = breaker(3, Duration::from_secs(60), 1);

        let _ = cb.call(async { Err::<(), _>("blip") }).await;
        let _ = cb.call(async { Err::<(), _>("blip") }).await;
        assert_eq!(cb.failure_count(), 2);

        cb.call(async { Ok::<_, &str>(()) }).await.unwrap();
        assert_eq!(cb.failure_count(), 0);
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_half_open_probe_closes_circuit() {
        let cb = breaker(1, Duration::from_millis(50), 1);

        let _ = cb.call(async { Err::<(), _>("down") }).await;
        assert_eq!(cb.state(), CircuitState::Open);

        tokio::time::sleep(Duration::from_millis(80)).await;
        cb.call(async { Ok::<_, &str>(()) }).await.unwrap();
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_half_open_failure_reopens() {
        let cb = breaker(1, Duration::from_millis(50), 2);

        let _ = cb.call(async { Err::<(), _>("down") }).await;
        tokio::time::sleep(Duration::from_millis(80)).await;

        let _ = cb.call(async { Err::<(), _>("still down") }).await;
        assert_eq!(cb.state(), CircuitState::Open);

        cb.reset();
        assert_eq!(cb.state(), CircuitState::Closed);
    }
}
