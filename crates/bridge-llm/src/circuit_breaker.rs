//! Circuit breaker guarding repeated provider failures (design note in
//! SPEC_FULL.md's [C3] section; modeled on the teacher's circuit breaker for
//! ComfyUI/LLM calls — closed/open/half-open with a failure threshold and a
//! cooldown before probing recovery).

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::RwLock;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub open_duration: Duration,
    pub half_open_max_requests: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            open_duration: Duration::from_secs(60),
            half_open_max_requests: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone, Copy)]
pub struct CircuitOpenError {
    pub retry_after: Duration,
}

impl std::fmt::Display for CircuitOpenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "circuit breaker open, retry after {:?}", self.retry_after)
    }
}

struct Internal {
    state: CircuitState,
    opened_at: Option<Instant>,
    half_open_successes: u32,
}

/// Thread-safe breaker. One instance per provider, shared across cycles.
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    internal: RwLock<Internal>,
    consecutive_failures: AtomicU32,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            internal: RwLock::new(Internal {
                state: CircuitState::Closed,
                opened_at: None,
                half_open_successes: 0,
            }),
            consecutive_failures: AtomicU32::new(0),
        }
    }

    pub fn state(&self) -> CircuitState {
        let cur = self.internal.read().unwrap().state;
        if cur == CircuitState::Open {
            let elapsed_enough = self
                .internal
                .read()
                .unwrap()
                .opened_at
                .is_some_and(|t| t.elapsed() >= self.config.open_duration);
            if elapsed_enough {
                let mut guard = self.internal.write().unwrap();
                if guard.state == CircuitState::Open {
                    guard.state = CircuitState::HalfOpen;
                    guard.half_open_successes = 0;
                    tracing::info!("circuit breaker transitioning to half-open");
                }
                return guard.state;
            }
        }
        cur
    }

    /// Returns `Err` if the circuit is open and the caller should fail fast
    /// without invoking the wrapped provider.
    pub fn allow_request(&self) -> Result<(), CircuitOpenError> {
        match self.state() {
            CircuitState::Closed | CircuitState::HalfOpen => Ok(()),
            CircuitState::Open => {
                let guard = self.internal.read().unwrap();
                let retry_after = guard
                    .opened_at
                    .map(|t| self.config.open_duration.saturating_sub(t.elapsed()))
                    .unwrap_or(self.config.open_duration);
                Err(CircuitOpenError { retry_after })
            }
        }
    }

    pub fn record_success(&self) {
        self.consecutive_failures.store(0, Ordering::Relaxed);
        let mut guard = self.internal.write().unwrap();
        if guard.state == CircuitState::HalfOpen {
            guard.half_open_successes += 1;
            if guard.half_open_successes >= self.config.half_open_max_requests {
                tracing::info!("circuit breaker closing after recovery");
                guard.state = CircuitState::Closed;
                guard.opened_at = None;
            }
        }
    }

    pub fn record_failure(&self) {
        let failures = self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1;
        let mut guard = self.internal.write().unwrap();
        match guard.state {
            CircuitState::Closed if failures >= self.config.failure_threshold => {
                tracing::warn!(failures, "circuit breaker opening");
                guard.state = CircuitState::Open;
                guard.opened_at = Some(Instant::now());
            }
            CircuitState::HalfOpen => {
                tracing::warn!("circuit breaker re-opening after half-open failure");
                guard.state = CircuitState::Open;
                guard.opened_at = Some(Instant::now());
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn config(threshold: u32, open_ms: u64) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: threshold,
            open_duration: Duration::from_millis(open_ms),
            half_open_max_requests: 1,
        }
    }

    #[test]
    fn starts_closed_and_allows_requests() {
        let cb = CircuitBreaker::new(CircuitBreakerConfig::default());
        assert_eq!(cb.state(), CircuitState::Closed);
        assert!(cb.allow_request().is_ok());
    }

    #[test]
    fn opens_after_threshold_consecutive_failures() {
        let cb = CircuitBreaker::new(config(3, 60_000));
        cb.record_failure();
        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Closed);
        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Open);
        assert!(cb.allow_request().is_err());
    }

    #[test]
    fn success_resets_consecutive_failure_count() {
        let cb = CircuitBreaker::new(config(3, 60_000));
        cb.record_failure();
        cb.record_failure();
        cb.record_success();
        cb.record_failure();
        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[test]
    fn transitions_to_half_open_then_closes_on_success() {
        let cb = CircuitBreaker::new(config(1, 20));
        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Open);
        thread::sleep(Duration::from_millis(30));
        assert_eq!(cb.state(), CircuitState::HalfOpen);
        cb.record_success();
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[test]
    fn half_open_failure_reopens_circuit() {
        let cb = CircuitBreaker::new(config(1, 20));
        cb.record_failure();
        thread::sleep(Duration::from_millis(30));
        assert_eq!(cb.state(), CircuitState::HalfOpen);
        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Open);
    }
}
