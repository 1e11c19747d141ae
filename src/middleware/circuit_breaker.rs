use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::core::config::CircuitConfig;
use crate::utils::Metrics;

/// Circuit breaker state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Calls go through
    Closed,
    /// Backend considered down, calls fail fast
    Open,
    /// Cool-down elapsed, a single trial call is allowed
    HalfOpen,
}

#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures that open the circuit
    pub failure_threshold: usize,
    /// Cool-down before a trial call is allowed
    pub timeout: Duration,
    /// Consecutive trial successes needed to close again
    pub success_threshold: usize,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            timeout: Duration::from_secs(60),
            success_threshold: 1,
        }
    }
}

impl From<&CircuitConfig> for CircuitBreakerConfig {
    fn from(config: &CircuitConfig) -> Self {
        Self {
            failure_threshold: config.failure_threshold,
            timeout: Duration::from_secs(config.timeout_seconds),
            success_threshold: config.success_threshold,
        }
    }
}

/// Circuit breaker in front of a remote inference endpoint.
///
/// Model loads and inference calls share one breaker so a dead endpoint stops
/// absorbing new load attempts until the cool-down has passed.
#[derive(Clone)]
pub struct CircuitBreaker {
    name: &'static str,
    inner: Arc<RwLock<CircuitBreakerInner>>,
    config: CircuitBreakerConfig,
    metrics: Option<Metrics>,
}

struct CircuitBreakerInner {
    state: CircuitState,
    consecutive_failures: usize,
    consecutive_successes: usize,
    opened_at: Option<Instant>,
    trial_in_flight: bool,
    total_failures: usize,
    total_successes: usize,
    total_rejected: usize,
}

impl CircuitBreaker {
    pub fn new(name: &'static str, config: CircuitBreakerConfig, metrics: Option<Metrics>) -> Self {
        Self {
            name,
            inner: Arc::new(RwLock::new(CircuitBreakerInner {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                consecutive_successes: 0,
                opened_at: None,
                trial_in_flight: false,
                total_failures: 0,
                total_successes: 0,
                total_rejected: 0,
            })),
            config,
            metrics,
        }
    }

    /// Admit one call. The permit records the outcome; dropping it unsettled
    /// (cancelled or timed-out caller) counts as a failure.
    pub fn try_acquire(&self) -> Option<CallPermit> {
        self.allow_request().then(|| CallPermit {
            breaker: self.clone(),
            settled: false,
        })
    }

    /// Whether a call may proceed. Every `true` must be followed by
    /// `record_success` or `record_failure`.
    pub fn allow_request(&self) -> bool {
        let mut inner = self.inner.write();

        let allowed = match inner.state {
            CircuitState::Closed => true,
            CircuitState::Open => {
                let cooled_down = inner
                    .opened_at
                    .map(|opened| opened.elapsed() >= self.config.timeout)
                    .unwrap_or(true);
                if cooled_down {
                    info!(breaker = self.name, "Circuit half-open, admitting a trial call");
                    inner.state = CircuitState::HalfOpen;
                    inner.consecutive_successes = 0;
                    inner.trial_in_flight = true;
                    true
                } else {
                    false
                }
            }
            CircuitState::HalfOpen => {
                if inner.trial_in_flight {
                    false
                } else {
                    inner.trial_in_flight = true;
                    true
                }
            }
        };

        if !allowed {
            inner.total_rejected += 1;
        }
        allowed
    }

    pub fn record_success(&self) {
        let mut inner = self.inner.write();
        inner.total_successes += 1;
        inner.consecutive_failures = 0;

        if inner.state == CircuitState::HalfOpen {
            inner.trial_in_flight = false;
            inner.consecutive_successes += 1;
            if inner.consecutive_successes >= self.config.success_threshold {
                info!(breaker = self.name, "Circuit closed, backend recovered");
                inner.state = CircuitState::Closed;
                inner.consecutive_successes = 0;
                inner.opened_at = None;
            }
        }
    }

    pub fn record_failure(&self) {
        let mut inner = self.inner.write();
        inner.total_failures += 1;
        inner.consecutive_successes = 0;
        inner.consecutive_failures += 1;

        let trip = match inner.state {
            CircuitState::Closed => inner.consecutive_failures >= self.config.failure_threshold,
            CircuitState::HalfOpen => true,
            CircuitState::Open => false,
        };

        if trip {
            warn!(
                breaker = self.name,
                consecutive_failures = inner.consecutive_failures,
                "Circuit opened"
            );
            inner.state = CircuitState::Open;
            inner.opened_at = Some(Instant::now());
            inner.trial_in_flight = false;
            if let Some(ref m) = self.metrics {
                m.record_circuit_breaker_trip();
            }
        }
    }

    pub fn state(&self) -> CircuitState {
        self.inner.read().state
    }

    pub fn stats(&self) -> CircuitBreakerStats {
        let inner = self.inner.read();
        CircuitBreakerStats {
            name: self.name,
            state: inner.state,
            consecutive_failures: inner.consecutive_failures,
            total_failures: inner.total_failures,
            total_successes: inner.total_successes,
            total_rejected: inner.total_rejected,
        }
    }

    pub fn reset(&self) {
        let mut inner = self.inner.write();
        inner.state = CircuitState::Closed;
        inner.consecutive_failures = 0;
        inner.consecutive_successes = 0;
        inner.opened_at = None;
        inner.trial_in_flight = false;
    }
}

/// Admission for a single guarded call
#[must_use = "dropping a permit records a failure"]
pub struct CallPermit {
    breaker: CircuitBreaker,
    settled: bool,
}

impl CallPermit {
    pub fn success(mut self) {
        self.settled = true;
        self.breaker.record_success();
    }

    pub fn failure(mut self) {
        self.settled = true;
        self.breaker.record_failure();
    }
}

impl Drop for CallPermit {
    fn drop(&mut self) {
        if !self.settled {
            warn!(breaker = self.breaker.name, "Call abandoned before completion");
            self.breaker.record_failure();
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CircuitBreakerStats {
    pub name: &'static str,
    pub state: CircuitState,
    pub consecutive_failures: usize,
    pub total_failures: usize,
    pub total_successes: usize,
    pub total_rejected: usize,
}
