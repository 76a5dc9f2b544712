use crate::{Error, Result};
use serde::Serialize;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CircuitBreakerSnapshot {
    pub resource: String,
    pub state: CircuitState,
    pub failure_threshold: u32,
    pub success_threshold: u32,
    pub recovery_timeout_ms: u64,
    pub consecutive_failures: u32,
    pub consecutive_successes: u32,
    /// Remaining open time in ms, if currently open.
    pub open_remaining_ms: Option<u64>,
    pub total_calls: u64,
    pub total_failures: u64,
    pub total_rejections: u64,
}

#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures while closed before opening.
    pub failure_threshold: u32,
    /// How long the circuit stays open before admitting probes.
    pub recovery_timeout: Duration,
    /// Consecutive probe successes needed to close again.
    pub success_threshold: u32,
    /// Probes allowed in flight at once while half-open.
    pub half_open_max_calls: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            recovery_timeout: Duration::from_secs(30),
            success_threshold: 2,
            half_open_max_calls: 2,
        }
    }
}

impl CircuitBreakerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold.max(1);
        self
    }

    pub fn with_recovery_timeout(mut self, timeout: Duration) -> Self {
        self.recovery_timeout = timeout;
        self
    }

    pub fn with_success_threshold(mut self, threshold: u32) -> Self {
        self.success_threshold = threshold.max(1);
        self
    }

    pub fn with_half_open_max_calls(mut self, calls: u32) -> Self {
        self.half_open_max_calls = calls.max(1);
        self
    }
}

#[derive(Debug)]
struct State {
    state: CircuitState,
    consecutive_failures: u32,
    consecutive_successes: u32,
    changed_at: Instant,
    probes_in_flight: u32,
    /// Bumped on every transition; outcomes admitted under an older
    /// generation no longer move the state machine.
    generation: u64,
}

#[derive(Debug, Clone, Copy)]
struct Admission {
    generation: u64,
    probe: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Success,
    Failure,
    /// Finished with an error that says nothing about upstream health.
    Neutral,
    /// Caller dropped the call before it finished.
    Abandoned,
}

/// Three-state circuit breaker (closed, open, half-open).
///
/// The lock is only held to admit a call and to record its outcome, never
/// while the protected operation runs.
pub struct CircuitBreaker {
    resource: String,
    cfg: CircuitBreakerConfig,
    state: Mutex<State>,
    total_calls: AtomicU64,
    total_failures: AtomicU64,
    total_rejections: AtomicU64,
}

impl CircuitBreaker {
    pub fn new(cfg: CircuitBreakerConfig) -> Self {
        Self::named("citation_api", cfg)
    }

    pub fn named(resource: impl Into<String>, cfg: CircuitBreakerConfig) -> Self {
        Self {
            resource: resource.into(),
            cfg,
            state: Mutex::new(State {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                consecutive_successes: 0,
                changed_at: Instant::now(),
                probes_in_flight: 0,
                generation: 0,
            }),
            total_calls: AtomicU64::new(0),
            total_failures: AtomicU64::new(0),
            total_rejections: AtomicU64::new(0),
        }
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.cfg
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current state. An open circuit whose recovery timeout has elapsed
    /// reports half-open.
    pub fn state(&self) -> CircuitState {
        let mut st = self.lock();
        self.maybe_half_open(&mut st);
        st.state
    }

    fn maybe_half_open(&self, st: &mut State) {
        if st.state == CircuitState::Open
            && st.changed_at.elapsed() >= self.cfg.recovery_timeout
        {
            self.transition(st, CircuitState::HalfOpen);
        }
    }

    fn transition(&self, st: &mut State, to: CircuitState) {
        let from = st.state;
        st.state = to;
        st.changed_at = Instant::now();
        st.consecutive_successes = 0;
        st.probes_in_flight = 0;
        st.generation = st.generation.wrapping_add(1);
        if to == CircuitState::Closed {
            st.consecutive_failures = 0;
        }
        match to {
            CircuitState::Open => warn!(
                resource = %self.resource,
                from = from.as_str(),
                failures = st.consecutive_failures,
                recovery_timeout_ms = self.cfg.recovery_timeout.as_millis() as u64,
                "circuit breaker opened"
            ),
            _ => info!(
                resource = %self.resource,
                from = from.as_str(),
                to = to.as_str(),
                "circuit breaker state changed"
            ),
        }
    }

    fn admit(&self) -> Result<Admission> {
        let mut st = self.lock();
        self.maybe_half_open(&mut st);
        match st.state {
            CircuitState::Closed => Ok(Admission {
                generation: st.generation,
                probe: false,
            }),
            CircuitState::HalfOpen if st.probes_in_flight < self.cfg.half_open_max_calls => {
                st.probes_in_flight += 1;
                Ok(Admission {
                    generation: st.generation,
                    probe: true,
                })
            }
            CircuitState::HalfOpen => Err(self.rejection(Duration::ZERO)),
            CircuitState::Open => {
                let retry_in = self
                    .cfg
                    .recovery_timeout
                    .saturating_sub(st.changed_at.elapsed());
                Err(self.rejection(retry_in))
            }
        }
    }

    fn rejection(&self, retry_in: Duration) -> Error {
        self.total_rejections.fetch_add(1, Ordering::Relaxed);
        Error::CircuitOpen {
            resource: self.resource.clone(),
            retry_in,
        }
    }

    fn record(&self, admission: Admission, outcome: Outcome) {
        let mut st = self.lock();
        if st.generation != admission.generation {
            return;
        }
        if admission.probe {
            st.probes_in_flight = st.probes_in_flight.saturating_sub(1);
        }
        match (st.state, outcome) {
            (CircuitState::Closed, Outcome::Success) => st.consecutive_failures = 0,
            (CircuitState::Closed, Outcome::Failure) => {
                st.consecutive_failures = st.consecutive_failures.saturating_add(1);
                if st.consecutive_failures >= self.cfg.failure_threshold {
                    self.transition(&mut st, CircuitState::Open);
                }
            }
            (CircuitState::HalfOpen, Outcome::Success) => {
                st.consecutive_successes += 1;
                if st.consecutive_successes >= self.cfg.success_threshold {
                    self.transition(&mut st, CircuitState::Closed);
                }
            }
            (CircuitState::HalfOpen, Outcome::Failure) => {
                st.consecutive_failures = st.consecutive_failures.saturating_add(1);
                self.transition(&mut st, CircuitState::Open);
            }
            _ => {}
        }
    }

    /// Run `operation` under the breaker.
    ///
    /// Fails fast with [`Error::CircuitOpen`] when the circuit rejects the
    /// call; otherwise the operation's own result is returned unchanged after
    /// its outcome has been recorded.
    pub async fn call<F, Fut, T>(&self, operation: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let admission = self.admit()?;
        self.total_calls.fetch_add(1, Ordering::Relaxed);
        let mut guard = AdmissionGuard {
            breaker: self,
            admission: Some(admission),
        };

        let result = operation().await;

        let outcome = match &result {
            Ok(_) => Outcome::Success,
            Err(e) if e.counts_as_failure() => {
                self.total_failures.fetch_add(1, Ordering::Relaxed);
                Outcome::Failure
            }
            Err(_) => Outcome::Neutral,
        };
        guard.finish(outcome);
        result
    }

    /// Force the circuit open, as if the failure threshold had been reached.
    pub fn force_open(&self) {
        let mut st = self.lock();
        if st.state != CircuitState::Open {
            self.transition(&mut st, CircuitState::Open);
        } else {
            st.changed_at = Instant::now();
        }
    }

    /// Close the circuit and clear all counters.
    pub fn reset(&self) {
        let mut st = self.lock();
        if st.state != CircuitState::Closed {
            self.transition(&mut st, CircuitState::Closed);
        }
        st.consecutive_failures = 0;
    }

    pub fn snapshot(&self) -> CircuitBreakerSnapshot {
        let mut st = self.lock();
        self.maybe_half_open(&mut st);
        let open_remaining_ms = (st.state == CircuitState::Open).then(|| {
            self.cfg
                .recovery_timeout
                .saturating_sub(st.changed_at.elapsed())
                .as_millis() as u64
        });
        CircuitBreakerSnapshot {
            resource: self.resource.clone(),
            state: st.state,
            failure_threshold: self.cfg.failure_threshold,
            success_threshold: self.cfg.success_threshold,
            recovery_timeout_ms: self.cfg.recovery_timeout.as_millis() as u64,
            consecutive_failures: st.consecutive_failures,
            consecutive_successes: st.consecutive_successes,
            open_remaining_ms,
            total_calls: self.total_calls.load(Ordering::Relaxed),
            total_failures: self.total_failures.load(Ordering::Relaxed),
            total_rejections: self.total_rejections.load(Ordering::Relaxed),
        }
    }
}

/// Releases a half-open probe slot if the call future is dropped mid-flight.
struct AdmissionGuard<'a> {
    breaker: &'a CircuitBreaker,
    admission: Option<Admission>,
}

impl AdmissionGuard<'_> {
    fn finish(&mut self, outcome: Outcome) {
        if let Some(admission) = self.admission.take() {
            self.breaker.record(admission, outcome);
        }
    }
}

impl Drop for AdmissionGuard<'_> {
    fn drop(&mut self) {
        self.finish(Outcome::Abandoned);
    }
}
