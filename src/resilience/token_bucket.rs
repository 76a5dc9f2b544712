use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

// Absorbs float drift so that waiting exactly `wait_time_for(n)` is enough.
const EPSILON: f64 = 1e-9;

#[derive(Debug)]
struct State {
    tokens: f64,
    last_refill: Instant,
}

/// Continuous-refill token bucket.
///
/// Starts full. Tokens accrue at `refill_rate` per second up to `capacity`;
/// the count never goes negative and never exceeds capacity.
#[derive(Debug)]
pub struct TokenBucket {
    capacity: f64,
    refill_rate: f64,
    state: Mutex<State>,
}

impl TokenBucket {
    pub fn new(capacity: f64, refill_rate: f64) -> Self {
        let capacity = if capacity.is_finite() { capacity.max(0.0) } else { 0.0 };
        let refill_rate = if refill_rate.is_finite() {
            refill_rate.max(0.0)
        } else {
            0.0
        };
        Self {
            capacity,
            refill_rate,
            state: Mutex::new(State {
                tokens: capacity,
                last_refill: Instant::now(),
            }),
        }
    }

    pub fn capacity(&self) -> f64 {
        self.capacity
    }

    pub fn refill_rate(&self) -> f64 {
        self.refill_rate
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn refill_locked(&self, st: &mut State) {
        let now = Instant::now();
        let elapsed = now.saturating_duration_since(st.last_refill).as_secs_f64();
        if elapsed > 0.0 {
            st.tokens = (st.tokens + elapsed * self.refill_rate).min(self.capacity);
            st.last_refill = now;
        }
    }

    fn take_locked(st: &mut State, n: f64) -> bool {
        if st.tokens + EPSILON >= n {
            st.tokens = (st.tokens - n).max(0.0);
            true
        } else {
            false
        }
    }

    fn deficit_wait(&self, tokens: f64, n: f64) -> Duration {
        let missing = n - tokens;
        if missing <= EPSILON {
            return Duration::ZERO;
        }
        if self.refill_rate <= 0.0 {
            return Duration::MAX;
        }
        // Round up to the next nanosecond so the wait is never short.
        let nanos = (missing / self.refill_rate * 1e9).ceil();
        if nanos >= u64::MAX as f64 {
            Duration::MAX
        } else {
            Duration::from_nanos(nanos as u64)
        }
    }

    /// Current token count after refill.
    pub fn available(&self) -> f64 {
        let mut st = self.lock();
        self.refill_locked(&mut st);
        st.tokens
    }

    /// Take `n` tokens if they are available right now.
    pub fn try_consume(&self, n: f64) -> bool {
        let mut st = self.lock();
        self.refill_locked(&mut st);
        Self::take_locked(&mut st, n)
    }

    /// Time until `n` tokens will be available; zero if they already are.
    ///
    /// Returns [`Duration::MAX`] when `n` can never be satisfied.
    pub fn wait_time_for(&self, n: f64) -> Duration {
        if n > self.capacity + EPSILON {
            return Duration::MAX;
        }
        let mut st = self.lock();
        self.refill_locked(&mut st);
        self.deficit_wait(st.tokens, n)
    }

    /// Wait until `n` tokens can be taken, then take them.
    ///
    /// Returns how long the caller waited. The lock is never held across a
    /// sleep, so concurrent waiters each re-check after waking. Callers must
    /// not ask for more than `capacity`; such a request would never complete
    /// and is clamped to the full bucket.
    pub async fn wait(&self, n: f64) -> Duration {
        let n = n.min(self.capacity);
        let started = Instant::now();
        loop {
            let wait = {
                let mut st = self.lock();
                self.refill_locked(&mut st);
                if Self::take_locked(&mut st, n) {
                    return started.elapsed();
                }
                self.deficit_wait(st.tokens, n)
            };
            tokio::time::sleep(wait).await;
        }
    }

    /// Like [`wait`](Self::wait) but gives up once the total wait would exceed
    /// `max_wait`. Returns `Err(waited)` without consuming anything on timeout.
    pub async fn wait_bounded(&self, n: f64, max_wait: Duration) -> Result<Duration, Duration> {
        let n = n.min(self.capacity);
        let started = Instant::now();
        loop {
            let wait = {
                let mut st = self.lock();
                self.refill_locked(&mut st);
                if Self::take_locked(&mut st, n) {
                    return Ok(started.elapsed());
                }
                self.deficit_wait(st.tokens, n)
            };
            let waited = started.elapsed();
            if waited.saturating_add(wait) > max_wait {
                return Err(waited);
            }
            tokio::time::sleep(wait).await;
        }
    }
}
