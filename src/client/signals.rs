use crate::cache::TieredCacheStats;
use crate::resilience::circuit_breaker::CircuitBreakerSnapshot;
use crate::resilience::rate_limiter::RateLimiterSnapshot;
use serde::Serialize;

use super::core::ResilientClient;

/// A point-in-time view of the client's resilience state.
///
/// Facts only: applications decide what to do with them (health endpoints,
/// dashboards, load shedding).
#[derive(Debug, Clone, Serialize)]
pub struct SignalsSnapshot {
    pub inflight: Option<InflightSnapshot>,
    pub rate_limiter: RateLimiterSnapshot,
    /// `None` when the breaker is disabled.
    pub circuit_breaker: Option<CircuitBreakerSnapshot>,
    pub cache: TieredCacheStats,
}

#[derive(Debug, Clone, Serialize)]
pub struct InflightSnapshot {
    pub max: usize,
    pub available: usize,
    pub in_use: usize,
}

impl ResilientClient {
    pub fn signals(&self) -> SignalsSnapshot {
        let inflight = self.inflight.as_ref().and_then(|sem| {
            let max = self.config.max_inflight?;
            let available = sem.available_permits();
            Some(InflightSnapshot {
                max,
                available,
                in_use: max.saturating_sub(available),
            })
        });

        SignalsSnapshot {
            inflight,
            rate_limiter: self.rate_limiter.snapshot(),
            circuit_breaker: self.breaker.as_ref().map(|b| b.snapshot()),
            cache: self.cache.stats(),
        }
    }
}
