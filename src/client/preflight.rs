//! Preflight gates run before an upstream call

use crate::transport::TransportError;
use crate::{Error, Result};
use tokio::sync::OwnedSemaphorePermit;

use super::core::ResilientClient;

impl ResilientClient {
    /// Rate limiter first, then the optional in-flight permit, which the
    /// caller holds for the whole protected call.
    pub(crate) async fn preflight(&self) -> Result<Option<OwnedSemaphorePermit>> {
        self.rate_limiter.acquire().await?;
        match &self.inflight {
            Some(sem) => sem.clone().acquire_owned().await.map(Some).map_err(|_| {
                Error::Transport(TransportError::Other(
                    "backpressure semaphore closed".to_string(),
                ))
            }),
            None => Ok(None),
        }
    }

    /// Fresh cache reads are skipped while the circuit is open so that the
    /// answer goes through the degraded path and carries its marker.
    pub(crate) fn read_through_allowed(&self) -> bool {
        self.cache.is_enabled()
            && self
                .breaker
                .as_ref()
                .map_or(true, |b| b.state() != crate::resilience::CircuitState::Open)
    }
}
