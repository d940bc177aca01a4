use log::{trace, warn};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::error::{Result, TraceError};

/// Bounds the number of filesystem operations in flight.
///
/// Waiters are served in FIFO order. A gate built with capacity 0 never
/// grants a permit.
#[derive(Debug, Clone)]
pub struct Gate {
    slots: Arc<Semaphore>,
    capacity: usize,
}

impl Gate {
    pub fn new(capacity: usize) -> Self {
        if capacity == 0 {
            warn!("Concurrency gate created with capacity 0; every acquire will wait forever");
        }
        let capacity = capacity.min(Semaphore::MAX_PERMITS);
        Self { slots: Arc::new(Semaphore::new(capacity)), capacity }
    }

    /// Waits for a free slot.
    pub async fn acquire(&self) -> Result<GatePermit> {
        trace!("Acquiring gate slot ({} free)", self.slots.available_permits());
        let permit =
            Arc::clone(&self.slots).acquire_owned().await.map_err(|_| TraceError::GateClosed)?;
        Ok(GatePermit { permit: Some(permit) })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn available(&self) -> usize {
        self.slots.available_permits()
    }
}

/// A granted slot. Dropping the permit releases it.
#[derive(Debug)]
pub struct GatePermit {
    permit: Option<OwnedSemaphorePermit>,
}

impl GatePermit {
    /// Returns the slot to the gate. Only the first call has any effect.
    pub fn release(&mut self) {
        self.permit.take();
    }
}
