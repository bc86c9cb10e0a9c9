use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use crate::errors::IqFetchError;

/// Caps how many application fetches are in flight at once.
///
/// Waiters are admitted in FIFO order; a slot is released when the returned
/// permit is dropped.
#[derive(Clone)]
pub struct AdmissionGate {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

impl AdmissionGate {
    pub fn new(capacity: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    pub async fn acquire(&self) -> Result<OwnedSemaphorePermit, IqFetchError> {
        self.semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| IqFetchError::Internal("admission gate closed".into()))
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
