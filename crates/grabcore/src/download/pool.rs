//! Bounded worker slots for retrievals.
//!
//! Each retrieval holds a slot from admission until its artifact is dropped
//! after delivery, which bounds concurrent extractor processes and the disk
//! used by artifacts waiting for upload. What happens when every slot is
//! taken is the [`AdmissionPolicy`].

use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore, TryAcquireError};

use crate::download::error::RetrievalError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum AdmissionPolicy {
    /// Wait for a slot to free up
    Queue,
    /// Turn the request away with [`RetrievalError::Busy`]
    Reject,
}

/// A taken slot; released on drop.
#[derive(Debug)]
pub struct WorkerSlot {
    _permit: OwnedSemaphorePermit,
}

#[derive(Debug, Clone)]
pub struct WorkerPool {
    semaphore: Arc<Semaphore>,
    capacity: usize,
    policy: AdmissionPolicy,
}

impl WorkerPool {
    pub fn new(capacity: usize, policy: AdmissionPolicy) -> Self {
        let capacity = capacity.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
            policy,
        }
    }

    pub async fn admit(&self) -> Result<WorkerSlot, RetrievalError> {
        let permit = match self.policy {
            AdmissionPolicy::Queue => Arc::clone(&self.semaphore)
                .acquire_owned()
                .await
                .map_err(|e| RetrievalError::WorkerFailed(e.to_string()))?,
            AdmissionPolicy::Reject => match Arc::clone(&self.semaphore).try_acquire_owned() {
                Ok(permit) => permit,
                Err(TryAcquireError::NoPermits) => return Err(RetrievalError::Busy(self.capacity)),
                Err(e @ TryAcquireError::Closed) => return Err(RetrievalError::WorkerFailed(e.to_string())),
            },
        };

        log::debug!(
            "Worker slot taken ({} of {} free)",
            self.semaphore.available_permits(),
            self.capacity
        );
        Ok(WorkerSlot { _permit: permit })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    pub fn policy(&self) -> AdmissionPolicy {
        self.policy
    }
}
