//! Concurrency Governor
//!
//! Caps the number of external dialogue calls simultaneously in flight.
//! Every generation call acquires a permit first; additional callers queue
//! until a slot frees up.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::DialogueError;

/// Semaphore-backed cap on concurrent external calls.
#[derive(Debug, Clone)]
pub struct ChatGovernor {
    permits: Arc<Semaphore>,
    cap: usize,
}

impl ChatGovernor {
    /// Creates a governor admitting at most `max_concurrent` calls at once.
    /// A cap of zero is treated as one.
    pub fn new(max_concurrent: usize) -> Self {
        let cap = max_concurrent.max(1);
        Self {
            permits: Arc::new(Semaphore::new(cap)),
            cap,
        }
    }

    /// Configured cap.
    pub fn cap(&self) -> usize {
        self.cap
    }

    /// Waits for a free slot. The returned permit releases the slot on drop.
    pub async fn admit(&self) -> Result<OwnedSemaphorePermit, DialogueError> {
        self.permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| DialogueError::Request(format!("governor closed: {}", e)))
    }
}
