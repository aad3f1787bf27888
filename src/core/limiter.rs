use crate::core::{FetchError, FetchResult};
use log::debug;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

pub const DEFAULT_MAX_CONCURRENT: usize = 10;

/// Caps the number of attempts in flight across a fetch session.
///
/// Waiters are admitted in FIFO order. A slot is returned when its
/// [`SlotPermit`] is released or dropped.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    semaphore: Arc<Semaphore>,
    max_concurrent: usize,
}

#[derive(Debug)]
pub struct SlotPermit {
    _permit: OwnedSemaphorePermit,
}

impl RateLimiter {
    pub fn new(max_concurrent: usize) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
        }
    }

    pub async fn acquire(&self) -> FetchResult<SlotPermit> {
        if self.semaphore.available_permits() == 0 {
            debug!(
                "Reached concurrent request limit {}, waiting for slot",
                self.max_concurrent
            );
        }

        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| FetchError::SessionClosed)?;

        Ok(SlotPermit { _permit: permit })
    }

    pub fn release(&self, permit: SlotPermit) {
        drop(permit);
    }

    /// Wakes every waiter with [`FetchError::SessionClosed`]. Slots already
    /// handed out stay valid until released.
    pub fn close(&self) {
        self.semaphore.close();
    }

    pub fn is_closed(&self) -> bool {
        self.semaphore.is_closed()
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    pub fn in_flight(&self) -> usize {
        self.max_concurrent.saturating_sub(self.available())
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CONCURRENT)
    }
}
