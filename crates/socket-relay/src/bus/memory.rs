//! In-process bus.
//!
//! Clones share one broadcast channel, so several hubs in the same process behave
//! like separate instances on a common relay. Each clone owns its own shutdown state.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;

use super::{Bus, RelayMessage};
use crate::error::{RelayError, RelayResult};

const DEFAULT_BUFFER: usize = 4096;

/// Bus backed by a tokio broadcast channel
#[derive(Debug)]
pub struct InMemoryBus {
    tx: broadcast::Sender<RelayMessage>,
    closed: Arc<AtomicBool>,
}

impl InMemoryBus {
    #[must_use]
    pub fn new() -> Self {
        Self::with_buffer(DEFAULT_BUFFER)
    }

    #[must_use]
    pub fn with_buffer(buffer: usize) -> Self {
        let (tx, _) = broadcast::channel(buffer);
        Self {
            tx,
            closed: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl Default for InMemoryBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for InMemoryBus {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }
}

#[async_trait]
impl Bus for InMemoryBus {
    fn publish(&self, message: RelayMessage) -> RelayResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(RelayError::Closed);
        }
        // No subscribers is not an error
        let _ = self.tx.send(message);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<RelayMessage> {
        self.tx.subscribe()
    }

    fn is_connected(&self) -> bool {
        !self.closed.load(Ordering::Acquire)
    }

    async fn shutdown(&self) {
        self.closed.store(true, Ordering::Release);
    }
}
