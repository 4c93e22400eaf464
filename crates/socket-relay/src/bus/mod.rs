//! Cross-instance bus.
//!
//! Every envelope published for a target reaches every gateway instance (the
//! publisher included); each instance then resolves the target against its own
//! local registry.

mod channels;
mod memory;
mod redis_bus;

pub use channels::ChannelScheme;
pub use memory::InMemoryBus;
pub use redis_bus::{backoff_delay, RedisBus, RedisBusConfig};

use async_trait::async_trait;
use socket_core::DeliveryTarget;
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::error::RelayResult;

/// An encoded envelope addressed to a delivery target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayMessage {
    pub target: DeliveryTarget,
    /// Serialized envelope text, shared between all local recipients
    pub payload: Arc<str>,
}

impl RelayMessage {
    #[must_use]
    pub fn new(target: DeliveryTarget, payload: impl Into<Arc<str>>) -> Self {
        Self {
            target,
            payload: payload.into(),
        }
    }
}

/// Publish/subscribe relay shared by all gateway instances
#[async_trait]
pub trait Bus: Send + Sync {
    /// Enqueue a message for relay; never waits on the network
    fn publish(&self, message: RelayMessage) -> RelayResult<()>;

    /// Receive every message published by any instance
    fn subscribe(&self) -> broadcast::Receiver<RelayMessage>;

    /// Whether messages currently travel across instances
    fn is_connected(&self) -> bool;

    /// Flush pending publications and release the connection
    async fn shutdown(&self);
}

/// Shared bus handle
pub type SharedBus = Arc<dyn Bus>;
