//! Gateway state
//!
//! Application state for the gateway server.

use crate::hub::Hub;
use socket_common::{GatewayConfig, JwtService};
use std::sync::Arc;
use std::time::Duration;

/// Per-socket settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SocketSettings {
    /// Idle time after which the write side pings the peer
    pub heartbeat_interval: Duration,
    /// Heartbeat intervals without inbound traffic before the peer is dropped
    pub heartbeat_timeout_multiplier: u32,
    /// Outbound queue capacity per connection
    pub send_queue_capacity: usize,
}

impl SocketSettings {
    /// Time without inbound traffic after which the peer is considered dead
    pub fn dead_peer_timeout(&self) -> Duration {
        self.heartbeat_interval * self.heartbeat_timeout_multiplier.max(1)
    }
}

impl Default for SocketSettings {
    fn default() -> Self {
        Self {
            heartbeat_interval: Duration::from_secs(30),
            heartbeat_timeout_multiplier: 2,
            send_queue_capacity: 256,
        }
    }
}

impl From<&GatewayConfig> for SocketSettings {
    fn from(config: &GatewayConfig) -> Self {
        Self {
            heartbeat_interval: Duration::from_millis(config.heartbeat_interval_ms.max(1)),
            heartbeat_timeout_multiplier: config.heartbeat_timeout_multiplier,
            send_queue_capacity: config.send_queue_capacity,
        }
    }
}

/// Gateway application state
///
/// Holds all shared dependencies for the gateway server.
#[derive(Clone)]
pub struct GatewayState {
    /// Connection hub
    hub: Arc<Hub>,
    /// Handshake token verification
    jwt: Arc<JwtService>,
    /// Per-socket settings
    settings: SocketSettings,
}

impl GatewayState {
    /// Create a new gateway state
    pub fn new(hub: Arc<Hub>, jwt: JwtService, settings: SocketSettings) -> Self {
        Self {
            hub,
            jwt: Arc::new(jwt),
            settings,
        }
    }

    /// Get the hub
    pub fn hub(&self) -> &Arc<Hub> {
        &self.hub
    }

    /// Get the JWT service
    pub fn jwt(&self) -> &JwtService {
        &self.jwt
    }

    /// Get the per-socket settings
    pub fn settings(&self) -> SocketSettings {
        self.settings
    }
}

impl std::fmt::Debug for GatewayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayState")
            .field("hub", &self.hub)
            .field("settings", &self.settings)
            .finish()
    }
}
