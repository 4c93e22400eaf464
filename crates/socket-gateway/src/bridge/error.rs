//! Event bridge error types

use socket_core::DomainError;
use socket_relay::RelayError;
use thiserror::Error;

use crate::hub::HubError;
use crate::protocol::ProtocolError;

/// Event bridge error type
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Record body does not match the topic's event schema
    #[error("Failed to decode {topic} record: {source}")]
    Decode {
        topic: String,
        #[source]
        source: serde_json::Error,
    },

    /// Event references an identifier that is not usable for routing
    #[error("Unroutable event: {0}")]
    Domain(#[from] DomainError),

    /// Envelope could not be built
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Delivery could not be published
    #[error("Hub error: {0}")]
    Hub(#[from] HubError),

    /// Event log failure
    #[error("Event log error: {0}")]
    EventLog(#[from] RelayError),

    /// A configured topic has no handler
    #[error("No handler registered for topic {0}")]
    Unregistered(String),
}

impl BridgeError {
    /// Whether the record body itself was unusable
    pub fn is_decode(&self) -> bool {
        matches!(self, Self::Decode { .. })
    }
}

/// Event bridge result type
pub type BridgeResult<T> = Result<T, BridgeError>;
