//! Hub error types

use socket_core::ConnectionId;
use socket_relay::RelayError;
use thiserror::Error;

use crate::protocol::ProtocolError;

/// Hub error type
#[derive(Debug, Error)]
pub enum HubError {
    /// Envelope could not be encoded
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Bus rejected a publication
    #[error("Relay error: {0}")]
    Relay(#[from] RelayError),

    /// The connection is not (or no longer) registered
    #[error("Connection {0} is not registered")]
    UnknownConnection(ConnectionId),

    /// Registration was attempted after the connection started closing
    #[error("Connection {0} is already closing")]
    NotConnecting(ConnectionId),
}

/// Hub result type
pub type HubResult<T> = Result<T, HubError>;
