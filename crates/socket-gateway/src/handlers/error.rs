//! Handler error types

use socket_core::DomainError;
use thiserror::Error;

use crate::hub::HubError;
use crate::protocol::ProtocolError;

/// Handler error type
///
/// Every variant is reported to the client as an ERROR envelope; none of them
/// closes the connection.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Frame is not a valid envelope
    #[error("Invalid message: {0}")]
    InvalidMessage(#[source] ProtocolError),

    /// Payload is missing or has the wrong shape
    #[error("Invalid payload: {0}")]
    InvalidPayload(#[source] ProtocolError),

    /// Room id could not be parsed
    #[error("Invalid room id: {0}")]
    InvalidRoomId(#[from] DomainError),

    /// Hub failed to apply the request
    #[error("Internal error: {0}")]
    Hub(#[from] HubError),
}

impl HandlerError {
    /// Code carried by the ERROR envelope
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidMessage(_) => "INVALID_MESSAGE",
            Self::InvalidPayload(_) => "INVALID_PAYLOAD",
            Self::InvalidRoomId(_) => "INVALID_ROOM_ID",
            Self::Hub(_) => "INTERNAL_ERROR",
        }
    }

    /// Message carried by the ERROR envelope
    pub fn client_message(&self) -> String {
        match self {
            Self::Hub(_) => "Request could not be processed".to_string(),
            other => other.to_string(),
        }
    }
}

/// Handler result type
pub type HandlerResult<T> = Result<T, HandlerError>;
