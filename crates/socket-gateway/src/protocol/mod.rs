//! Client protocol definitions
//!
//! Defines the JSON envelope exchanged over the WebSocket, the message types it
//! carries, control payloads, and close codes.

mod close_codes;
mod envelope;
mod message_type;
mod payloads;

pub use close_codes::CloseCode;
pub use envelope::{now_millis, Envelope, ProtocolError, ProtocolResult};
pub use message_type::MessageType;
pub use payloads::{
    ConnectedPayload, ErrorPayload, PresenceStatus, PresenceUpdatePayload, RoomJoinedPayload,
    RoomLeftPayload, RoomRequestPayload,
};
