//! Control frame handlers
//!
//! Handles incoming WebSocket messages based on their message type.

mod error;
mod heartbeat;
mod room;

pub use error::{HandlerError, HandlerResult};
pub use heartbeat::PingHandler;
pub use room::RoomHandler;

use crate::connection::Connection;
use crate::hub::Hub;
use crate::protocol::{Envelope, MessageType};
use std::sync::Arc;

/// Dispatch incoming client messages to appropriate handlers
pub struct MessageDispatcher;

impl MessageDispatcher {
    /// Handle one text frame from a client
    ///
    /// Failures are answered with an ERROR envelope; the connection stays open.
    pub fn handle_text(hub: &Hub, connection: &Arc<Connection>, text: &str) {
        let (request_id, result) = match Envelope::parse(text.as_bytes()) {
            Ok(envelope) => (
                envelope.request_id.clone(),
                Self::dispatch(hub, connection, envelope),
            ),
            Err(e) => (None, Err(HandlerError::InvalidMessage(e))),
        };

        if let Err(e) = result {
            tracing::debug!(
                connection_id = %connection.id(),
                user_id = %connection.user_id(),
                code = e.code(),
                error = %e,
                "Control frame rejected"
            );
            if let Err(send_error) =
                hub.send_error(connection, e.code(), &e.client_message(), request_id)
            {
                tracing::warn!(
                    connection_id = %connection.id(),
                    error = %send_error,
                    "Failed to send error envelope"
                );
            }
        }
    }

    /// Handle a parsed envelope
    pub fn dispatch(
        hub: &Hub,
        connection: &Arc<Connection>,
        envelope: Envelope,
    ) -> HandlerResult<()> {
        if !envelope.message_type.is_control() {
            tracing::warn!(
                connection_id = %connection.id(),
                message_type = %envelope.message_type,
                server_only = envelope.message_type.is_server_only(),
                "Ignoring non-control message from client"
            );
            return Ok(());
        }

        match envelope.message_type {
            MessageType::JoinRoom | MessageType::Subscribe => {
                RoomHandler::join(hub, connection, envelope)
            }
            MessageType::LeaveRoom | MessageType::Unsubscribe => {
                RoomHandler::leave(hub, connection, envelope)
            }
            MessageType::Ping => PingHandler::handle(hub, connection, envelope.request_id),
            // These types never reach here due to is_control check
            _ => Ok(()),
        }
    }
}
