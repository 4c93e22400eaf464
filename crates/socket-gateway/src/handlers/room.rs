//! JOIN_ROOM / LEAVE_ROOM handler (SUBSCRIBE and UNSUBSCRIBE are aliases)

use super::{HandlerError, HandlerResult};
use crate::connection::Connection;
use crate::hub::Hub;
use crate::protocol::{Envelope, RoomRequestPayload};
use socket_core::RoomId;
use std::sync::Arc;

/// Handles room membership requests
pub struct RoomHandler;

impl RoomHandler {
    /// Join the room named in the payload
    pub fn join(hub: &Hub, connection: &Arc<Connection>, envelope: Envelope) -> HandlerResult<()> {
        let room_id = Self::requested_room(&envelope)?;
        hub.join(connection, &room_id, envelope.request_id)?;
        Ok(())
    }

    /// Leave the room named in the payload
    pub fn leave(hub: &Hub, connection: &Arc<Connection>, envelope: Envelope) -> HandlerResult<()> {
        let room_id = Self::requested_room(&envelope)?;
        hub.leave(connection, &room_id, envelope.request_id)?;
        Ok(())
    }

    fn requested_room(envelope: &Envelope) -> HandlerResult<RoomId> {
        let payload: RoomRequestPayload = envelope
            .payload_as()
            .map_err(HandlerError::InvalidPayload)?;
        Ok(payload.room()?)
    }
}
