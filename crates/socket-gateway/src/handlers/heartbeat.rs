//! PING handler

use super::HandlerResult;
use crate::connection::Connection;
use crate::hub::Hub;
use std::sync::Arc;

/// Handles application-level pings
pub struct PingHandler;

impl PingHandler {
    /// Reply with PONG, echoing the request id
    pub fn handle(
        hub: &Hub,
        connection: &Arc<Connection>,
        request_id: Option<String>,
    ) -> HandlerResult<()> {
        tracing::trace!(connection_id = %connection.id(), "Ping received");
        hub.ping(connection, request_id)?;
        Ok(())
    }
}
