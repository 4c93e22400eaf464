//! Hub
//!
//! Owns the local registry and the bus handle. Every server-originated message
//! addressed to a user, a room, or everyone goes out through `publish`; each
//! instance (this one included) delivers it locally when it comes back from the
//! bus subscription. Direct replies to a single connection skip the bus.

use parking_lot::Mutex;
use serde::Serialize;
use socket_core::{ConnectionId, DeliveryTarget, RoomId, UserId};
use socket_relay::{RelayMessage, SharedBus};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use super::{HubError, HubResult};
use crate::connection::{
    Connection, EnqueueError, JoinOutcome, LeaveOutcome, Registry, RemovedConnection,
};
use crate::protocol::{
    CloseCode, ConnectedPayload, Envelope, MessageType, PresenceStatus, PresenceUpdatePayload,
    RoomJoinedPayload, RoomLeftPayload,
};
use crate::telemetry;

/// Snapshot of the hub's local state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HubStats {
    pub instance_id: String,
    pub connections: usize,
    pub users: usize,
    pub rooms: usize,
    pub bus_connected: bool,
}

/// Connection hub for one gateway instance
pub struct Hub {
    /// Local connections and room membership
    registry: Arc<Registry>,

    /// Cross-instance relay
    bus: SharedBus,

    /// Identifier reported to clients in CONNECTED
    instance_id: String,

    /// Whether the bus subscription loop is running
    running: AtomicBool,

    /// Stops the bus subscription loop
    shutdown: watch::Sender<bool>,

    /// Bus subscription loop
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Hub {
    /// Create a hub over a registry and a bus
    pub fn new(registry: Arc<Registry>, bus: SharedBus, instance_id: impl Into<String>) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            registry,
            bus,
            instance_id: instance_id.into(),
            running: AtomicBool::new(false),
            shutdown,
            task: Mutex::new(None),
        }
    }

    /// Create a hub wrapped in Arc
    pub fn new_shared(
        registry: Arc<Registry>,
        bus: SharedBus,
        instance_id: impl Into<String>,
    ) -> Arc<Self> {
        Arc::new(Self::new(registry, bus, instance_id))
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn stats(&self) -> HubStats {
        HubStats {
            instance_id: self.instance_id.clone(),
            connections: self.registry.connection_count(),
            users: self.registry.user_count(),
            rooms: self.registry.room_count(),
            bus_connected: self.bus.is_connected(),
        }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Start delivering messages received from the bus
    ///
    /// The subscription is taken before this returns, so anything published
    /// afterwards is delivered.
    pub fn start(self: &Arc<Self>) {
        if self.running.swap(true, Ordering::SeqCst) {
            tracing::warn!("Hub is already running");
            return;
        }

        let receiver = self.bus.subscribe();
        let shutdown = self.shutdown.subscribe();
        let hub = self.clone();
        let handle = tokio::spawn(async move {
            hub.run(receiver, shutdown).await;
        });
        *self.task.lock() = Some(handle);

        tracing::info!(instance_id = %self.instance_id, "Hub started");
    }

    /// Close every local connection and shut the bus down
    pub async fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.shutdown.send_replace(true);

        let connections = self.registry.all_connections();
        let closing = connections.len();
        for connection in connections {
            connection.close(CloseCode::ServerShutdown);
        }

        let task = self.task.lock().take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "Hub subscription task failed");
            }
        }

        self.bus.shutdown().await;
        tracing::info!(closed = closing, "Hub stopped");
    }

    async fn run(
        &self,
        mut receiver: broadcast::Receiver<RelayMessage>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                received = receiver.recv() => match received {
                    Ok(message) => {
                        self.deliver(&message);
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => self.lagged(n),
                    Err(broadcast::error::RecvError::Closed) => {
                        tracing::warn!("Bus subscription closed");
                        break;
                    }
                },
            }
        }

        tracing::debug!("Hub subscription loop ended");
    }

    /// Account for bus messages skipped because the subscription overflowed
    ///
    /// They are gone for every local recipient; nothing is redelivered.
    fn lagged(&self, missed: u64) {
        metrics::counter!(telemetry::BUS_LAGGED).increment(missed);
        tracing::warn!(
            instance_id = %self.instance_id,
            lagged = missed,
            "Hub fell behind the bus, messages dropped"
        );
    }

    /// Refresh the size gauges after the registry changed
    #[allow(clippy::cast_precision_loss)]
    fn record_sizes(&self) {
        metrics::gauge!(telemetry::ACTIVE_CONNECTIONS).set(self.registry.connection_count() as f64);
        metrics::gauge!(telemetry::ROOMS).set(self.registry.room_count() as f64);
    }

    // =========================================================================
    // Fan-out
    // =========================================================================

    /// Publish an envelope to a target on every instance
    pub fn publish(&self, target: DeliveryTarget, envelope: &Envelope) -> HubResult<()> {
        let text = envelope.to_text()?;
        tracing::trace!(
            target = %target,
            message_type = %envelope.message_type,
            "Publishing envelope"
        );
        self.bus.publish(RelayMessage::new(target, text))?;
        metrics::counter!(telemetry::PUBLISHED).increment(1);
        Ok(())
    }

    /// Deliver a message received from the bus to the matching local connections
    pub fn deliver(&self, message: &RelayMessage) -> usize {
        let recipients = match &message.target {
            DeliveryTarget::User(user_id) => self.registry.connections_for_user(user_id),
            DeliveryTarget::Room(room_id) => self.registry.members_of_room(room_id),
            DeliveryTarget::All => self.registry.all_connections(),
        };

        let sent = self.fan_out(&recipients, &message.payload);
        tracing::trace!(target = %message.target, sent, "Delivered relayed message");
        sent
    }

    /// Queue an envelope on every local connection of a user
    pub fn send_to_user(&self, user_id: &UserId, envelope: &Envelope) -> HubResult<usize> {
        let payload: Arc<str> = envelope.to_text()?.into();
        Ok(self.fan_out(&self.registry.connections_for_user(user_id), &payload))
    }

    /// Queue an envelope on every local member of a room
    pub fn send_to_room(&self, room_id: &RoomId, envelope: &Envelope) -> HubResult<usize> {
        let payload: Arc<str> = envelope.to_text()?.into();
        Ok(self.fan_out(&self.registry.members_of_room(room_id), &payload))
    }

    /// Queue an envelope on every local connection
    pub fn broadcast(&self, envelope: &Envelope) -> HubResult<usize> {
        let payload: Arc<str> = envelope.to_text()?.into();
        Ok(self.fan_out(&self.registry.all_connections(), &payload))
    }

    fn fan_out(&self, recipients: &[Arc<Connection>], payload: &Arc<str>) -> usize {
        let sent = recipients
            .iter()
            .filter(|connection| self.enqueue(connection, payload.clone()))
            .count();
        metrics::counter!(telemetry::DELIVERED).increment(sent as u64);
        sent
    }

    /// Queue a payload on one connection, evicting it if its queue is full
    fn enqueue(&self, connection: &Arc<Connection>, payload: Arc<str>) -> bool {
        match connection.try_enqueue(payload) {
            Ok(()) => true,
            Err(EnqueueError::Full) => {
                self.evict(connection);
                false
            }
            Err(EnqueueError::Closed) => false,
        }
    }

    fn evict(&self, connection: &Arc<Connection>) {
        if connection.close(CloseCode::SlowConsumer) {
            tracing::warn!(
                connection_id = %connection.id(),
                user_id = %connection.user_id(),
                queued = connection.queued(),
                "Evicting slow consumer"
            );
            metrics::counter!(telemetry::EVICTED).increment(1);
        }
        self.unregister(connection.id());
    }

    /// Reply on one connection without going through the bus
    fn reply(&self, connection: &Arc<Connection>, envelope: &Envelope) -> HubResult<bool> {
        let text = envelope.to_text()?;
        Ok(self.enqueue(connection, text.into()))
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Register a connection and greet it with CONNECTED
    ///
    /// On error nothing was added to the registry.
    pub fn register(&self, connection: &Arc<Connection>) -> HubResult<()> {
        let connected = Envelope::build(
            MessageType::Connected,
            &ConnectedPayload {
                user_id: connection.user_id().clone(),
                instance_id: self.instance_id.clone(),
            },
        )?;
        if !connection.activate() {
            return Err(HubError::NotConnecting(connection.id()));
        }
        let first = self.registry.add_connection(connection.clone());
        self.record_sizes();

        tracing::info!(
            connection_id = %connection.id(),
            user_id = %connection.user_id(),
            first_for_user = first,
            "Connection registered"
        );

        self.reply(connection, &connected)?;
        Ok(())
    }

    /// Remove a connection and withdraw its room presence
    ///
    /// Returns `None` if it was already removed.
    pub fn unregister(&self, id: ConnectionId) -> Option<RemovedConnection> {
        let removed = self.registry.remove_connection(id)?;
        self.record_sizes();
        let connection = &removed.connection;

        for room_id in &removed.vacated_rooms {
            self.announce_presence(connection, room_id, PresenceStatus::Offline);
        }

        tracing::info!(
            connection_id = %id,
            user_id = %connection.user_id(),
            rooms = removed.rooms.len(),
            user_offline = removed.user_offline,
            "Connection unregistered"
        );

        Some(removed)
    }

    // =========================================================================
    // Control operations
    // =========================================================================

    /// Join a room
    ///
    /// A new membership is acknowledged with ROOM_JOINED; joining a room the
    /// connection is already in sends nothing.
    pub fn join(
        &self,
        connection: &Arc<Connection>,
        room_id: &RoomId,
        request_id: Option<String>,
    ) -> HubResult<JoinOutcome> {
        let outcome = self
            .registry
            .join_room(connection.id(), room_id)
            .ok_or_else(|| HubError::UnknownConnection(connection.id()))?;

        if !outcome.newly_joined {
            tracing::debug!(
                connection_id = %connection.id(),
                room_id = %room_id,
                "Already a member of room"
            );
            return Ok(outcome);
        }
        self.record_sizes();

        tracing::debug!(
            connection_id = %connection.id(),
            user_id = %connection.user_id(),
            room_id = %room_id,
            member_count = outcome.member_count,
            "Joined room"
        );

        let joined = Envelope::build_with_request_id(
            MessageType::RoomJoined,
            &RoomJoinedPayload {
                room_id: room_id.clone(),
                member_count: outcome.member_count,
            },
            request_id,
        )?;
        self.reply(connection, &joined)?;

        if outcome.first_for_user {
            self.announce_presence(connection, room_id, PresenceStatus::Online);
        }

        Ok(outcome)
    }

    /// Leave a room
    ///
    /// Always acknowledged with ROOM_LEFT, member or not.
    pub fn leave(
        &self,
        connection: &Arc<Connection>,
        room_id: &RoomId,
        request_id: Option<String>,
    ) -> HubResult<LeaveOutcome> {
        let outcome = self.registry.leave_room(connection.id(), room_id);
        if outcome.was_member {
            self.record_sizes();
        }

        tracing::debug!(
            connection_id = %connection.id(),
            room_id = %room_id,
            was_member = outcome.was_member,
            "Left room"
        );

        let left = Envelope::build_with_request_id(
            MessageType::RoomLeft,
            &RoomLeftPayload {
                room_id: room_id.clone(),
            },
            request_id,
        )?;
        self.reply(connection, &left)?;

        if outcome.was_member && outcome.last_for_user {
            self.announce_presence(connection, room_id, PresenceStatus::Offline);
        }

        Ok(outcome)
    }

    /// Answer an application-level ping
    pub fn ping(&self, connection: &Arc<Connection>, request_id: Option<String>) -> HubResult<()> {
        self.reply(connection, &Envelope::pong(request_id))?;
        Ok(())
    }

    /// Send an error envelope to one connection
    pub fn send_error(
        &self,
        connection: &Arc<Connection>,
        code: &str,
        message: &str,
        request_id: Option<String>,
    ) -> HubResult<()> {
        self.reply(connection, &Envelope::error(code, message, request_id)?)?;
        Ok(())
    }

    // Presence failures are logged, never surfaced to the caller.
    fn announce_presence(&self, connection: &Connection, room_id: &RoomId, status: PresenceStatus) {
        let payload = PresenceUpdatePayload::in_room(
            connection.user_id().clone(),
            connection.username().map(str::to_string),
            status,
            room_id.clone(),
        );

        let result = Envelope::build(MessageType::PresenceUpdate, &payload)
            .map_err(HubError::from)
            .and_then(|envelope| self.publish(DeliveryTarget::Room(room_id.clone()), &envelope));

        if let Err(e) = result {
            tracing::warn!(
                user_id = %connection.user_id(),
                room_id = %room_id,
                status = ?status,
                error = %e,
                "Failed to publish presence update"
            );
        }
    }
}

impl std::fmt::Debug for Hub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hub")
            .field("instance_id", &self.instance_id)
            .field("registry", &self.registry)
            .field("running", &self.is_running())
            .finish()
    }
}
