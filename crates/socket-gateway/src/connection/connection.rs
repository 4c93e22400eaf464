//! Individual WebSocket connection
//!
//! A connection is the registry's handle on one socket. The socket itself is owned
//! by the read and write pumps; the hub only ever reaches it through the bounded
//! outbound queue and the close signal.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use socket_core::{ConnectionId, UserId};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch};

use crate::protocol::CloseCode;

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    /// Handshake done, not yet registered
    Connecting,
    /// Registered and exchanging messages
    Active,
    /// Close requested, pumps are winding down
    Draining,
    /// Torn down
    Closed,
}

/// Why an envelope could not be queued
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum EnqueueError {
    #[error("Outbound queue is full")]
    Full,

    #[error("Connection is closing")]
    Closed,
}

/// Receiving side of a connection, owned by its write pump
#[derive(Debug)]
pub struct Outbound {
    /// Serialized envelopes in enqueue order
    pub messages: mpsc::Receiver<Arc<str>>,
    /// Set once when the connection is asked to close
    pub close: watch::Receiver<Option<CloseCode>>,
}

/// A single WebSocket connection
pub struct Connection {
    /// Unique connection ID
    id: ConnectionId,

    /// Authenticated owner
    user_id: UserId,

    /// Display name from the handshake token
    username: Option<String>,

    /// Current lifecycle state
    state: Mutex<ConnectionState>,

    /// Bounded outbound queue
    sender: mpsc::Sender<Arc<str>>,

    /// Queue capacity the connection was created with
    capacity: usize,

    /// Close request signal
    close_tx: watch::Sender<Option<CloseCode>>,

    /// Last inbound frame of any kind
    last_activity: Mutex<Instant>,

    /// Connection creation time
    created_at: Instant,
}

impl Connection {
    /// Create a new connection with an outbound queue of `capacity` envelopes
    pub fn new(
        user_id: UserId,
        username: Option<String>,
        capacity: usize,
    ) -> (Arc<Self>, Outbound) {
        let capacity = capacity.max(1);
        let (sender, messages) = mpsc::channel(capacity);
        let (close_tx, close) = watch::channel(None);
        let now = Instant::now();

        let connection = Arc::new(Self {
            id: ConnectionId::generate(),
            user_id,
            username,
            state: Mutex::new(ConnectionState::Connecting),
            sender,
            capacity,
            close_tx,
            last_activity: Mutex::new(now),
            created_at: now,
        });

        (connection, Outbound { messages, close })
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// Get the current state
    pub fn state(&self) -> ConnectionState {
        *self.state.lock()
    }

    /// Move from `Connecting` to `Active`
    pub fn activate(&self) -> bool {
        let mut state = self.state.lock();
        if *state == ConnectionState::Connecting {
            *state = ConnectionState::Active;
            true
        } else {
            false
        }
    }

    /// Check if the connection still accepts outbound messages
    pub fn is_open(&self) -> bool {
        matches!(
            self.state(),
            ConnectionState::Connecting | ConnectionState::Active
        )
    }

    /// Queue a serialized envelope without waiting
    pub fn try_enqueue(&self, payload: Arc<str>) -> Result<(), EnqueueError> {
        if !self.is_open() {
            return Err(EnqueueError::Closed);
        }
        self.sender.try_send(payload).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => EnqueueError::Full,
            mpsc::error::TrySendError::Closed(_) => EnqueueError::Closed,
        })
    }

    /// Ask the pumps to close the socket with the given code
    ///
    /// Only the first request takes effect; returns whether this call was it.
    pub fn close(&self, code: CloseCode) -> bool {
        {
            let mut state = self.state.lock();
            match *state {
                ConnectionState::Connecting | ConnectionState::Active => {
                    *state = ConnectionState::Draining;
                }
                ConnectionState::Draining | ConnectionState::Closed => return false,
            }
        }

        // Stored even when the pumps are already gone.
        self.close_tx.send_replace(Some(code));
        tracing::debug!(connection_id = %self.id, code = code.as_u16(), "Connection close requested");
        true
    }

    /// Code passed to the first `close` call, if any
    pub fn close_code(&self) -> Option<CloseCode> {
        *self.close_tx.borrow()
    }

    /// Record the end of teardown
    pub fn mark_closed(&self) {
        *self.state.lock() = ConnectionState::Closed;
    }

    /// Record inbound activity
    pub fn touch(&self) {
        *self.last_activity.lock() = Instant::now();
    }

    /// Time since the last inbound frame
    pub fn idle_for(&self) -> Duration {
        self.last_activity.lock().elapsed()
    }

    /// Envelopes waiting in the outbound queue
    pub fn queued(&self) -> usize {
        self.capacity - self.sender.capacity()
    }

    /// Get connection age
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("user_id", &self.user_id)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
