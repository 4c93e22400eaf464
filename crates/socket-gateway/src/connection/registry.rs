//! Connection and room registry
//!
//! Indexes the connections held by this instance by id, by user, and by room.
//! The registry is the only owner of membership: connections never reference
//! rooms or users directly.
//!
//! Lock order is always connection entry first, then room entry. A connection's
//! entry is held while its room memberships change, which makes a join racing the
//! removal of the same connection either land before the removal (and get cleaned
//! up by it) or observe that the connection is gone. No guard is ever held across
//! an await or any I/O.

use dashmap::DashMap;
use socket_core::{ConnectionId, RoomId, UserId};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use super::Connection;

/// Registry entry for one connection
struct Entry {
    connection: Arc<Connection>,
    rooms: HashSet<RoomId>,
}

/// Local members of one room
#[derive(Default)]
struct RoomMembers {
    connections: HashSet<ConnectionId>,
    /// Connections per user, for room-scoped presence
    users: HashMap<UserId, usize>,
}

impl RoomMembers {
    /// Returns (newly added, first connection of this user in the room)
    fn insert(&mut self, id: ConnectionId, user_id: &UserId) -> (bool, bool) {
        if !self.connections.insert(id) {
            return (false, false);
        }
        let count = self.users.entry(user_id.clone()).or_insert(0);
        *count += 1;
        (true, *count == 1)
    }

    /// Returns whether this was the user's last connection in the room, or
    /// `None` if the connection was not a member
    fn remove(&mut self, id: ConnectionId, user_id: &UserId) -> Option<bool> {
        if !self.connections.remove(&id) {
            return None;
        }
        let last = match self.users.get_mut(user_id) {
            Some(count) if *count > 1 => {
                *count -= 1;
                false
            }
            _ => {
                self.users.remove(user_id);
                true
            }
        };
        Some(last)
    }

    fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

/// Result of a join
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinOutcome {
    /// The connection was not a member before
    pub newly_joined: bool,
    /// No other connection of the same user is in the room
    pub first_for_user: bool,
    /// Local members after the join
    pub member_count: usize,
}

/// Result of a leave
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaveOutcome {
    /// The connection was a member before
    pub was_member: bool,
    /// No other connection of the same user remains in the room
    pub last_for_user: bool,
}

/// What `remove_connection` took out of the registry
#[derive(Debug)]
pub struct RemovedConnection {
    pub connection: Arc<Connection>,
    /// Every room the connection was in
    pub rooms: Vec<RoomId>,
    /// Rooms in which the user no longer has any connection
    pub vacated_rooms: Vec<RoomId>,
    /// The user has no connection left on this instance
    pub user_offline: bool,
}

/// Concurrency-safe index of the connections held by this instance
///
/// Uses `DashMap` so that unrelated connections and rooms never contend on a
/// single lock.
#[derive(Default)]
pub struct Registry {
    /// Connection entries by id
    connections: DashMap<ConnectionId, Entry>,

    /// User ID to connection IDs mapping
    users: DashMap<UserId, HashSet<ConnectionId>>,

    /// Room ID to members mapping
    rooms: DashMap<RoomId, RoomMembers>,
}

impl Registry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty registry wrapped in Arc
    #[must_use]
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Register a connection
    ///
    /// Returns whether it is the user's first connection on this instance.
    pub fn add_connection(&self, connection: Arc<Connection>) -> bool {
        let id = connection.id();
        let user_id = connection.user_id().clone();

        self.connections.insert(
            id,
            Entry {
                connection,
                rooms: HashSet::new(),
            },
        );

        let first = {
            let mut ids = self.users.entry(user_id.clone()).or_default();
            ids.insert(id);
            ids.len() == 1
        };

        tracing::debug!(connection_id = %id, user_id = %user_id, "Connection added");
        first
    }

    /// Remove a connection from every room and from its user's set
    ///
    /// Returns `None` if the connection was not registered, which makes repeated
    /// teardown harmless.
    pub fn remove_connection(&self, id: ConnectionId) -> Option<RemovedConnection> {
        let (_, entry) = self.connections.remove(&id)?;
        let user_id = entry.connection.user_id().clone();

        let mut vacated_rooms = Vec::new();
        for room in &entry.rooms {
            let last = self
                .rooms
                .get_mut(room)
                .and_then(|mut members| members.remove(id, &user_id));
            if last == Some(true) {
                vacated_rooms.push(room.clone());
            }
            self.rooms.remove_if(room, |_, members| members.is_empty());
        }

        if let Some(mut ids) = self.users.get_mut(&user_id) {
            ids.remove(&id);
        }
        let user_offline = self
            .users
            .remove_if(&user_id, |_, ids| ids.is_empty())
            .is_some()
            || !self.users.contains_key(&user_id);

        tracing::debug!(
            connection_id = %id,
            user_id = %user_id,
            rooms = entry.rooms.len(),
            "Connection removed"
        );

        Some(RemovedConnection {
            connection: entry.connection,
            rooms: entry.rooms.into_iter().collect(),
            vacated_rooms,
            user_offline,
        })
    }

    /// Get a connection by id
    pub fn get(&self, id: ConnectionId) -> Option<Arc<Connection>> {
        self.connections.get(&id).map(|e| e.connection.clone())
    }

    /// Add a connection to a room
    ///
    /// Idempotent. Returns `None` if the connection is not registered.
    pub fn join_room(&self, id: ConnectionId, room: &RoomId) -> Option<JoinOutcome> {
        let mut entry = self.connections.get_mut(&id)?;
        let user_id = entry.connection.user_id().clone();
        entry.rooms.insert(room.clone());

        let mut members = self.rooms.entry(room.clone()).or_default();
        let (newly_joined, first_for_user) = members.insert(id, &user_id);

        Some(JoinOutcome {
            newly_joined,
            first_for_user,
            member_count: members.connections.len(),
        })
    }

    /// Remove a connection from a room
    ///
    /// Leaving a room the connection is not in, or leaving as an unknown
    /// connection, is a no-op.
    pub fn leave_room(&self, id: ConnectionId, room: &RoomId) -> LeaveOutcome {
        let not_member = LeaveOutcome {
            was_member: false,
            last_for_user: false,
        };

        let Some(mut entry) = self.connections.get_mut(&id) else {
            return not_member;
        };
        if !entry.rooms.remove(room) {
            return not_member;
        }
        let user_id = entry.connection.user_id().clone();

        let last = self
            .rooms
            .get_mut(room)
            .and_then(|mut members| members.remove(id, &user_id));
        self.rooms.remove_if(room, |_, members| members.is_empty());
        drop(entry);

        LeaveOutcome {
            was_member: last.is_some(),
            last_for_user: last.unwrap_or(false),
        }
    }

    /// All local connections of a user
    pub fn connections_for_user(&self, user_id: &UserId) -> Vec<Arc<Connection>> {
        let ids: Vec<ConnectionId> = self
            .users
            .get(user_id)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default();
        self.resolve(&ids)
    }

    /// All local members of a room
    pub fn members_of_room(&self, room: &RoomId) -> Vec<Arc<Connection>> {
        let ids: Vec<ConnectionId> = self
            .rooms
            .get(room)
            .map(|members| members.connections.iter().copied().collect())
            .unwrap_or_default();
        self.resolve(&ids)
    }

    /// Every local connection
    pub fn all_connections(&self) -> Vec<Arc<Connection>> {
        self.connections
            .iter()
            .map(|e| e.connection.clone())
            .collect()
    }

    /// Rooms a connection has joined
    pub fn rooms_of(&self, id: ConnectionId) -> Vec<RoomId> {
        self.connections
            .get(&id)
            .map(|e| e.rooms.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Check if a connection is a member of a room
    pub fn is_member(&self, id: ConnectionId, room: &RoomId) -> bool {
        self.connections
            .get(&id)
            .is_some_and(|e| e.rooms.contains(room))
    }

    /// Local members of a room
    pub fn room_member_count(&self, room: &RoomId) -> usize {
        self.rooms.get(room).map_or(0, |m| m.connections.len())
    }

    /// Get total connection count
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Get unique user count
    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    /// Get count of rooms with at least one local member
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    // Look up ids collected from an index after its guard was released.
    fn resolve(&self, ids: &[ConnectionId]) -> Vec<Arc<Connection>> {
        ids.iter().filter_map(|id| self.get(*id)).collect()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("connections", &self.connection_count())
            .field("users", &self.user_count())
            .field("rooms", &self.room_count())
            .finish()
    }
}
