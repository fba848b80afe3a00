//! Connection Registry: every live connection and the identity bound to it.

use std::collections::{HashMap, HashSet};

use crate::domain::{Connection, ConnectionId, Identity, RoomId, Timestamp, UserId};

#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: HashMap<ConnectionId, Connection>,
    by_user: HashMap<UserId, HashSet<ConnectionId>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an authenticated connection.
    ///
    /// Admitting an id that is already present replaces the old record.
    pub fn admit(&mut self, id: ConnectionId, identity: Identity, connected_at: Timestamp) {
        if self.connections.contains_key(&id) {
            self.remove(&id);
        }
        self.by_user
            .entry(identity.user_id.clone())
            .or_default()
            .insert(id);
        self.connections
            .insert(id, Connection::new(id, identity, connected_at));
    }

    /// Remove a connection. Unknown ids are a no-op.
    pub fn remove(&mut self, id: &ConnectionId) -> Option<Connection> {
        let connection = self.connections.remove(id)?;
        if let Some(ids) = self.by_user.get_mut(connection.user_id()) {
            ids.remove(id);
            if ids.is_empty() {
                self.by_user.remove(connection.user_id());
            }
        }
        Some(connection)
    }

    pub fn get(&self, id: &ConnectionId) -> Option<&Connection> {
        self.connections.get(id)
    }

    pub fn contains(&self, id: &ConnectionId) -> bool {
        self.connections.contains_key(id)
    }

    pub fn connections_for(&self, user_id: &UserId) -> HashSet<ConnectionId> {
        self.by_user.get(user_id).cloned().unwrap_or_default()
    }

    /// Every connection except `exclude`.
    pub fn ids_except(&self, exclude: &ConnectionId) -> Vec<ConnectionId> {
        self.connections
            .keys()
            .filter(|id| *id != exclude)
            .copied()
            .collect()
    }

    pub fn all_ids(&self) -> Vec<ConnectionId> {
        self.connections.keys().copied().collect()
    }

    /// Note that `id` joined `room_id`. Returns false for unknown connections.
    pub fn record_join(&mut self, id: &ConnectionId, room_id: &RoomId) -> bool {
        match self.connections.get_mut(id) {
            Some(connection) => {
                connection.rooms.insert(room_id.clone());
                true
            }
            None => false,
        }
    }

    pub fn record_leave(&mut self, id: &ConnectionId, room_id: &RoomId) -> bool {
        self.connections
            .get_mut(id)
            .is_some_and(|connection| connection.rooms.remove(room_id))
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}
