//! Room Membership Manager bookkeeping: which connections are subscribed to
//! which room.
//!
//! Authorization is not checked here; callers validate against the room store
//! before subscribing.

use std::collections::{HashMap, HashSet};

use crate::domain::{ConnectionId, RoomId};

#[derive(Debug, Default)]
pub struct RoomMembership {
    rooms: HashMap<RoomId, HashSet<ConnectionId>>,
}

impl RoomMembership {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the connection was not subscribed before.
    pub fn subscribe(&mut self, room_id: RoomId, connection_id: ConnectionId) -> bool {
        self.rooms.entry(room_id).or_default().insert(connection_id)
    }

    /// Returns `true` if the connection was subscribed. Empty rooms are dropped.
    pub fn unsubscribe(&mut self, room_id: &RoomId, connection_id: &ConnectionId) -> bool {
        let Some(subscribers) = self.rooms.get_mut(room_id) else {
            return false;
        };
        let removed = subscribers.remove(connection_id);
        if subscribers.is_empty() {
            self.rooms.remove(room_id);
        }
        removed
    }

    pub fn is_subscribed(&self, room_id: &RoomId, connection_id: &ConnectionId) -> bool {
        self.rooms
            .get(room_id)
            .is_some_and(|subscribers| subscribers.contains(connection_id))
    }

    pub fn subscribers(&self, room_id: &RoomId) -> Vec<ConnectionId> {
        self.rooms
            .get(room_id)
            .map(|subscribers| subscribers.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn subscribers_except(
        &self,
        room_id: &RoomId,
        exclude: &ConnectionId,
    ) -> Vec<ConnectionId> {
        self.rooms
            .get(room_id)
            .map(|subscribers| {
                subscribers
                    .iter()
                    .filter(|id| *id != exclude)
                    .copied()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of rooms with at least one subscriber.
    pub fn active_room_count(&self) -> usize {
        self.rooms.len()
    }
}
