//! In-memory registries of the real-time core.
//!
//! All four registries are process-local caches of derived state and are
//! rebuilt from zero on restart. They live together in [`Registries`] behind
//! a single mutex so that a disconnect can tear a connection down across all
//! of them in one critical section.

pub mod connection;
pub mod presence;
pub mod room_membership;
pub mod typing;

use std::{collections::BTreeSet, sync::Arc};

use tokio::sync::Mutex;

use super::{ConnectionId, RoomId, UserId};

pub use connection::ConnectionRegistry;
pub use presence::PresenceTracker;
pub use room_membership::RoomMembership;
pub use typing::{ArmedTyping, TypingTracker};

/// Registries shared by every use case.
pub type SharedRegistries = Arc<Mutex<Registries>>;

#[derive(Debug, Default)]
pub struct Registries {
    pub connections: ConnectionRegistry,
    pub presence: PresenceTracker,
    pub rooms: RoomMembership,
    pub typing: TypingTracker,
}

impl Registries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedRegistries {
        Arc::new(Mutex::new(Self::new()))
    }

    /// Distinct users currently subscribed to the room, sorted.
    pub fn room_members(&self, room_id: &RoomId) -> Vec<UserId> {
        self.rooms
            .subscribers(room_id)
            .iter()
            .filter_map(|id| self.connections.get(id))
            .map(|connection| connection.user_id().clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Whether `connection_id` is registered and subscribed to `room_id`.
    pub fn is_joined(&self, connection_id: &ConnectionId, room_id: &RoomId) -> bool {
        self.connections.contains(connection_id) && self.rooms.is_subscribed(room_id, connection_id)
    }
}
