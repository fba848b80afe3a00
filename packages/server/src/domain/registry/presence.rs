//! Presence Tracker: per-user online state aggregated over connections.
//!
//! A user is online while at least one of their connections is open. Only
//! the first connect and the last disconnect change the reported state, so a
//! user with two tabs open stays online when one of them closes.

use std::collections::{HashMap, HashSet};

use crate::domain::{ConnectionId, Identity, OnlineUser, Timestamp, UserId};

#[derive(Debug)]
struct PresenceRecord {
    identity: Identity,
    connections: HashSet<ConnectionId>,
    connected_at: Timestamp,
}

#[derive(Debug, Default)]
pub struct PresenceTracker {
    records: HashMap<UserId, PresenceRecord>,
}

impl PresenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` when the user just came online.
    pub fn connect(
        &mut self,
        identity: &Identity,
        connection_id: ConnectionId,
        at: Timestamp,
    ) -> bool {
        let record = self
            .records
            .entry(identity.user_id.clone())
            .or_insert_with(|| PresenceRecord {
                identity: identity.clone(),
                connections: HashSet::new(),
                connected_at: at,
            });
        let came_online = record.connections.is_empty();
        record.connections.insert(connection_id);
        came_online
    }

    /// Returns `true` when the user just went offline.
    ///
    /// Disconnecting a connection the tracker does not know about never
    /// reports a transition.
    pub fn disconnect(&mut self, user_id: &UserId, connection_id: &ConnectionId) -> bool {
        let Some(record) = self.records.get_mut(user_id) else {
            return false;
        };
        if !record.connections.remove(connection_id) {
            return false;
        }
        if record.connections.is_empty() {
            self.records.remove(user_id);
            return true;
        }
        false
    }

    pub fn is_online(&self, user_id: &UserId) -> bool {
        self.records.contains_key(user_id)
    }

    pub fn connection_count(&self, user_id: &UserId) -> usize {
        self.records
            .get(user_id)
            .map_or(0, |record| record.connections.len())
    }

    /// Point-in-time online list, sorted by user id.
    pub fn list_online(&self) -> Vec<OnlineUser> {
        let mut users: Vec<OnlineUser> = self
            .records
            .values()
            .map(|record| OnlineUser {
                identity: record.identity.clone(),
                connected_at: record.connected_at,
            })
            .collect();

        users.sort_by(|a, b| a.identity.user_id.cmp(&b.identity.user_id));

        users
    }
}
