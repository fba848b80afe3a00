//! Entities of the real-time core.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::value_object::{
    ConnectionId, MessageBody, MessageId, MessageKind, RoomId, Timestamp, UserId,
};

/// Authenticated identity bound to a connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: UserId,
    pub name: String,
    pub avatar: Option<String>,
}

impl Identity {
    pub fn new(user_id: UserId, name: impl Into<String>, avatar: Option<String>) -> Self {
        Self {
            user_id,
            name: name.into(),
            avatar,
        }
    }
}

/// One live connection as seen by the Connection Registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    pub id: ConnectionId,
    pub identity: Identity,
    /// Rooms this connection is currently subscribed to
    pub rooms: BTreeSet<RoomId>,
    pub connected_at: Timestamp,
}

impl Connection {
    pub fn new(id: ConnectionId, identity: Identity, connected_at: Timestamp) -> Self {
        Self {
            id,
            identity,
            rooms: BTreeSet::new(),
            connected_at,
        }
    }

    pub fn user_id(&self) -> &UserId {
        &self.identity.user_id
    }
}

/// Entry of the online list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnlineUser {
    pub identity: Identity,
    /// When the first of the user's current connections was opened
    pub connected_at: Timestamp,
}

/// Persisted room as exposed by the room store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Room {
    pub id: RoomId,
    pub participants: BTreeSet<UserId>,
    pub last_message: Option<MessageSummary>,
}

impl Room {
    pub fn new(id: RoomId, participants: impl IntoIterator<Item = UserId>) -> Self {
        Self {
            id,
            participants: participants.into_iter().collect(),
            last_message: None,
        }
    }

    pub fn has_participant(&self, user_id: &UserId) -> bool {
        self.participants.contains(user_id)
    }
}

/// "Last message" summary kept on the room by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageSummary {
    pub message_id: MessageId,
    pub sender_id: UserId,
    pub preview: String,
    pub sent_at: Timestamp,
}

impl MessageSummary {
    /// Longest preview kept on the room, in characters.
    pub const PREVIEW_LENGTH: usize = 80;

    pub fn of(message: &StoredMessage) -> Self {
        Self {
            message_id: message.id,
            sender_id: message.sender_id.clone(),
            preview: message
                .body
                .chars()
                .take(Self::PREVIEW_LENGTH)
                .collect(),
            sent_at: message.sent_at,
        }
    }
}

/// Message handed to the store; it assigns the id and timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub room_id: RoomId,
    pub sender_id: UserId,
    pub body: MessageBody,
    pub kind: MessageKind,
}

/// Marker appended when a participant reads a room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadMarker {
    pub user_id: UserId,
    pub read_at: Timestamp,
}

/// Chat message as persisted by the message store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMessage {
    pub id: MessageId,
    pub room_id: RoomId,
    pub sender_id: UserId,
    pub body: String,
    pub kind: MessageKind,
    pub sent_at: Timestamp,
    pub read_by: Vec<ReadMarker>,
}

impl StoredMessage {
    pub fn is_read_by(&self, user_id: &UserId) -> bool {
        self.read_by.iter().any(|marker| &marker.user_id == user_id)
    }
}
