//! Events pushed from the server to connected clients.
//!
//! These are transport-agnostic; the wire representation lives in
//! `infrastructure::dto::websocket`.

use super::entity::{Identity, OnlineUser, StoredMessage};
use super::value_object::{RoomId, Timestamp, UserId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    /// Full online list, sent to a connection right after it is admitted
    PresenceSnapshot { users: Vec<OnlineUser> },
    PresenceOnline {
        identity: Identity,
        timestamp: Timestamp,
    },
    PresenceOffline {
        identity: Identity,
        timestamp: Timestamp,
    },
    /// Acknowledgement sent to the joining connection only
    RoomJoined {
        room_id: RoomId,
        members: Vec<UserId>,
    },
    RoomMemberJoined {
        user_id: UserId,
        room_id: RoomId,
        timestamp: Timestamp,
    },
    RoomMemberLeft {
        user_id: UserId,
        room_id: RoomId,
        timestamp: Timestamp,
    },
    MessageReceived(StoredMessage),
    TypingChanged {
        user_id: UserId,
        room_id: RoomId,
        is_typing: bool,
    },
    MessagesRead {
        room_id: RoomId,
        user_id: UserId,
        count: usize,
        timestamp: Timestamp,
    },
    Error {
        kind: &'static str,
        message: String,
        retryable: bool,
    },
}

impl ServerEvent {
    /// Wire name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            Self::PresenceSnapshot { .. } => "presence-snapshot",
            Self::PresenceOnline { .. } => "presence-online",
            Self::PresenceOffline { .. } => "presence-offline",
            Self::RoomJoined { .. } => "room-joined",
            Self::RoomMemberJoined { .. } => "room-member-joined",
            Self::RoomMemberLeft { .. } => "room-member-left",
            Self::MessageReceived(_) => "message-received",
            Self::TypingChanged { .. } => "typing-changed",
            Self::MessagesRead { .. } => "messages-read",
            Self::Error { .. } => "error",
        }
    }
}
