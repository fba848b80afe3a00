//! WebSocket frame DTOs.
//!
//! Every frame is a JSON object tagged by `"type"` (kebab-case); fields are
//! camelCase.

use serde::{Deserialize, Serialize};

use crate::domain::MessageKind;

/// Commands sent by a client over an established connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ClientCommand {
    JoinRoom {
        room_id: String,
    },
    LeaveRoom {
        room_id: String,
    },
    SendMessage {
        room_id: String,
        body: String,
        #[serde(default)]
        kind: MessageKind,
    },
    TypingStart {
        room_id: String,
    },
    TypingStop {
        room_id: String,
    },
    MarkRead {
        room_id: String,
    },
}

impl ClientCommand {
    pub fn name(&self) -> &'static str {
        match self {
            Self::JoinRoom { .. } => "join-room",
            Self::LeaveRoom { .. } => "leave-room",
            Self::SendMessage { .. } => "send-message",
            Self::TypingStart { .. } => "typing-start",
            Self::TypingStop { .. } => "typing-stop",
            Self::MarkRead { .. } => "mark-read",
        }
    }
}

/// Events pushed by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    PresenceSnapshot {
        users: Vec<OnlineUserDto>,
    },
    PresenceOnline(PresenceDto),
    PresenceOffline(PresenceDto),
    RoomJoined {
        room_id: String,
        members: Vec<String>,
    },
    RoomMemberJoined(MembershipDto),
    RoomMemberLeft(MembershipDto),
    MessageReceived(MessageDto),
    TypingChanged {
        user_id: String,
        room_id: String,
        is_typing: bool,
    },
    MessagesRead {
        room_id: String,
        user_id: String,
        count: usize,
        timestamp: i64,
    },
    Error {
        kind: String,
        message: String,
        retryable: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnlineUserDto {
    pub user_id: String,
    pub name: String,
    pub avatar: Option<String>,
    /// Unix timestamp (UTC, milliseconds)
    pub connected_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceDto {
    pub user_id: String,
    pub name: String,
    pub avatar: Option<String>,
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MembershipDto {
    pub user_id: String,
    pub room_id: String,
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDto {
    pub id: String,
    pub room_id: String,
    pub sender_id: String,
    pub body: String,
    pub kind: MessageKind,
    pub sent_at: i64,
    pub read_by: Vec<ReadMarkerDto>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadMarkerDto {
    pub user_id: String,
    pub read_at: i64,
}
