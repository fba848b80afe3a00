//! Conversion logic between DTOs and domain entities.

use tamariba_shared::time::timestamp_to_rfc3339;

use crate::domain::{OnlineUser, ReadMarker, ServerEvent, StoredMessage};
use crate::infrastructure::dto::{http, websocket as dto};

// ========================================
// Domain Entity → DTO
// ========================================

impl From<&StoredMessage> for dto::MessageDto {
    fn from(model: &StoredMessage) -> Self {
        Self {
            id: model.id.to_string(),
            room_id: model.room_id.to_string(),
            sender_id: model.sender_id.to_string(),
            body: model.body.clone(),
            kind: model.kind,
            sent_at: model.sent_at.value(),
            read_by: model.read_by.iter().map(Into::into).collect(),
        }
    }
}

impl From<&ReadMarker> for dto::ReadMarkerDto {
    fn from(model: &ReadMarker) -> Self {
        Self {
            user_id: model.user_id.to_string(),
            read_at: model.read_at.value(),
        }
    }
}

impl From<&OnlineUser> for dto::OnlineUserDto {
    fn from(model: &OnlineUser) -> Self {
        Self {
            user_id: model.identity.user_id.to_string(),
            name: model.identity.name.clone(),
            avatar: model.identity.avatar.clone(),
            connected_at: model.connected_at.value(),
        }
    }
}

impl From<&OnlineUser> for http::OnlineUserDetailDto {
    fn from(model: &OnlineUser) -> Self {
        Self {
            user_id: model.identity.user_id.to_string(),
            name: model.identity.name.clone(),
            avatar: model.identity.avatar.clone(),
            connected_at: timestamp_to_rfc3339(model.connected_at.value()),
        }
    }
}

impl From<&ServerEvent> for dto::ServerMessage {
    fn from(event: &ServerEvent) -> Self {
        match event {
            ServerEvent::PresenceSnapshot { users } => Self::PresenceSnapshot {
                users: users.iter().map(Into::into).collect(),
            },
            ServerEvent::PresenceOnline {
                identity,
                timestamp,
            } => Self::PresenceOnline(dto::PresenceDto {
                user_id: identity.user_id.to_string(),
                name: identity.name.clone(),
                avatar: identity.avatar.clone(),
                timestamp: timestamp.value(),
            }),
            ServerEvent::PresenceOffline {
                identity,
                timestamp,
            } => Self::PresenceOffline(dto::PresenceDto {
                user_id: identity.user_id.to_string(),
                name: identity.name.clone(),
                avatar: identity.avatar.clone(),
                timestamp: timestamp.value(),
            }),
            ServerEvent::RoomJoined { room_id, members } => Self::RoomJoined {
                room_id: room_id.to_string(),
                members: members.iter().map(ToString::to_string).collect(),
            },
            ServerEvent::RoomMemberJoined {
                user_id,
                room_id,
                timestamp,
            } => Self::RoomMemberJoined(dto::MembershipDto {
                user_id: user_id.to_string(),
                room_id: room_id.to_string(),
                timestamp: timestamp.value(),
            }),
            ServerEvent::RoomMemberLeft {
                user_id,
                room_id,
                timestamp,
            } => Self::RoomMemberLeft(dto::MembershipDto {
                user_id: user_id.to_string(),
                room_id: room_id.to_string(),
                timestamp: timestamp.value(),
            }),
            ServerEvent::MessageReceived(message) => Self::MessageReceived(message.into()),
            ServerEvent::TypingChanged {
                user_id,
                room_id,
                is_typing,
            } => Self::TypingChanged {
                user_id: user_id.to_string(),
                room_id: room_id.to_string(),
                is_typing: *is_typing,
            },
            ServerEvent::MessagesRead {
                room_id,
                user_id,
                count,
                timestamp,
            } => Self::MessagesRead {
                room_id: room_id.to_string(),
                user_id: user_id.to_string(),
                count: *count,
                timestamp: timestamp.value(),
            },
            ServerEvent::Error {
                kind,
                message,
                retryable,
            } => Self::Error {
                kind: (*kind).to_string(),
                message: message.clone(),
                retryable: *retryable,
            },
        }
    }
}
