//! UseCase 層
//!
//! クライアントからの各イベント（接続・切断・ルーム参加・退出・送信・入力中・既読）
//! を一つのユースケース構造体として表現します。各ユースケースは Registries と
//! 外部コラボレーター（trait）を DI で受け取り、単体でテストできます。

pub mod connect_participant;
pub mod disconnect_participant;
pub mod error;
pub mod get_online_users;
pub mod get_room_history;
pub mod join_room;
pub mod leave_room;
pub mod mark_read;
pub mod send_message;
pub mod typing;

#[cfg(test)]
pub(crate) mod test_support;

use std::time::Duration;

use crate::domain::{
    ConnectionId, Identity, MessagePusher, Registries, RoomId, ServerEvent, SharedRegistries,
    Timestamp, UserId,
};

pub use connect_participant::{ConnectParticipantUseCase, ConnectedParticipant};
pub use disconnect_participant::{DisconnectOutcome, DisconnectParticipantUseCase};
pub use error::RealtimeError;
pub use get_online_users::GetOnlineUsersUseCase;
pub use get_room_history::GetRoomHistoryUseCase;
pub use join_room::{JoinRoomUseCase, Joined};
pub use leave_room::LeaveRoomUseCase;
pub use mark_read::MarkReadUseCase;
pub use send_message::SendMessageUseCase;
pub use typing::TypingUseCase;

/// Policy values of the real-time core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RealtimeSettings {
    /// Quiescence window after which a typing indicator expires on its own
    pub typing_timeout: Duration,
    /// Maximum message body length in characters
    pub max_message_length: usize,
    /// History page size when the client does not ask for one
    pub default_history_limit: usize,
    pub max_history_limit: usize,
}

impl Default for RealtimeSettings {
    fn default() -> Self {
        Self {
            typing_timeout: Duration::from_millis(3000),
            max_message_length: 1000,
            default_history_limit: 50,
            max_history_limit: 200,
        }
    }
}

/// Identity bound to a registered connection.
fn registered_identity(
    registries: &Registries,
    connection_id: &ConnectionId,
) -> Result<Identity, RealtimeError> {
    registries
        .connections
        .get(connection_id)
        .map(|connection| connection.identity.clone())
        .ok_or_else(|| RealtimeError::ConnectionClosed(connection_id.to_string()))
}

/// Identity bound to a connection that is currently subscribed to `room_id`.
fn joined_identity(
    registries: &Registries,
    connection_id: &ConnectionId,
    room_id: &RoomId,
) -> Result<Identity, RealtimeError> {
    let identity = registered_identity(registries, connection_id)?;
    if !registries.rooms.is_subscribed(room_id, connection_id) {
        return Err(RealtimeError::AccessDenied(format!(
            "connection has not joined room '{room_id}'"
        )));
    }
    Ok(identity)
}

/// Drop the subscription of `connection_id` to `room_id` and notify the
/// remaining subscribers. Returns `false` if it was not subscribed.
async fn unsubscribe_and_notify(
    registries: &mut Registries,
    message_pusher: &dyn MessagePusher,
    connection_id: &ConnectionId,
    room_id: &RoomId,
    user_id: &UserId,
    timestamp: Timestamp,
) -> bool {
    if !registries.rooms.unsubscribe(room_id, connection_id) {
        return false;
    }
    registries.connections.record_leave(connection_id, room_id);

    let remaining = registries.rooms.subscribers(room_id);
    if let Some(typing_user) = registries
        .typing
        .clear_connection_in_room(room_id, connection_id)
    {
        let event = ServerEvent::TypingChanged {
            user_id: typing_user,
            room_id: room_id.clone(),
            is_typing: false,
        };
        if let Err(e) = message_pusher.broadcast(remaining.clone(), &event).await {
            tracing::warn!("Failed to broadcast typing-changed: {}", e);
        }
    }

    let event = ServerEvent::RoomMemberLeft {
        user_id: user_id.clone(),
        room_id: room_id.clone(),
        timestamp,
    };
    if let Err(e) = message_pusher.broadcast(remaining, &event).await {
        tracing::warn!("Failed to broadcast room-member-left: {}", e);
    }
    true
}

/// Tear down a live subscription whose authorization the store no longer grants.
async fn revoke_subscription(
    registries: &SharedRegistries,
    message_pusher: &dyn MessagePusher,
    connection_id: &ConnectionId,
    room_id: &RoomId,
    timestamp: Timestamp,
) {
    let mut registries = registries.lock().await;
    let Some(user_id) = registries
        .connections
        .get(connection_id)
        .map(|connection| connection.user_id().clone())
    else {
        return;
    };
    if unsubscribe_and_notify(
        &mut registries,
        message_pusher,
        connection_id,
        room_id,
        &user_id,
        timestamp,
    )
    .await
    {
        tracing::info!(
            "Revoked subscription of '{}' (user '{}') to room '{}'",
            connection_id,
            user_id,
            room_id
        );
    }
}
