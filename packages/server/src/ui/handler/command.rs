//! Dispatch of inbound client commands to the use cases.

use crate::{
    domain::{ConnectionId, RoomId},
    infrastructure::dto::websocket::ClientCommand,
    ui::state::AppState,
    usecase::RealtimeError,
};

/// Parse one text frame and run the matching use case.
///
/// Failures are reported to the sending connection only. A connection that
/// vanished mid-command gets nothing.
pub async fn dispatch(state: &AppState, connection_id: ConnectionId, frame: &str) {
    let result = match serde_json::from_str::<ClientCommand>(frame) {
        Ok(command) => execute(state, connection_id, command).await,
        Err(e) => Err(RealtimeError::InvalidPayload(e.to_string())),
    };

    let Err(error) = result else {
        return;
    };
    if matches!(error, RealtimeError::ConnectionClosed(_)) {
        tracing::debug!("Dropped command of closed connection '{}'", connection_id);
        return;
    }

    tracing::warn!("Command from '{}' failed: {}", connection_id, error);
    if let Err(e) = state
        .message_pusher
        .push_to(&connection_id, &error.to_event())
        .await
    {
        tracing::warn!("Failed to send error to '{}': {}", connection_id, e);
    }
}

async fn execute(
    state: &AppState,
    connection_id: ConnectionId,
    command: ClientCommand,
) -> Result<(), RealtimeError> {
    tracing::debug!("Dispatching '{}' from '{}'", command.name(), connection_id);

    match command {
        ClientCommand::JoinRoom { room_id } => {
            state
                .join_room_usecase
                .execute(connection_id, RoomId::try_from(room_id)?)
                .await?;
        }
        ClientCommand::LeaveRoom { room_id } => {
            state
                .leave_room_usecase
                .execute(connection_id, RoomId::try_from(room_id)?)
                .await;
        }
        ClientCommand::SendMessage {
            room_id,
            body,
            kind,
        } => {
            state
                .send_message_usecase
                .execute(connection_id, RoomId::try_from(room_id)?, body, kind)
                .await?;
        }
        ClientCommand::TypingStart { room_id } => {
            state
                .typing_usecase
                .start(connection_id, RoomId::try_from(room_id)?)
                .await?;
        }
        ClientCommand::TypingStop { room_id } => {
            state
                .typing_usecase
                .stop(connection_id, RoomId::try_from(room_id)?)
                .await?;
        }
        ClientCommand::MarkRead { room_id } => {
            state
                .mark_read_usecase
                .execute(connection_id, RoomId::try_from(room_id)?)
                .await?;
        }
    }

    Ok(())
}
