//! HTTP API endpoint handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use crate::{
    domain::RoomId,
    infrastructure::dto::{
        http::{ErrorResponseDto, HistoryQuery, MessageHistoryDto, PresenceListDto},
        websocket::MessageDto,
    },
    ui::state::AppState,
    usecase::RealtimeError,
};

type ErrorResponse = (StatusCode, Json<ErrorResponseDto>);

fn error_response(error: RealtimeError) -> ErrorResponse {
    let status = match error {
        RealtimeError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
        RealtimeError::AccessDenied(_) => StatusCode::FORBIDDEN,
        RealtimeError::RoomNotFound(_) => StatusCode::NOT_FOUND,
        RealtimeError::InvalidPayload(_) => StatusCode::BAD_REQUEST,
        RealtimeError::PersistenceFailure(_) => StatusCode::SERVICE_UNAVAILABLE,
        RealtimeError::ConnectionClosed(_) => StatusCode::GONE,
    };
    (
        status,
        Json(ErrorResponseDto {
            kind: error.kind().to_string(),
            message: error.to_string(),
        }),
    )
}

/// Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Users with at least one open connection
pub async fn get_presence(State(state): State<Arc<AppState>>) -> Json<PresenceListDto> {
    let users = state.get_online_users_usecase.execute().await;

    // Domain Model から DTO への変換
    Json(PresenceListDto {
        users: users.iter().map(Into::into).collect(),
    })
}

/// Message history of a room, for one of its participants
pub async fn get_room_history(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<MessageHistoryDto>, ErrorResponse> {
    let room_id = RoomId::try_from(room_id).map_err(|e| error_response(e.into()))?;

    let messages = state
        .get_room_history_usecase
        .execute(&query.token, &room_id, query.limit)
        .await
        .map_err(|e| {
            tracing::debug!("History request for '{}' rejected: {}", room_id, e);
            error_response(e)
        })?;

    Ok(Json(MessageHistoryDto {
        room_id: room_id.into_string(),
        messages: messages.iter().map(MessageDto::from).collect(),
    }))
}
