//! Shared application state.

use std::sync::Arc;

use tamariba_shared::time::Clock;

use crate::{
    domain::{
        Authenticator, MessagePusher, MessageStore, Registries, RoomAuthorizationStore,
        SharedRegistries,
    },
    usecase::{
        ConnectParticipantUseCase, DisconnectParticipantUseCase, GetOnlineUsersUseCase,
        GetRoomHistoryUseCase, JoinRoomUseCase, LeaveRoomUseCase, MarkReadUseCase,
        RealtimeSettings, SendMessageUseCase, TypingUseCase,
    },
};

/// Shared application state
///
/// Every use case shares the same registries and message pusher.
pub struct AppState {
    /// MessagePusher（エラーイベントの返信に使用）
    pub message_pusher: Arc<dyn MessagePusher>,
    pub connect_participant_usecase: ConnectParticipantUseCase,
    pub disconnect_participant_usecase: DisconnectParticipantUseCase,
    pub join_room_usecase: JoinRoomUseCase,
    pub leave_room_usecase: LeaveRoomUseCase,
    pub send_message_usecase: SendMessageUseCase,
    pub typing_usecase: TypingUseCase,
    pub mark_read_usecase: MarkReadUseCase,
    pub get_online_users_usecase: GetOnlineUsersUseCase,
    pub get_room_history_usecase: GetRoomHistoryUseCase,
}

impl AppState {
    /// Wire every use case around a fresh set of registries.
    pub fn new(
        authenticator: Arc<dyn Authenticator>,
        room_store: Arc<dyn RoomAuthorizationStore>,
        message_store: Arc<dyn MessageStore>,
        message_pusher: Arc<dyn MessagePusher>,
        clock: Arc<dyn Clock>,
        settings: RealtimeSettings,
    ) -> Self {
        let registries: SharedRegistries = Registries::shared();

        Self {
            connect_participant_usecase: ConnectParticipantUseCase::new(
                authenticator.clone(),
                registries.clone(),
                message_pusher.clone(),
                clock.clone(),
            ),
            disconnect_participant_usecase: DisconnectParticipantUseCase::new(
                registries.clone(),
                message_pusher.clone(),
                clock.clone(),
            ),
            join_room_usecase: JoinRoomUseCase::new(
                room_store.clone(),
                registries.clone(),
                message_pusher.clone(),
                clock.clone(),
            ),
            leave_room_usecase: LeaveRoomUseCase::new(
                registries.clone(),
                message_pusher.clone(),
                clock.clone(),
            ),
            send_message_usecase: SendMessageUseCase::new(
                room_store.clone(),
                message_store.clone(),
                registries.clone(),
                message_pusher.clone(),
                settings.max_message_length,
            ),
            typing_usecase: TypingUseCase::new(
                room_store.clone(),
                registries.clone(),
                message_pusher.clone(),
                clock.clone(),
                settings.typing_timeout,
            ),
            mark_read_usecase: MarkReadUseCase::new(
                message_store.clone(),
                registries.clone(),
                message_pusher.clone(),
                clock,
            ),
            get_online_users_usecase: GetOnlineUsersUseCase::new(registries),
            get_room_history_usecase: GetRoomHistoryUseCase::new(
                authenticator,
                room_store,
                message_store,
                settings.default_history_limit,
                settings.max_history_limit,
            ),
            message_pusher,
        }
    }
}
