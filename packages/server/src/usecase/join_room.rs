//! UseCase: ルーム参加処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - JoinRoomUseCase::execute() メソッド
//! - 永続化された参加者リストによる認可と購読登録
//!
//! ### なぜこのテストが必要か
//! - 参加者でない接続が購読できてしまうと会話が漏れる
//! - 再参加で参加通知を重複させない
//! - 参加者から外されたユーザーの既存の購読が残り続けてはならない
//!
//! ### どのような状況を想定しているか
//! - 正常系：参加者の初回参加、再参加
//! - 異常系：存在しないルーム、参加者でないユーザー、参加者から外されたユーザー、ストア障害

use std::sync::Arc;

use tamariba_shared::time::Clock;

use crate::domain::{
    ConnectionId, MessagePusher, RoomAuthorizationStore, RoomId, ServerEvent, SharedRegistries,
    Timestamp, UserId,
};

use super::{error::RealtimeError, registered_identity, revoke_subscription};

/// ルーム参加結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Joined {
    pub room_id: RoomId,
    /// 現在このルームを購読しているユーザー（自分を含む）
    pub members: Vec<UserId>,
    /// 既に購読済みだった場合は `false`
    pub newly_joined: bool,
}

/// ルーム参加のユースケース
pub struct JoinRoomUseCase {
    room_store: Arc<dyn RoomAuthorizationStore>,
    registries: SharedRegistries,
    message_pusher: Arc<dyn MessagePusher>,
    clock: Arc<dyn Clock>,
}

impl JoinRoomUseCase {
    pub fn new(
        room_store: Arc<dyn RoomAuthorizationStore>,
        registries: SharedRegistries,
        message_pusher: Arc<dyn MessagePusher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            room_store,
            registries,
            message_pusher,
            clock,
        }
    }

    /// ルーム参加を実行
    ///
    /// 認可は毎回ストアに問い合わせる。再参加の場合も認可は再確認するが、
    /// 他の購読者への参加通知は送らない。
    pub async fn execute(
        &self,
        connection_id: ConnectionId,
        room_id: RoomId,
    ) -> Result<Joined, RealtimeError> {
        let identity = {
            let registries = self.registries.lock().await;
            registered_identity(&registries, &connection_id)?
        };

        if let Err(error) = self.authorize(&room_id, &identity.user_id).await {
            // 参加者から外された接続の既存の購読は取り消す
            if matches!(
                error,
                RealtimeError::AccessDenied(_) | RealtimeError::RoomNotFound(_)
            ) {
                revoke_subscription(
                    &self.registries,
                    self.message_pusher.as_ref(),
                    &connection_id,
                    &room_id,
                    Timestamp::new(self.clock.now_millis()),
                )
                .await;
            }
            return Err(error);
        }

        let timestamp = Timestamp::new(self.clock.now_millis());
        let mut registries = self.registries.lock().await;
        // ストア問い合わせ中に切断された可能性がある
        registered_identity(&registries, &connection_id)?;

        let newly_joined = registries.rooms.subscribe(room_id.clone(), connection_id);
        registries.connections.record_join(&connection_id, &room_id);

        if newly_joined {
            let others = registries.rooms.subscribers_except(&room_id, &connection_id);
            let event = ServerEvent::RoomMemberJoined {
                user_id: identity.user_id.clone(),
                room_id: room_id.clone(),
                timestamp,
            };
            if let Err(e) = self.message_pusher.broadcast(others, &event).await {
                tracing::warn!("Failed to broadcast room-member-joined: {}", e);
            }
        }

        let members = registries.room_members(&room_id);
        let ack = ServerEvent::RoomJoined {
            room_id: room_id.clone(),
            members: members.clone(),
        };
        if let Err(e) = self.message_pusher.push_to(&connection_id, &ack).await {
            tracing::warn!("Failed to send room-joined to '{}': {}", connection_id, e);
        }

        tracing::info!(
            "Connection '{}' of user '{}' joined room '{}'",
            connection_id,
            identity.user_id,
            room_id
        );

        Ok(Joined {
            room_id,
            members,
            newly_joined,
        })
    }

    async fn authorize(&self, room_id: &RoomId, user_id: &UserId) -> Result<(), RealtimeError> {
        if self.room_store.get_room(room_id).await?.is_none() {
            return Err(RealtimeError::RoomNotFound(room_id.to_string()));
        }
        if !self.room_store.is_participant(room_id, user_id).await? {
            tracing::warn!(
                "User '{}' is not a participant of room '{}'",
                user_id,
                room_id
            );
            return Err(RealtimeError::AccessDenied(format!(
                "user '{}' is not a participant of room '{}'",
                user_id, room_id
            )));
        }
        Ok(())
    }
}
