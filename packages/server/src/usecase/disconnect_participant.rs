//! UseCase: 参加者切断処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - DisconnectParticipantUseCase::execute() メソッド
//! - 切断時のルーム購読・入力中状態・プレゼンスの後始末
//!
//! ### なぜこのテストが必要か
//! - 購読が残り続けるとリソースリークになる
//! - 複数タブを開いたユーザーが一つ閉じただけでオフライン扱いされてはならない
//! - 切断後に入力中タイマーが発火してはならない
//!
//! ### どのような状況を想定しているか
//! - 正常系：最後の接続の切断、複数接続のうち一つの切断
//! - エッジケース：二重切断（冪等性）

use std::sync::Arc;

use tamariba_shared::time::Clock;

use crate::domain::{
    ConnectionId, Identity, MessagePusher, RoomId, ServerEvent, SharedRegistries, Timestamp,
};

/// 切断結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisconnectOutcome {
    pub identity: Identity,
    /// 切断によって退出したルーム
    pub left_rooms: Vec<RoomId>,
    /// このユーザーの最後の接続だったか
    pub went_offline: bool,
}

/// 参加者切断のユースケース
pub struct DisconnectParticipantUseCase {
    registries: SharedRegistries,
    message_pusher: Arc<dyn MessagePusher>,
    clock: Arc<dyn Clock>,
}

impl DisconnectParticipantUseCase {
    pub fn new(
        registries: SharedRegistries,
        message_pusher: Arc<dyn MessagePusher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            registries,
            message_pusher,
            clock,
        }
    }

    /// 参加者切断を実行
    ///
    /// 未知の接続（二重切断など）の場合は何もせず `None` を返す。
    pub async fn execute(&self, connection_id: &ConnectionId) -> Option<DisconnectOutcome> {
        let timestamp = Timestamp::new(self.clock.now_millis());
        let mut registries = self.registries.lock().await;

        let Some(connection) = registries.connections.remove(connection_id) else {
            drop(registries);
            self.message_pusher.unregister_client(connection_id).await;
            tracing::debug!("Connection '{}' already removed", connection_id);
            return None;
        };

        // タイマーを先に止める（後始末の後に発火させない）
        let cleared_typing = registries.typing.clear_connection(connection_id);
        for room_id in &connection.rooms {
            registries.rooms.unsubscribe(room_id, connection_id);
        }

        for (room_id, user_id) in cleared_typing {
            let targets = registries.rooms.subscribers(&room_id);
            let event = ServerEvent::TypingChanged {
                user_id,
                room_id,
                is_typing: false,
            };
            if let Err(e) = self.message_pusher.broadcast(targets, &event).await {
                tracing::warn!("Failed to broadcast typing-changed: {}", e);
            }
        }

        for room_id in &connection.rooms {
            let targets = registries.rooms.subscribers(room_id);
            let event = ServerEvent::RoomMemberLeft {
                user_id: connection.user_id().clone(),
                room_id: room_id.clone(),
                timestamp,
            };
            if let Err(e) = self.message_pusher.broadcast(targets, &event).await {
                tracing::warn!("Failed to broadcast room-member-left: {}", e);
            }
        }

        let went_offline = registries
            .presence
            .disconnect(connection.user_id(), connection_id);
        if went_offline {
            let targets = registries.connections.all_ids();
            let event = ServerEvent::PresenceOffline {
                identity: connection.identity.clone(),
                timestamp,
            };
            if let Err(e) = self.message_pusher.broadcast(targets, &event).await {
                tracing::warn!("Failed to broadcast presence-offline: {}", e);
            }
        }
        drop(registries);

        self.message_pusher.unregister_client(connection_id).await;

        tracing::info!(
            "Connection '{}' of user '{}' removed (left {} rooms, offline: {})",
            connection_id,
            connection.user_id(),
            connection.rooms.len(),
            went_offline
        );

        Some(DisconnectOutcome {
            left_rooms: connection.rooms.iter().cloned().collect(),
            identity: connection.identity,
            went_offline,
        })
    }
}
