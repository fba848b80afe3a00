//! UseCase: 既読処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - MarkReadUseCase::execute() メソッド
//!
//! ### なぜこのテストが必要か
//! - 既読は明示的なコマンドでのみ付与される（履歴取得では付与しない）
//! - 自分のメッセージ・既読済みメッセージには二重にマーカーを付けない
//!
//! ### どのような状況を想定しているか
//! - 正常系：未読ありの既読化
//! - エッジケース：未読なし（本人にのみ結果を返す）
//! - 異常系：未参加ルーム

use std::sync::Arc;

use tamariba_shared::time::Clock;

use crate::domain::{
    ConnectionId, MessagePusher, MessageStore, RoomId, ServerEvent, SharedRegistries, Timestamp,
};

use super::{error::RealtimeError, joined_identity};

/// 既読化のユースケース
pub struct MarkReadUseCase {
    message_store: Arc<dyn MessageStore>,
    registries: SharedRegistries,
    message_pusher: Arc<dyn MessagePusher>,
    clock: Arc<dyn Clock>,
}

impl MarkReadUseCase {
    pub fn new(
        message_store: Arc<dyn MessageStore>,
        registries: SharedRegistries,
        message_pusher: Arc<dyn MessagePusher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            message_store,
            registries,
            message_pusher,
            clock,
        }
    }

    /// ルーム内の未読メッセージを既読にする
    ///
    /// 1 件以上既読にした場合は購読者全員に `messages-read` を配信し、
    /// 0 件の場合は要求した接続にだけ返す。既読にした件数を返す。
    pub async fn execute(
        &self,
        connection_id: ConnectionId,
        room_id: RoomId,
    ) -> Result<usize, RealtimeError> {
        let identity = {
            let registries = self.registries.lock().await;
            joined_identity(&registries, &connection_id, &room_id)?
        };

        let timestamp = Timestamp::new(self.clock.now_millis());
        let count = self
            .message_store
            .mark_read(&room_id, &identity.user_id, timestamp)
            .await?;

        let event = ServerEvent::MessagesRead {
            room_id: room_id.clone(),
            user_id: identity.user_id.clone(),
            count,
            timestamp,
        };

        if count == 0 {
            if let Err(e) = self.message_pusher.push_to(&connection_id, &event).await {
                tracing::warn!("Failed to send messages-read to '{}': {}", connection_id, e);
            }
            return Ok(0);
        }

        let registries = self.registries.lock().await;
        let targets = registries.rooms.subscribers(&room_id);
        if let Err(e) = self.message_pusher.broadcast(targets, &event).await {
            tracing::warn!("Failed to broadcast messages-read: {}", e);
        }
        drop(registries);

        tracing::info!(
            "User '{}' read {} messages in room '{}'",
            identity.user_id,
            count,
            room_id
        );
        Ok(count)
    }
}
