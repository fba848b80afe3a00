//! UseCase: ルーム退出処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - LeaveRoomUseCase::execute() メソッド
//!
//! ### なぜこのテストが必要か
//! - 退出は冪等でなければならない（二重退出でエラーや重複通知を出さない）
//! - 退出した接続の入力中状態が残ってはならない
//!
//! ### どのような状況を想定しているか
//! - 正常系：購読中のルームからの退出
//! - エッジケース：購読していないルームからの退出

use std::sync::Arc;

use tamariba_shared::time::Clock;

use crate::domain::{ConnectionId, MessagePusher, RoomId, SharedRegistries, Timestamp};

use super::unsubscribe_and_notify;

/// ルーム退出のユースケース
pub struct LeaveRoomUseCase {
    registries: SharedRegistries,
    message_pusher: Arc<dyn MessagePusher>,
    clock: Arc<dyn Clock>,
}

impl LeaveRoomUseCase {
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

    /// ルーム退出を実行
    ///
    /// 購読していなかった場合は何もせず `false` を返す。
    pub async fn execute(&self, connection_id: ConnectionId, room_id: RoomId) -> bool {
        let mut registries = self.registries.lock().await;
        let Some(user_id) = registries
            .connections
            .get(&connection_id)
            .map(|connection| connection.user_id().clone())
        else {
            return false;
        };

        let left = unsubscribe_and_notify(
            &mut registries,
            self.message_pusher.as_ref(),
            &connection_id,
            &room_id,
            &user_id,
            Timestamp::new(self.clock.now_millis()),
        )
        .await;
        if !left {
            tracing::debug!(
                "Connection '{}' was not subscribed to room '{}'",
                connection_id,
                room_id
            );
            return false;
        }

        tracing::info!(
            "Connection '{}' of user '{}' left room '{}'",
            connection_id,
            user_id,
            room_id
        );
        true
    }
}
