//! UseCase: 入力中インジケーター
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - TypingUseCase::start() / stop() と失効タイマー
//!
//! ### なぜこのテストが必要か
//! - 入力開始の連打で通知を重複させない
//! - 明示的な停止がなくても一定時間で自動的に解除されなければならない
//! - 再通知（再アーム）された場合、古いタイマーで解除されてはならない
//!
//! ### どのような状況を想定しているか
//! - 正常系：開始→停止、開始→失効
//! - エッジケース：タイムアウト直前の再アーム、停止済みでの停止
//! - 異常系：参加していないルームでの入力開始、参加者から外された後の入力開始

use std::{sync::Arc, time::Duration};

use tamariba_shared::time::Clock;

use crate::domain::{
    ConnectionId, MessagePusher, RoomAuthorizationStore, RoomId, ServerEvent, SharedRegistries,
    Timestamp, UserId,
};

use super::{error::RealtimeError, joined_identity, revoke_subscription};

/// 入力中状態の開始・停止のユースケース
pub struct TypingUseCase {
    room_store: Arc<dyn RoomAuthorizationStore>,
    registries: SharedRegistries,
    message_pusher: Arc<dyn MessagePusher>,
    clock: Arc<dyn Clock>,
    typing_timeout: Duration,
}

impl TypingUseCase {
    pub fn new(
        room_store: Arc<dyn RoomAuthorizationStore>,
        registries: SharedRegistries,
        message_pusher: Arc<dyn MessagePusher>,
        clock: Arc<dyn Clock>,
        typing_timeout: Duration,
    ) -> Self {
        Self {
            room_store,
            registries,
            message_pusher,
            clock,
            typing_timeout,
        }
    }

    /// 入力開始
    ///
    /// 既に入力中の場合はタイマーを再アームするだけで通知はしない。
    /// 通知した場合は `true` を返す。参加者から外されていた場合は購読を取り消す。
    pub async fn start(
        &self,
        connection_id: ConnectionId,
        room_id: RoomId,
    ) -> Result<bool, RealtimeError> {
        let identity = {
            let registries = self.registries.lock().await;
            joined_identity(&registries, &connection_id, &room_id)?
        };

        if !self
            .room_store
            .is_participant(&room_id, &identity.user_id)
            .await?
        {
            revoke_subscription(
                &self.registries,
                self.message_pusher.as_ref(),
                &connection_id,
                &room_id,
                Timestamp::new(self.clock.now_millis()),
            )
            .await;
            return Err(RealtimeError::AccessDenied(format!(
                "user '{}' is no longer a participant of room '{}'",
                identity.user_id, room_id
            )));
        }

        let mut registries = self.registries.lock().await;
        // ストア問い合わせ中に退出・切断された可能性がある
        let identity = joined_identity(&registries, &connection_id, &room_id)?;
        let user_id = identity.user_id;

        let armed = registries
            .typing
            .arm(room_id.clone(), user_id.clone(), connection_id);

        let expiry = tokio::spawn(expire_after(
            self.registries.clone(),
            self.message_pusher.clone(),
            self.typing_timeout,
            room_id.clone(),
            user_id.clone(),
            armed.generation,
        ));
        registries
            .typing
            .attach_expiry(&room_id, &user_id, armed.generation, expiry.abort_handle());

        if armed.started {
            let others = registries.rooms.subscribers_except(&room_id, &connection_id);
            let event = ServerEvent::TypingChanged {
                user_id,
                room_id,
                is_typing: true,
            };
            if let Err(e) = self.message_pusher.broadcast(others, &event).await {
                tracing::warn!("Failed to broadcast typing-changed: {}", e);
            }
        }

        Ok(armed.started)
    }

    /// 入力停止
    ///
    /// 入力中でなければ何もせず `false` を返す。
    pub async fn stop(
        &self,
        connection_id: ConnectionId,
        room_id: RoomId,
    ) -> Result<bool, RealtimeError> {
        let mut registries = self.registries.lock().await;
        let identity = joined_identity(&registries, &connection_id, &room_id)?;

        let Some(origin) = registries.typing.stop(&room_id, &identity.user_id) else {
            return Ok(false);
        };

        let others = registries.rooms.subscribers_except(&room_id, &origin);
        let event = ServerEvent::TypingChanged {
            user_id: identity.user_id,
            room_id,
            is_typing: false,
        };
        if let Err(e) = self.message_pusher.broadcast(others, &event).await {
            tracing::warn!("Failed to broadcast typing-changed: {}", e);
        }
        Ok(true)
    }
}

/// 失効タイマー本体
///
/// 待機後に世代が一致した場合のみ入力中状態を解除して通知する。
async fn expire_after(
    registries: SharedRegistries,
    message_pusher: Arc<dyn MessagePusher>,
    timeout: Duration,
    room_id: RoomId,
    user_id: UserId,
    generation: u64,
) {
    tokio::time::sleep(timeout).await;

    let mut registries = registries.lock().await;
    let Some(origin) = registries.typing.expire(&room_id, &user_id, generation) else {
        return;
    };
    tracing::debug!("Typing of '{}' in room '{}' expired", user_id, room_id);

    let others = registries.rooms.subscribers_except(&room_id, &origin);
    let event = ServerEvent::TypingChanged {
        user_id,
        room_id,
        is_typing: false,
    };
    if let Err(e) = message_pusher.broadcast(others, &event).await {
        tracing::warn!("Failed to broadcast typing-changed: {}", e);
    }
}
