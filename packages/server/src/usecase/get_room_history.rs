//! UseCase: ルームのメッセージ履歴取得
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - GetRoomHistoryUseCase::execute() メソッド
//!
//! ### なぜこのテストが必要か
//! - HTTP から直接呼ばれるため、トークン検証と参加者判定を自前で行う必要がある
//! - 履歴取得は既読状態を変更しない純粋なクエリでなければならない
//!
//! ### どのような状況を想定しているか
//! - 正常系：件数指定あり・なし
//! - 異常系：不正トークン、参加者でないユーザー、存在しないルーム

use std::sync::Arc;

use crate::domain::{Authenticator, MessageStore, RoomAuthorizationStore, RoomId, StoredMessage};

use super::error::RealtimeError;

/// 履歴取得のユースケース
pub struct GetRoomHistoryUseCase {
    authenticator: Arc<dyn Authenticator>,
    room_store: Arc<dyn RoomAuthorizationStore>,
    message_store: Arc<dyn MessageStore>,
    default_limit: usize,
    max_limit: usize,
}

impl GetRoomHistoryUseCase {
    pub fn new(
        authenticator: Arc<dyn Authenticator>,
        room_store: Arc<dyn RoomAuthorizationStore>,
        message_store: Arc<dyn MessageStore>,
        default_limit: usize,
        max_limit: usize,
    ) -> Self {
        Self {
            authenticator,
            room_store,
            message_store,
            default_limit,
            max_limit,
        }
    }

    /// 直近のメッセージを古い順に返す
    ///
    /// `limit` は 1 以上 `max_limit` 以下に丸められる。
    pub async fn execute(
        &self,
        token: &str,
        room_id: &RoomId,
        limit: Option<usize>,
    ) -> Result<Vec<StoredMessage>, RealtimeError> {
        let identity = self.authenticator.verify(token).await?;

        if self.room_store.get_room(room_id).await?.is_none() {
            return Err(RealtimeError::RoomNotFound(room_id.to_string()));
        }
        if !self
            .room_store
            .is_participant(room_id, &identity.user_id)
            .await?
        {
            return Err(RealtimeError::AccessDenied(format!(
                "user '{}' is not a participant of room '{}'",
                identity.user_id, room_id
            )));
        }

        let limit = limit
            .unwrap_or(self.default_limit)
            .clamp(1, self.max_limit);
        let messages = self.message_store.history(room_id, limit).await?;
        tracing::debug!(
            "Returned {} messages of room '{}' to '{}'",
            messages.len(),
            room_id,
            identity.user_id
        );
        Ok(messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{MessageBody, MessageKind, NewMessage},
        usecase::test_support::{Fixture, room, user},
    };

    fn create_usecase(fixture: &Fixture) -> GetRoomHistoryUseCase {
        GetRoomHistoryUseCase::new(
            fixture.authenticator.clone(),
            fixture.store.clone(),
            fixture.store.clone(),
            fixture.settings.default_history_limit,
            fixture.settings.max_history_limit,
        )
    }

    async fn seed(fixture: &Fixture, count: usize) {
        for i in 0..count {
            fixture
                .store
                .persist(NewMessage {
                    room_id: room("r1"),
                    sender_id: user("alice"),
                    body: MessageBody::new(format!("message {i}"), 1000).unwrap(),
                    kind: MessageKind::Text,
                })
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_returns_latest_messages_oldest_first() {
        // テスト項目: 件数指定で直近 N 件を古い順に返す
        // given (前提条件):
        let fixture = Fixture::new().await;
        seed(&fixture, 5).await;

        // when (操作):
        let messages = create_usecase(&fixture)
            .execute("token-bob", &room("r1"), Some(2))
            .await
            .unwrap();

        // then (期待する結果):
        let bodies: Vec<_> = messages.iter().map(|m| m.body.as_str()).collect();
        assert_eq!(bodies, vec!["message 3", "message 4"]);
    }

    #[tokio::test]
    async fn test_history_does_not_mark_read() {
        // テスト項目: 履歴取得で既読マーカーは付かない
        // given (前提条件):
        let fixture = Fixture::new().await;
        seed(&fixture, 3).await;

        // when (操作):
        create_usecase(&fixture)
            .execute("token-bob", &room("r1"), None)
            .await
            .unwrap();

        // then (期待する結果):
        let messages = fixture.store.messages(&room("r1")).await;
        assert!(messages.iter().all(|m| !m.is_read_by(&user("bob"))));
    }

    #[tokio::test]
    async fn test_zero_limit_is_raised_to_one() {
        // テスト項目: limit=0 は 1 件として扱う
        // given (前提条件):
        let fixture = Fixture::new().await;
        seed(&fixture, 3).await;

        // when (操作):
        let messages = create_usecase(&fixture)
            .execute("token-alice", &room("r1"), Some(0))
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(messages.len(), 1);
    }

    #[tokio::test]
    async fn test_rejects_bad_token_non_participant_and_unknown_room() {
        // テスト項目: 認証・認可・存在チェックのエラー
        // given (前提条件):
        let fixture = Fixture::new().await;
        let usecase = create_usecase(&fixture);

        // when (操作):
        let bad_token = usecase.execute("nope", &room("r1"), None).await;
        let outsider = usecase.execute("token-dave", &room("r1"), None).await;
        let unknown = usecase.execute("token-alice", &room("nowhere"), None).await;

        // then (期待する結果):
        assert!(matches!(bad_token, Err(RealtimeError::Unauthenticated(_))));
        assert!(matches!(outsider, Err(RealtimeError::AccessDenied(_))));
        assert!(matches!(unknown, Err(RealtimeError::RoomNotFound(_))));
    }
}
