//! UseCase: メッセージ送信処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - SendMessageUseCase::execute() メソッド
//! - 検証 → 永続化 → 要約更新 → ブロードキャストの順序
//!
//! ### なぜこのテストが必要か
//! - 永続化に失敗したメッセージを配信してはならない（配信されたものは必ず保存済み）
//! - 要約の更新失敗で配信が止まってはならない
//! - 送信者自身のタブにも配信され、送信者の入力中状態は解除される
//!
//! ### どのような状況を想定しているか
//! - 正常系：購読者全員への配信
//! - 異常系：空・長すぎる本文、未参加ルーム、永続化失敗、要約更新失敗

use std::sync::Arc;

use crate::domain::{
    ConnectionId, MessageBody, MessageKind, MessagePusher, MessageStore, NewMessage,
    RoomAuthorizationStore, RoomId, ServerEvent, SharedRegistries, StoredMessage,
};

use super::{error::RealtimeError, joined_identity};

/// メッセージ送信のユースケース
pub struct SendMessageUseCase {
    room_store: Arc<dyn RoomAuthorizationStore>,
    message_store: Arc<dyn MessageStore>,
    registries: SharedRegistries,
    message_pusher: Arc<dyn MessagePusher>,
    max_message_length: usize,
}

impl SendMessageUseCase {
    pub fn new(
        room_store: Arc<dyn RoomAuthorizationStore>,
        message_store: Arc<dyn MessageStore>,
        registries: SharedRegistries,
        message_pusher: Arc<dyn MessagePusher>,
        max_message_length: usize,
    ) -> Self {
        Self {
            room_store,
            message_store,
            registries,
            message_pusher,
            max_message_length,
        }
    }

    /// メッセージ送信を実行
    ///
    /// 1. 本文を検証（空・長すぎる場合は `InvalidPayload`）
    /// 2. 接続がルームに参加済みか、送信者がまだ参加者かを確認
    /// 3. 永続化（失敗時は配信せずに `PersistenceFailure`）
    /// 4. ルームの最新メッセージ要約を更新（失敗はログのみ）
    /// 5. 送信者の入力中状態を解除し、購読者全員（送信者を含む）に配信
    pub async fn execute(
        &self,
        connection_id: ConnectionId,
        room_id: RoomId,
        body: String,
        kind: MessageKind,
    ) -> Result<StoredMessage, RealtimeError> {
        let body = MessageBody::new(body, self.max_message_length)?;

        let identity = {
            let registries = self.registries.lock().await;
            joined_identity(&registries, &connection_id, &room_id)?
        };

        if !self
            .room_store
            .is_participant(&room_id, &identity.user_id)
            .await?
        {
            return Err(RealtimeError::AccessDenied(format!(
                "user '{}' is no longer a participant of room '{}'",
                identity.user_id, room_id
            )));
        }

        let stored = self
            .message_store
            .persist(NewMessage {
                room_id: room_id.clone(),
                sender_id: identity.user_id.clone(),
                body,
                kind,
            })
            .await
            .map_err(|e| {
                tracing::error!("Failed to persist message in room '{}': {}", room_id, e);
                RealtimeError::from(e)
            })?;

        if let Err(e) = self
            .message_store
            .update_room_summary(&room_id, &stored)
            .await
        {
            tracing::warn!("Failed to update summary of room '{}': {}", room_id, e);
        }

        let mut registries = self.registries.lock().await;
        if let Some(origin) = registries.typing.stop(&room_id, &identity.user_id) {
            let others = registries.rooms.subscribers_except(&room_id, &origin);
            let event = ServerEvent::TypingChanged {
                user_id: identity.user_id.clone(),
                room_id: room_id.clone(),
                is_typing: false,
            };
            if let Err(e) = self.message_pusher.broadcast(others, &event).await {
                tracing::warn!("Failed to broadcast typing-changed: {}", e);
            }
        }

        let targets = registries.rooms.subscribers(&room_id);
        let target_count = targets.len();
        let event = ServerEvent::MessageReceived(stored.clone());
        if let Err(e) = self.message_pusher.broadcast(targets, &event).await {
            tracing::warn!("Failed to broadcast message-received: {}", e);
        }
        drop(registries);

        tracing::info!(
            "Message '{}' from '{}' relayed to {} connections in room '{}'",
            stored.id,
            identity.user_id,
            target_count,
            room_id
        );

        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{MessageId, StoreError, Timestamp, repository::MockMessageStore},
        usecase::test_support::{Fixture, NOW, room, user},
    };

    fn create_usecase(fixture: &Fixture) -> SendMessageUseCase {
        fixture.send_usecase()
    }

    #[tokio::test]
    async fn test_message_is_persisted_and_relayed_to_every_subscriber() {
        // テスト項目: 保存されたメッセージが送信者を含む購読者全員に配信される
        // given (前提条件):
        let fixture = Fixture::new().await;
        let alice = fixture.connect("alice").await;
        let bob = fixture.connect("bob").await;
        let carol = fixture.connect("carol").await;
        fixture.join(alice, "r1").await;
        fixture.join(bob, "r1").await;
        fixture.pusher.clear();

        // when (操作):
        let stored = create_usecase(&fixture)
            .execute(alice, room("r1"), "hello".to_string(), MessageKind::Text)
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(stored.body, "hello");
        assert_eq!(stored.sender_id, user("alice"));
        assert_eq!(stored.sent_at.value(), NOW);
        assert_eq!(fixture.store.messages(&room("r1")).await, vec![stored.clone()]);

        let expected = vec![ServerEvent::MessageReceived(stored)];
        assert_eq!(fixture.pusher.events_for(&alice), expected);
        assert_eq!(fixture.pusher.events_for(&bob), expected);
        // carol は参加者だが購読していない
        assert!(fixture.pusher.events_for(&carol).is_empty());
    }

    #[tokio::test]
    async fn test_room_summary_is_updated() {
        // テスト項目: 送信後にルームの最新メッセージ要約が更新される
        // given (前提条件):
        let fixture = Fixture::new().await;
        let alice = fixture.connect("alice").await;
        fixture.join(alice, "r1").await;

        // when (操作):
        let stored = create_usecase(&fixture)
            .execute(alice, room("r1"), "latest".to_string(), MessageKind::Text)
            .await
            .unwrap();

        // then (期待する結果):
        let summary = fixture
            .store
            .get_room(&room("r1"))
            .await
            .unwrap()
            .unwrap()
            .last_message
            .unwrap();
        assert_eq!(summary.message_id, stored.id);
        assert_eq!(summary.preview, "latest");
    }

    #[tokio::test]
    async fn test_blank_and_oversized_bodies_are_rejected() {
        // テスト項目: 空白のみ・上限超過の本文は InvalidPayload で配信されない
        // given (前提条件):
        let fixture = Fixture::new().await;
        let alice = fixture.connect("alice").await;
        let bob = fixture.connect("bob").await;
        fixture.join(alice, "r1").await;
        fixture.join(bob, "r1").await;
        fixture.pusher.clear();
        let usecase = create_usecase(&fixture);
        let oversized = "a".repeat(fixture.settings.max_message_length + 1);

        // when (操作):
        let blank = usecase
            .execute(alice, room("r1"), "   ".to_string(), MessageKind::Text)
            .await;
        let too_long = usecase
            .execute(alice, room("r1"), oversized, MessageKind::Text)
            .await;

        // then (期待する結果):
        assert!(matches!(blank, Err(RealtimeError::InvalidPayload(_))));
        assert!(matches!(too_long, Err(RealtimeError::InvalidPayload(_))));
        assert!(fixture.store.messages(&room("r1")).await.is_empty());
        assert!(fixture.pusher.events_for(&bob).is_empty());
    }

    #[tokio::test]
    async fn test_send_without_joining_is_denied() {
        // テスト項目: 購読していないルームへの送信は AccessDenied
        // given (前提条件):
        let fixture = Fixture::new().await;
        let alice = fixture.connect("alice").await;

        // when (操作):
        let result = create_usecase(&fixture)
            .execute(alice, room("r1"), "hi".to_string(), MessageKind::Text)
            .await;

        // then (期待する結果):
        assert!(matches!(result, Err(RealtimeError::AccessDenied(_))));
        assert!(fixture.store.messages(&room("r1")).await.is_empty());
    }

    #[tokio::test]
    async fn test_removed_participant_cannot_send() {
        // テスト項目: 購読後に参加者から外されたユーザーは送信できない
        // given (前提条件):
        let fixture = Fixture::new().await;
        let bob = fixture.connect("bob").await;
        fixture.join(bob, "r1").await;
        fixture
            .store
            .remove_participant(&room("r1"), &user("bob"))
            .await
            .unwrap();

        // when (操作):
        let result = create_usecase(&fixture)
            .execute(bob, room("r1"), "still here?".to_string(), MessageKind::Text)
            .await;

        // then (期待する結果):
        assert!(matches!(result, Err(RealtimeError::AccessDenied(_))));
    }

    #[tokio::test]
    async fn test_persistence_failure_is_not_relayed() {
        // テスト項目: 永続化に失敗したメッセージは誰にも配信されず、再送可能なエラーになる
        // given (前提条件):
        let fixture = Fixture::new().await;
        let alice = fixture.connect("alice").await;
        let bob = fixture.connect("bob").await;
        fixture.join(alice, "r1").await;
        fixture.join(bob, "r1").await;
        fixture.pusher.clear();

        let mut message_store = MockMessageStore::new();
        message_store
            .expect_persist()
            .times(1)
            .returning(|_| Err(StoreError::Unavailable("write timeout".into())));
        message_store.expect_update_room_summary().never();
        let usecase = SendMessageUseCase::new(
            fixture.store.clone(),
            Arc::new(message_store),
            fixture.registries.clone(),
            fixture.pusher.clone(),
            fixture.settings.max_message_length,
        );

        // when (操作):
        let result = usecase
            .execute(alice, room("r1"), "lost".to_string(), MessageKind::Text)
            .await;

        // then (期待する結果):
        let error = result.unwrap_err();
        assert!(matches!(error, RealtimeError::PersistenceFailure(_)));
        assert!(error.is_retryable());
        assert!(fixture.pusher.deliveries_named("message-received").is_empty());
    }

    #[tokio::test]
    async fn test_summary_failure_does_not_block_relay() {
        // テスト項目: 要約更新に失敗してもメッセージは配信される
        // given (前提条件):
        let fixture = Fixture::new().await;
        let alice = fixture.connect("alice").await;
        let bob = fixture.connect("bob").await;
        fixture.join(alice, "r1").await;
        fixture.join(bob, "r1").await;
        fixture.pusher.clear();

        let real_store = fixture.store.clone();
        let mut message_store = MockMessageStore::new();
        message_store.expect_persist().returning(move |message| {
            Ok(StoredMessage {
                id: MessageId::generate(),
                room_id: message.room_id,
                sender_id: message.sender_id,
                body: message.body.into_string(),
                kind: message.kind,
                sent_at: Timestamp::new(NOW),
                read_by: Vec::new(),
            })
        });
        message_store
            .expect_update_room_summary()
            .returning(|_, _| Err(StoreError::Unavailable("index busy".into())));
        let usecase = SendMessageUseCase::new(
            real_store,
            Arc::new(message_store),
            fixture.registries.clone(),
            fixture.pusher.clone(),
            fixture.settings.max_message_length,
        );

        // when (操作):
        let result = usecase
            .execute(alice, room("r1"), "still delivered".to_string(), MessageKind::Text)
            .await;

        // then (期待する結果):
        assert!(result.is_ok());
        assert_eq!(fixture.pusher.names_for(&bob), vec!["message-received"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sending_clears_sender_typing() {
        // テスト項目: 送信すると送信者の入力中状態が解除され、配信より先に通知される
        // given (前提条件):
        let fixture = Fixture::new().await;
        let alice = fixture.connect("alice").await;
        let bob = fixture.connect("bob").await;
        fixture.join(alice, "r1").await;
        fixture.join(bob, "r1").await;
        fixture
            .typing_usecase()
            .start(alice, room("r1"))
            .await
            .unwrap();
        fixture.pusher.clear();

        // when (操作):
        create_usecase(&fixture)
            .execute(alice, room("r1"), "done typing".to_string(), MessageKind::Text)
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(
            fixture.pusher.names_for(&bob),
            vec!["typing-changed", "message-received"]
        );
        assert!(
            !fixture
                .registries
                .lock()
                .await
                .typing
                .is_typing(&room("r1"), &user("alice"))
        );
    }
}
