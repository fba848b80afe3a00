//! UseCase: 参加者接続処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - ConnectParticipantUseCase::authenticate() / execute()
//! - 接続の登録、プレゼンスの集約、オンライン一覧の送信
//!
//! ### なぜこのテストが必要か
//! - 認証に失敗した接続は登録されてはならない
//! - 同じユーザーの二つ目以降の接続でオンライン通知を重複させない
//!
//! ### どのような状況を想定しているか
//! - 正常系：最初の接続、同一ユーザーの追加接続
//! - 異常系：不正なトークン

use std::sync::Arc;

use tamariba_shared::time::Clock;

use crate::domain::{
    Authenticator, ConnectionId, Identity, MessagePusher, PusherChannel, ServerEvent,
    SharedRegistries, Timestamp,
};

use super::error::RealtimeError;

/// 接続結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectedParticipant {
    pub connection_id: ConnectionId,
    pub identity: Identity,
    pub connected_at: Timestamp,
    /// このユーザーの最初の接続だったか
    pub came_online: bool,
}

/// 参加者接続のユースケース
pub struct ConnectParticipantUseCase {
    authenticator: Arc<dyn Authenticator>,
    registries: SharedRegistries,
    message_pusher: Arc<dyn MessagePusher>,
    clock: Arc<dyn Clock>,
}

impl ConnectParticipantUseCase {
    pub fn new(
        authenticator: Arc<dyn Authenticator>,
        registries: SharedRegistries,
        message_pusher: Arc<dyn MessagePusher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            authenticator,
            registries,
            message_pusher,
            clock,
        }
    }

    /// ハンドシェイク時のトークン検証
    ///
    /// 失敗した場合は `Unauthenticated` を返し、接続は一切登録されない。
    pub async fn authenticate(&self, token: &str) -> Result<Identity, RealtimeError> {
        self.authenticator.verify(token).await.map_err(|e| {
            tracing::warn!("Handshake rejected: {}", e);
            RealtimeError::from(e)
        })
    }

    /// 認証済みの接続を登録する
    ///
    /// 1. 送信チャンネルを MessagePusher に登録
    /// 2. Connection Registry と Presence Tracker に登録
    /// 3. 新しい接続にオンライン一覧（スナップショット）を送信
    /// 4. オフライン → オンラインに遷移した場合のみ他の全接続に通知
    pub async fn execute(&self, identity: Identity, sender: PusherChannel) -> ConnectedParticipant {
        let connection_id = ConnectionId::generate();
        let connected_at = Timestamp::new(self.clock.now_millis());

        self.message_pusher
            .register_client(connection_id, sender)
            .await;

        let mut registries = self.registries.lock().await;
        registries
            .connections
            .admit(connection_id, identity.clone(), connected_at);
        let came_online = registries
            .presence
            .connect(&identity, connection_id, connected_at);

        let snapshot = ServerEvent::PresenceSnapshot {
            users: registries.presence.list_online(),
        };
        if let Err(e) = self.message_pusher.push_to(&connection_id, &snapshot).await {
            tracing::warn!("Failed to send presence snapshot to '{}': {}", connection_id, e);
        }

        if came_online {
            let others = registries.connections.ids_except(&connection_id);
            let online = ServerEvent::PresenceOnline {
                identity: identity.clone(),
                timestamp: connected_at,
            };
            if let Err(e) = self.message_pusher.broadcast(others, &online).await {
                tracing::warn!("Failed to broadcast presence-online: {}", e);
            }
        }

        tracing::info!(
            "Connection '{}' admitted for user '{}' ({} live connections)",
            connection_id,
            identity.user_id,
            registries.connections.len()
        );

        ConnectedParticipant {
            connection_id,
            identity,
            connected_at,
            came_online,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{AuthError, Registries, repository::MockAuthenticator},
        usecase::test_support::{Fixture, NOW, RecordingPusher, identity},
    };
    use tamariba_shared::time::FixedClock;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_authenticate_rejects_invalid_token() {
        // テスト項目: 不正なトークンは Unauthenticated で拒否され、何も登録されない
        // given (前提条件):
        let fixture = Fixture::new().await;
        let usecase = fixture.connect_usecase();

        // when (操作):
        let result = usecase.authenticate("forged").await;

        // then (期待する結果):
        assert!(matches!(result, Err(RealtimeError::Unauthenticated(_))));
        assert!(fixture.registries.lock().await.connections.is_empty());
    }

    #[tokio::test]
    async fn test_authenticate_delegates_to_authenticator() {
        // テスト項目: トークン検証は Authenticator に委譲される
        // given (前提条件):
        let mut authenticator = MockAuthenticator::new();
        authenticator
            .expect_verify()
            .withf(|token: &str| token == "token-alice")
            .times(1)
            .returning(|_| Ok(identity("alice")));
        authenticator
            .expect_verify()
            .returning(|_| Err(AuthError::InvalidToken));
        let usecase = ConnectParticipantUseCase::new(
            Arc::new(authenticator),
            Registries::shared(),
            Arc::new(RecordingPusher::default()),
            Arc::new(FixedClock::new(NOW)),
        );

        // when (操作):
        let accepted = usecase.authenticate("token-alice").await;
        let rejected = usecase.authenticate("expired").await;

        // then (期待する結果):
        assert_eq!(accepted, Ok(identity("alice")));
        assert_eq!(
            rejected,
            Err(RealtimeError::Unauthenticated(
                "credential token was rejected".to_string()
            ))
        );
    }

    #[tokio::test]
    async fn test_first_connection_broadcasts_online() {
        // テスト項目: 最初の接続でオンライン通知が他の全接続に送られ、本人にはスナップショットが届く
        // given (前提条件):
        let fixture = Fixture::new().await;
        let bob = fixture.connect("bob").await;
        fixture.pusher.clear();

        // when (操作):
        let (tx, _rx) = mpsc::unbounded_channel();
        let connected = fixture
            .connect_usecase()
            .execute(identity("alice"), tx)
            .await;

        // then (期待する結果):
        assert!(connected.came_online);
        assert_eq!(connected.connected_at, Timestamp::new(NOW));
        assert_eq!(fixture.pusher.names_for(&bob), vec!["presence-online"]);

        let events = fixture.pusher.events_for(&connected.connection_id);
        let ServerEvent::PresenceSnapshot { users } = &events[0] else {
            panic!("expected presence snapshot, got {:?}", events);
        };
        let ids: Vec<&str> = users.iter().map(|u| u.identity.user_id.as_str()).collect();
        assert_eq!(ids, vec!["alice", "bob"]);
        // 自分自身にはオンライン通知は届かない
        assert_eq!(events.len(), 1);
    }

    #[tokio::test]
    async fn test_second_connection_of_same_user_is_silent() {
        // テスト項目: 同じユーザーの二つ目の接続ではオンライン通知を送らない
        // given (前提条件):
        let fixture = Fixture::new().await;
        let bob = fixture.connect("bob").await;
        let alice_tab1 = fixture.connect("alice").await;
        fixture.pusher.clear();

        // when (操作):
        let (tx, _rx) = mpsc::unbounded_channel();
        let second = fixture
            .connect_usecase()
            .execute(identity("alice"), tx)
            .await;

        // then (期待する結果):
        assert!(!second.came_online);
        assert!(fixture.pusher.names_for(&bob).is_empty());
        assert!(fixture.pusher.names_for(&alice_tab1).is_empty());
        assert_eq!(
            fixture.pusher.names_for(&second.connection_id),
            vec!["presence-snapshot"]
        );

        let registries = fixture.registries.lock().await;
        assert_eq!(registries.presence.connection_count(&identity("alice").user_id), 2);
        assert_eq!(registries.connections.len(), 3);
    }
}
