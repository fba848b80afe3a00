//! Test doubles shared by the use case tests.

use std::{
    collections::HashSet,
    sync::{Arc, Mutex as StdMutex},
};

use async_trait::async_trait;
use tamariba_shared::time::FixedClock;
use tokio::sync::mpsc;

use crate::{
    domain::{
        ConnectionId, Identity, MessagePushError, MessagePusher, PusherChannel, Registries,
        Room, RoomId, ServerEvent, SharedRegistries, UserId,
    },
    infrastructure::repository::{InMemoryAuthenticator, InMemoryRoomStore},
};

use super::{
    ConnectParticipantUseCase, JoinRoomUseCase, RealtimeSettings, SendMessageUseCase, TypingUseCase,
};

pub const NOW: i64 = 1_700_000_000_000;

/// Pusher that records every delivered event per connection.
#[derive(Default)]
pub struct RecordingPusher {
    registered: StdMutex<HashSet<ConnectionId>>,
    delivered: StdMutex<Vec<(ConnectionId, ServerEvent)>>,
}

impl RecordingPusher {
    /// Events delivered to `connection_id`, oldest first.
    pub fn events_for(&self, connection_id: &ConnectionId) -> Vec<ServerEvent> {
        self.delivered
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| id == connection_id)
            .map(|(_, event)| event.clone())
            .collect()
    }

    pub fn names_for(&self, connection_id: &ConnectionId) -> Vec<&'static str> {
        self.events_for(connection_id)
            .iter()
            .map(ServerEvent::name)
            .collect()
    }

    /// Every delivery of an event with the given wire name.
    pub fn deliveries_named(&self, name: &str) -> Vec<(ConnectionId, ServerEvent)> {
        self.delivered
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, event)| event.name() == name)
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.delivered.lock().unwrap().clear();
    }

    fn deliver(&self, connection_id: &ConnectionId, event: &ServerEvent) -> bool {
        if !self.registered.lock().unwrap().contains(connection_id) {
            return false;
        }
        self.delivered
            .lock()
            .unwrap()
            .push((*connection_id, event.clone()));
        true
    }
}

#[async_trait]
impl MessagePusher for RecordingPusher {
    async fn register_client(&self, connection_id: ConnectionId, _sender: PusherChannel) {
        self.registered.lock().unwrap().insert(connection_id);
    }

    async fn unregister_client(&self, connection_id: &ConnectionId) {
        self.registered.lock().unwrap().remove(connection_id);
    }

    async fn push_to(
        &self,
        connection_id: &ConnectionId,
        event: &ServerEvent,
    ) -> Result<(), MessagePushError> {
        if self.deliver(connection_id, event) {
            Ok(())
        } else {
            Err(MessagePushError::ClientNotFound(connection_id.to_string()))
        }
    }

    async fn broadcast(
        &self,
        targets: Vec<ConnectionId>,
        event: &ServerEvent,
    ) -> Result<(), MessagePushError> {
        for target in targets {
            self.deliver(&target, event);
        }
        Ok(())
    }
}

pub fn user(id: &str) -> UserId {
    UserId::new(id.to_string()).unwrap()
}

pub fn room(id: &str) -> RoomId {
    RoomId::new(id.to_string()).unwrap()
}

pub fn identity(id: &str) -> Identity {
    Identity::new(user(id), id.to_uppercase(), None)
}

/// Registries, pusher and in-memory collaborators wired together.
///
/// Rooms: `r1` = {alice, bob, carol}, `r2` = {alice}.
pub struct Fixture {
    pub registries: SharedRegistries,
    pub pusher: Arc<RecordingPusher>,
    pub store: Arc<InMemoryRoomStore>,
    pub authenticator: Arc<InMemoryAuthenticator>,
    pub clock: Arc<FixedClock>,
    pub settings: RealtimeSettings,
}

impl Fixture {
    pub async fn new() -> Self {
        let clock = Arc::new(FixedClock::new(NOW));
        let store = Arc::new(InMemoryRoomStore::new(clock.clone()));
        store
            .add_room(Room::new(room("r1"), [user("alice"), user("bob"), user("carol")]))
            .await;
        store.add_room(Room::new(room("r2"), [user("alice")])).await;

        let authenticator = Arc::new(InMemoryAuthenticator::new());
        for name in ["alice", "bob", "carol", "dave"] {
            authenticator
                .register(format!("token-{name}"), identity(name))
                .await;
        }

        Self {
            registries: Registries::shared(),
            pusher: Arc::new(RecordingPusher::default()),
            store,
            authenticator,
            clock,
            settings: RealtimeSettings::default(),
        }
    }

    pub fn connect_usecase(&self) -> ConnectParticipantUseCase {
        ConnectParticipantUseCase::new(
            self.authenticator.clone(),
            self.registries.clone(),
            self.pusher.clone(),
            self.clock.clone(),
        )
    }

    pub fn join_usecase(&self) -> JoinRoomUseCase {
        JoinRoomUseCase::new(
            self.store.clone(),
            self.registries.clone(),
            self.pusher.clone(),
            self.clock.clone(),
        )
    }

    pub fn typing_usecase(&self) -> TypingUseCase {
        TypingUseCase::new(
            self.store.clone(),
            self.registries.clone(),
            self.pusher.clone(),
            self.clock.clone(),
            self.settings.typing_timeout,
        )
    }

    pub fn send_usecase(&self) -> SendMessageUseCase {
        SendMessageUseCase::new(
            self.store.clone(),
            self.store.clone(),
            self.registries.clone(),
            self.pusher.clone(),
            self.settings.max_message_length,
        )
    }

    /// Admit a new connection for `name`.
    pub async fn connect(&self, name: &str) -> ConnectionId {
        let (tx, _rx) = mpsc::unbounded_channel();
        self.connect_usecase()
            .execute(identity(name), tx)
            .await
            .connection_id
    }

    pub async fn join(&self, connection_id: ConnectionId, room_id: &str) {
        self.join_usecase()
            .execute(connection_id, room(room_id))
            .await
            .unwrap();
    }
}
