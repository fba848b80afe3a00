//! InMemory Room Store 実装
//!
//! ドメイン層が定義する `RoomAuthorizationStore` と `MessageStore` の具体的な実装。
//! HashMap をインメモリ DB として使用します。本番ではドキュメント DB を背後に持つ
//! 実装に差し替える想定です。

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tamariba_shared::time::Clock;
use tokio::sync::Mutex;

use crate::domain::{
    MessageId, MessageStore, MessageSummary, NewMessage, ReadMarker, Room,
    RoomAuthorizationStore, RoomId, StoreError, StoredMessage, Timestamp, UserId,
};

#[derive(Debug, Default)]
struct StoreState {
    rooms: HashMap<RoomId, Room>,
    /// Messages per room in send order
    messages: HashMap<RoomId, Vec<StoredMessage>>,
}

/// インメモリ Room Store 実装
pub struct InMemoryRoomStore {
    state: Mutex<StoreState>,
    /// サーバー時刻（メッセージの送信時刻はクライアントではなくここから取る）
    clock: Arc<dyn Clock>,
}

impl InMemoryRoomStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Mutex::new(StoreState::default()),
            clock,
        }
    }

    /// Room を登録（同じ ID の Room は置き換える）
    pub async fn add_room(&self, room: Room) {
        let mut state = self.state.lock().await;
        tracing::debug!(
            "Room '{}' stored with {} participants",
            room.id,
            room.participants.len()
        );
        state.rooms.insert(room.id.clone(), room);
    }

    /// 参加者を削除（存在しない参加者の場合は `false`）
    pub async fn remove_participant(
        &self,
        room_id: &RoomId,
        user_id: &UserId,
    ) -> Result<bool, StoreError> {
        let mut state = self.state.lock().await;
        let room = state
            .rooms
            .get_mut(room_id)
            .ok_or_else(|| StoreError::RoomNotFound(room_id.to_string()))?;
        Ok(room.participants.remove(user_id))
    }

    /// 保存済みメッセージを送信順に取得
    pub async fn messages(&self, room_id: &RoomId) -> Vec<StoredMessage> {
        let state = self.state.lock().await;
        state.messages.get(room_id).cloned().unwrap_or_default()
    }
}

#[async_trait]
impl RoomAuthorizationStore for InMemoryRoomStore {
    async fn get_room(&self, room_id: &RoomId) -> Result<Option<Room>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.rooms.get(room_id).cloned())
    }

    async fn is_participant(
        &self,
        room_id: &RoomId,
        user_id: &UserId,
    ) -> Result<bool, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .rooms
            .get(room_id)
            .is_some_and(|room| room.has_participant(user_id)))
    }
}

#[async_trait]
impl MessageStore for InMemoryRoomStore {
    async fn persist(&self, message: NewMessage) -> Result<StoredMessage, StoreError> {
        let mut state = self.state.lock().await;
        if !state.rooms.contains_key(&message.room_id) {
            return Err(StoreError::RoomNotFound(message.room_id.to_string()));
        }

        let stored = StoredMessage {
            id: MessageId::generate(),
            room_id: message.room_id,
            sender_id: message.sender_id,
            body: message.body.into_string(),
            kind: message.kind,
            sent_at: Timestamp::new(self.clock.now_millis()),
            read_by: Vec::new(),
        };
        state
            .messages
            .entry(stored.room_id.clone())
            .or_default()
            .push(stored.clone());

        Ok(stored)
    }

    async fn update_room_summary(
        &self,
        room_id: &RoomId,
        last_message: &StoredMessage,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        let room = state
            .rooms
            .get_mut(room_id)
            .ok_or_else(|| StoreError::RoomNotFound(room_id.to_string()))?;
        room.last_message = Some(MessageSummary::of(last_message));
        Ok(())
    }

    async fn mark_read(
        &self,
        room_id: &RoomId,
        user_id: &UserId,
        at: Timestamp,
    ) -> Result<usize, StoreError> {
        let mut state = self.state.lock().await;
        if !state.rooms.contains_key(room_id) {
            return Err(StoreError::RoomNotFound(room_id.to_string()));
        }

        let Some(messages) = state.messages.get_mut(room_id) else {
            return Ok(0);
        };
        let mut marked = 0;
        for message in messages
            .iter_mut()
            .filter(|m| &m.sender_id != user_id && !m.is_read_by(user_id))
        {
            message.read_by.push(ReadMarker {
                user_id: user_id.clone(),
                read_at: at,
            });
            marked += 1;
        }
        Ok(marked)
    }

    async fn history(
        &self,
        room_id: &RoomId,
        limit: usize,
    ) -> Result<Vec<StoredMessage>, StoreError> {
        let state = self.state.lock().await;
        if !state.rooms.contains_key(room_id) {
            return Err(StoreError::RoomNotFound(room_id.to_string()));
        }
        let messages = state.messages.get(room_id).map(Vec::as_slice).unwrap_or(&[]);
        let start = messages.len().saturating_sub(limit);
        Ok(messages[start..].to_vec())
    }
}
