//! Collaborator traits consumed by the real-time core.
//!
//! Authentication and persistence live outside this crate. The use case
//! layer depends only on these traits; the infrastructure layer provides the
//! implementations.

use async_trait::async_trait;

use super::{
    AuthError, Identity, NewMessage, Room, RoomId, StoreError, StoredMessage, Timestamp, UserId,
};

/// Validates a credential token and resolves the identity behind it.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn verify(&self, token: &str) -> Result<Identity, AuthError>;
}

/// Persisted room membership, consulted on every authorization check.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RoomAuthorizationStore: Send + Sync {
    /// `Ok(None)` when the room does not exist
    async fn get_room(&self, room_id: &RoomId) -> Result<Option<Room>, StoreError>;

    async fn is_participant(&self, room_id: &RoomId, user_id: &UserId)
    -> Result<bool, StoreError>;
}

/// Persistent message storage.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Store a message; the store assigns the id and the server timestamp.
    async fn persist(&self, message: NewMessage) -> Result<StoredMessage, StoreError>;

    async fn update_room_summary(
        &self,
        room_id: &RoomId,
        last_message: &StoredMessage,
    ) -> Result<(), StoreError>;

    /// Append a read marker for `user_id` to every unread message in the
    /// room that someone else sent. Returns the number of messages marked.
    async fn mark_read(
        &self,
        room_id: &RoomId,
        user_id: &UserId,
        at: Timestamp,
    ) -> Result<usize, StoreError>;

    /// Most recent `limit` messages, oldest first. Never touches read state.
    async fn history(&self, room_id: &RoomId, limit: usize)
    -> Result<Vec<StoredMessage>, StoreError>;
}
