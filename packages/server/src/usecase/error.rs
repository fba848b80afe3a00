//! UseCase 層のエラー型
//!
//! ハンドラ境界で `error` イベントに変換され、原因となった接続にのみ送信されます。

use thiserror::Error;

use crate::domain::{AuthError, ServerEvent, StoreError, ValueObjectError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RealtimeError {
    /// Bad, missing or expired credential at handshake
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("access denied: {0}")]
    AccessDenied(String),

    #[error("room '{0}' not found")]
    RoomNotFound(String),

    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error("persistence failure: {0}")]
    PersistenceFailure(String),

    /// The connection was torn down while the handler awaited I/O
    #[error("connection '{0}' is closed")]
    ConnectionClosed(String),
}

impl RealtimeError {
    /// Wire name used in the `error` event.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Unauthenticated(_) => "unauthenticated",
            Self::AccessDenied(_) => "access-denied",
            Self::RoomNotFound(_) => "room-not-found",
            Self::InvalidPayload(_) => "invalid-payload",
            Self::PersistenceFailure(_) => "persistence-failure",
            Self::ConnectionClosed(_) => "connection-closed",
        }
    }

    /// Whether resending the identical request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::PersistenceFailure(_))
    }

    pub fn to_event(&self) -> ServerEvent {
        ServerEvent::Error {
            kind: self.kind(),
            message: self.to_string(),
            retryable: self.is_retryable(),
        }
    }
}

impl From<AuthError> for RealtimeError {
    fn from(error: AuthError) -> Self {
        Self::Unauthenticated(error.to_string())
    }
}

impl From<ValueObjectError> for RealtimeError {
    fn from(error: ValueObjectError) -> Self {
        Self::InvalidPayload(error.to_string())
    }
}

impl From<StoreError> for RealtimeError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::RoomNotFound(room_id) => Self::RoomNotFound(room_id),
            StoreError::Unavailable(reason) => Self::PersistenceFailure(reason),
        }
    }
}
