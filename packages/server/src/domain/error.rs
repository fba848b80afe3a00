//! Domain-level error types.

use thiserror::Error;

/// Validation failures for value objects.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueObjectError {
    #[error("{0} must not be empty")]
    EmptyIdentifier(&'static str),

    #[error("{kind} must be at most {max} bytes")]
    IdentifierTooLong { kind: &'static str, max: usize },

    #[error("message body must not be empty")]
    EmptyMessageBody,

    #[error("message body is {actual} characters, the limit is {max}")]
    MessageBodyTooLong { max: usize, actual: usize },
}

/// Failures reported by the Authenticator collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("credential token is missing")]
    MissingToken,

    #[error("credential token was rejected")]
    InvalidToken,
}

/// Failures reported by the room and message store collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("room '{0}' not found")]
    RoomNotFound(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Failures while pushing events to connected clients.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessagePushError {
    #[error("connection '{0}' is not registered")]
    ClientNotFound(String),

    #[error("failed to push message: {0}")]
    PushFailed(String),

    #[error("failed to encode event: {0}")]
    EncodeFailed(String),
}
