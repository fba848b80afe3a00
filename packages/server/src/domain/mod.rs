//! Domain layer: value objects, entities, events, in-memory registries and
//! the collaborator traits the use cases depend on.

pub mod entity;
pub mod error;
pub mod event;
pub mod message_pusher;
pub mod registry;
pub mod repository;
pub mod value_object;

pub use entity::{
    Connection, Identity, MessageSummary, NewMessage, OnlineUser, ReadMarker, Room,
    StoredMessage,
};
pub use error::{AuthError, MessagePushError, StoreError, ValueObjectError};
pub use event::ServerEvent;
pub use message_pusher::{MessagePusher, PusherChannel};
pub use registry::{
    ConnectionRegistry, PresenceTracker, Registries, RoomMembership, SharedRegistries,
    TypingTracker,
};
pub use repository::{Authenticator, MessageStore, RoomAuthorizationStore};
pub use value_object::{
    ConnectionId, MessageBody, MessageId, MessageKind, RoomId, Timestamp, UserId,
};
