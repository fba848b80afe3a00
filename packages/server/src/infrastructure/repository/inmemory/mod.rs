//! In-memory collaborator implementations.

pub mod authenticator;
pub mod room;

pub use authenticator::InMemoryAuthenticator;
pub use room::InMemoryRoomStore;
