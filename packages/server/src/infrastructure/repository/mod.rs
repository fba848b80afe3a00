//! Collaborator implementations (authentication and persistence).

pub mod inmemory;

pub use inmemory::{InMemoryAuthenticator, InMemoryRoomStore};
