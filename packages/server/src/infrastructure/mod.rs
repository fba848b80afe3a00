//! Infrastructure layer: wire DTOs, the WebSocket pusher and in-memory
//! collaborator implementations.

pub mod dto;
pub mod message_pusher;
pub mod repository;
