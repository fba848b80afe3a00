//! Request handlers.

mod command;
mod http;
mod websocket;

pub use http::{get_presence, get_room_history, health_check};
pub use websocket::websocket_handler;
