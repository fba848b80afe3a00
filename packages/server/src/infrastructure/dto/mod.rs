//! Data Transfer Objects (DTOs) for the real-time server.
//!
//! DTOs are organized by protocol:
//! - `websocket`: client commands and server events
//! - `http`: HTTP API request/response DTOs

pub mod conversion;
pub mod http;
pub mod websocket;
