//! メッセージ送信（通知）の実装
//!
//! ## 概要
//!
//! このモジュールは `MessagePusher` trait の具体的な実装を提供します。
//!
//! ## 実装
//!
//! - `websocket`: WebSocket を使った実装（単一プロセス内のファンアウト）
//! - 複数プロセス構成では外部の pub/sub（redis など）を使った実装に差し替える

pub mod websocket;

pub use websocket::WebSocketMessagePusher;
