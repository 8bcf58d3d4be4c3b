//! Per-user change stream over WebSocket.

pub mod fanout;
pub mod handler;
pub mod server;
pub mod session;
