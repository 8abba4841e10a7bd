//! WebSocket transport, wire protocol and connection registry

pub mod handler;
pub mod protocol;
pub mod registry;
