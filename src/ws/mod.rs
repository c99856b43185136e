//! WebSocket transport and the binary wire protocol

pub mod connection;
pub mod handler;
pub mod protocol;
