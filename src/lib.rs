//! Authoritative real-time game server
//!
//! Clients connect over WebSocket and exchange fixed-layout little-endian
//! binary messages. A single tick engine owns all player state, applies staged
//! inputs at tick boundaries and replicates joins, leaves and moves.

pub mod app;
pub mod codec;
pub mod config;
pub mod game;
pub mod http;
pub mod util;
pub mod ws;
