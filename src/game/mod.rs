//! Game simulation modules

pub mod engine;
pub mod physics;
pub mod player;
pub mod registry;
pub mod replication;

pub use engine::{TickEngine, TickSummary};
pub use player::{Moving, MovingMask, Player};
pub use registry::PlayerRegistry;

use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use serde::Serialize;
use uuid::Uuid;

use crate::ws::connection::{Connection, FrameTicket};
use crate::ws::protocol::ProtocolError;

/// Player identity on the wire
pub type PlayerId = u32;

// Shared with clients; must match bit-for-bit
pub const WORLD_FACTOR: f32 = 100.0;
pub const WORLD_WIDTH: f32 = 8.0 * WORLD_FACTOR * 0.1;
pub const WORLD_HEIGHT: f32 = 6.0 * WORLD_FACTOR * 0.1;
pub const PLAYER_SPEED: f32 = 20.0;

pub const DEFAULT_SERVER_FPS: u32 = 60;
pub const DEFAULT_SERVER_PORT: u16 = 6969;

/// Event from a connection task to the tick engine
#[derive(Debug)]
pub enum ConnectionEvent {
    /// Transport accepted; the engine admits a player for it
    Opened { connection: Connection },
    /// One binary frame; the ticket frees its sender's queue slot once handled
    Frame {
        connection_id: Uuid,
        payload: Bytes,
        ticket: FrameTicket,
    },
    /// The connection task saw a violation the engine could not (text frame)
    Violation { connection_id: Uuid, error: ProtocolError },
    Closed { connection_id: Uuid },
}

/// Counters published by the tick engine, read by `/health`
#[derive(Debug, Default)]
pub struct ServerStats {
    pub tick: AtomicU64,
    pub players: AtomicU64,
    pub joins: AtomicU64,
    pub leaves: AtomicU64,
    pub rejected_messages: AtomicU64,
    pub frames_sent: AtomicU64,
    pub send_failures: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub tick: u64,
    pub players: u64,
    pub joins: u64,
    pub leaves: u64,
    pub rejected_messages: u64,
    pub frames_sent: u64,
    pub send_failures: u64,
}

impl ServerStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            tick: self.tick.load(Ordering::Relaxed),
            players: self.players.load(Ordering::Relaxed),
            joins: self.joins.load(Ordering::Relaxed),
            leaves: self.leaves.load(Ordering::Relaxed),
            rejected_messages: self.rejected_messages.load(Ordering::Relaxed),
            frames_sent: self.frames_sent.load(Ordering::Relaxed),
            send_failures: self.send_failures.load(Ordering::Relaxed),
        }
    }
}
