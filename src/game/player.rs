//! Authoritative player record and its staged intents

use crate::util::vector::Vector2;
use crate::ws::connection::Connection;
use crate::ws::protocol::{Hello, PlayerRecord};

use super::PlayerId;

/// The four independently toggled motion directions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Moving {
    MovingForward = 0,
    MovingBackward = 1,
    TurningLeft = 2,
    TurningRight = 3,
}

impl Moving {
    pub const ALL: [Moving; 4] = [
        Moving::MovingForward,
        Moving::MovingBackward,
        Moving::TurningLeft,
        Moving::TurningRight,
    ];

    pub fn from_u8(value: u8) -> Option<Self> {
        Self::ALL.get(value as usize).copied()
    }

    pub const fn bit(self) -> u8 {
        1 << self as u8
    }
}

/// Bitmask over [`Moving`]. Opposing bits may be set together; they cancel out
/// during integration instead of being rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MovingMask(u8);

impl MovingMask {
    pub const EMPTY: MovingMask = MovingMask(0);

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn contains(self, moving: Moving) -> bool {
        self.0 & moving.bit() != 0
    }

    pub fn set(&mut self, moving: Moving, on: bool) {
        if on {
            self.0 |= moving.bit();
        } else {
            self.0 &= !moving.bit();
        }
    }

    pub fn with(mut self, moving: Moving) -> Self {
        self.set(moving, true);
        self
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

/// Player state in the world (authoritative)
#[derive(Debug, Clone)]
pub struct Player {
    pub id: PlayerId,
    pub position: Vector2,
    /// Heading in radians
    pub direction: f32,
    pub moving: MovingMask,
    /// Cosmetic, 0..=255 on the wire
    pub hue: u8,

    // Staged by inbound messages, committed at the next tick boundary
    pub pending_moving: MovingMask,
    pub pending_direction: f32,
    pub turned: bool,

    /// Set once the connection broke protocol; later frames are ignored
    pub rejected: bool,

    pub connection: Connection,
}

impl Player {
    pub fn new(
        id: PlayerId,
        position: Vector2,
        direction: f32,
        hue: u8,
        connection: Connection,
    ) -> Self {
        Self {
            id,
            position,
            direction,
            moving: MovingMask::EMPTY,
            hue,
            pending_moving: MovingMask::EMPTY,
            pending_direction: direction,
            turned: false,
            rejected: false,
            connection,
        }
    }

    pub fn stage_moving(&mut self, moving: Moving, start: bool) {
        self.pending_moving.set(moving, start);
    }

    pub fn stage_turning(&mut self, direction: f32) {
        self.pending_direction = direction;
        self.turned = true;
    }

    /// Commits staged intents. Returns true if the motion bitmask or heading
    /// changed and the player must appear in this tick's moved batch.
    pub fn reconcile(&mut self) -> bool {
        let moved = self.pending_moving != self.moving
            || (self.turned && self.pending_direction != self.direction);

        self.moving = self.pending_moving;
        if self.turned {
            self.direction = self.pending_direction;
            self.turned = false;
        }

        moved
    }

    pub fn record(&self) -> PlayerRecord {
        PlayerRecord {
            id: self.id,
            x: self.position.x,
            y: self.position.y,
            hue: self.hue,
            direction: self.direction,
            moving: self.moving.bits(),
        }
    }

    pub fn hello(&self) -> Hello {
        Hello {
            kind: 0,
            id: self.id,
            x: self.position.x,
            y: self.position.y,
            direction: self.direction,
            hue: self.hue,
        }
    }
}
