//! WebSocket protocol message definitions
//! These are the wire records for client-server communication. All of them are
//! little-endian, tightly packed, and start with a one-byte kind tag (except the
//! per-player record that lives inside batch messages).

use bytes::Bytes;

use crate::codec::{verify_batch, verify_exact};
use crate::game::player::Moving;
use crate::game::PlayerId;
use crate::wire_struct;

/// Leading tag of every message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageKind {
    Ping = 0,
    Pong = 1,
    Hello = 2,
    PlayerJoined = 3,
    PlayerLeft = 4,
    PlayerMoved = 5,
    PlayerMoving = 6,
    PlayerTurning = 7,
}

impl MessageKind {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Ping),
            1 => Some(Self::Pong),
            2 => Some(Self::Hello),
            3 => Some(Self::PlayerJoined),
            4 => Some(Self::PlayerLeft),
            5 => Some(Self::PlayerMoved),
            6 => Some(Self::PlayerMoving),
            7 => Some(Self::PlayerTurning),
            _ => None,
        }
    }
}

wire_struct! {
    /// Round-trip timing; `Ping` from the client is echoed back as `Pong` unchanged
    pub struct PingPongStruct => PingPong {
        kind: U8,
        /// Client clock in milliseconds, opaque to the server
        timestamp: U32,
    }
}

wire_struct! {
    /// Sent once per connection with the identity the server assigned
    pub struct HelloStruct => Hello {
        kind: U8,
        id: U32,
        x: F32,
        y: F32,
        direction: F32,
        hue: U8,
    }
}

wire_struct! {
    pub struct PlayerLeftStruct => PlayerLeft {
        kind: U8,
        id: U32,
    }
}

wire_struct! {
    /// Toggles one movement bit; `direction` is a `Moving` enumerant
    pub struct PlayerMovingStruct => PlayerMoving {
        kind: U8,
        direction: U8,
        /// 1 = begin, 0 = end
        start: U8,
    }
}

wire_struct! {
    /// Absolute heading in radians, client-authoritative
    pub struct PlayerTurningStruct => PlayerTurning {
        kind: U8,
        direction: F32,
    }
}

wire_struct! {
    /// Full replicated state of one player, element of joined/moved batches
    pub struct PlayerStruct => PlayerRecord {
        id: U32,
        x: F32,
        y: F32,
        hue: U8,
        direction: F32,
        moving: U8,
    }
}

wire_struct! {
    /// Prefix of batch messages, followed by `count` player records
    pub struct BatchHeaderStruct => BatchHeader {
        kind: U8,
        count: U16,
    }
}

impl PingPongStruct {
    pub fn verify_ping(buf: &[u8]) -> bool {
        verify_exact(buf, Self::SIZE, &Self::kind, MessageKind::Ping as u8)
    }

    pub fn verify_pong(buf: &[u8]) -> bool {
        verify_exact(buf, Self::SIZE, &Self::kind, MessageKind::Pong as u8)
    }
}

impl HelloStruct {
    pub fn verify(buf: &[u8]) -> bool {
        verify_exact(buf, Self::SIZE, &Self::kind, MessageKind::Hello as u8)
    }
}

impl PlayerLeftStruct {
    pub fn verify(buf: &[u8]) -> bool {
        verify_exact(buf, Self::SIZE, &Self::kind, MessageKind::PlayerLeft as u8)
    }
}

impl PlayerMovingStruct {
    pub fn verify(buf: &[u8]) -> bool {
        verify_exact(buf, Self::SIZE, &Self::kind, MessageKind::PlayerMoving as u8)
    }
}

impl PlayerTurningStruct {
    pub fn verify(buf: &[u8]) -> bool {
        verify_exact(buf, Self::SIZE, &Self::kind, MessageKind::PlayerTurning as u8)
    }
}

impl BatchHeaderStruct {
    pub fn verify_joined(buf: &[u8]) -> bool {
        verify_batch(
            buf,
            Self::SIZE,
            PlayerStruct::SIZE,
            &Self::kind,
            MessageKind::PlayerJoined as u8,
        )
    }

    pub fn verify_moved(buf: &[u8]) -> bool {
        verify_batch(
            buf,
            Self::SIZE,
            PlayerStruct::SIZE,
            &Self::kind,
            MessageKind::PlayerMoved as u8,
        )
    }

    /// Records following the header. Never reads past the buffer even if `count` lies;
    /// a buffer shorter than the header yields no records.
    pub fn records(buf: &[u8]) -> Vec<PlayerRecord> {
        if buf.len() < Self::SIZE {
            return Vec::new();
        }

        let available = buf.len().saturating_sub(Self::SIZE) / PlayerStruct::SIZE;
        let count = (Self::count.read(buf) as usize).min(available);

        buf[Self::SIZE..]
            .chunks_exact(PlayerStruct::SIZE)
            .take(count)
            .map(PlayerStruct::read)
            .collect()
    }
}

/// Protocol violations; the offending connection is closed
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProtocolError {
    #[error("text frames are not part of the protocol")]
    TextFrame,

    #[error("unexpected binary message ({len} bytes, kind {kind:?})")]
    UnexpectedMessage { len: usize, kind: Option<u8> },

    #[error("invalid moving direction {0}")]
    InvalidMovingDirection(u8),

    #[error("heading is not finite")]
    NonFiniteHeading,
}

/// Messages sent from client to server
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClientMessage {
    Moving { direction: Moving, start: bool },
    Turning { direction: f32 },
    Ping { timestamp: u32 },
}

impl ClientMessage {
    /// Dispatches on the verify predicates in priority order: moving, turning, ping.
    pub fn decode(buf: &[u8]) -> Result<Self, ProtocolError> {
        if PlayerMovingStruct::verify(buf) {
            let msg = PlayerMovingStruct::read(buf);
            let direction = Moving::from_u8(msg.direction)
                .ok_or(ProtocolError::InvalidMovingDirection(msg.direction))?;
            Ok(Self::Moving {
                direction,
                start: msg.start != 0,
            })
        } else if PlayerTurningStruct::verify(buf) {
            let direction = PlayerTurningStruct::direction.read(buf);
            if !direction.is_finite() {
                return Err(ProtocolError::NonFiniteHeading);
            }
            Ok(Self::Turning { direction })
        } else if PingPongStruct::verify_ping(buf) {
            Ok(Self::Ping {
                timestamp: PingPongStruct::timestamp.read(buf),
            })
        } else {
            Err(ProtocolError::UnexpectedMessage {
                len: buf.len(),
                kind: buf.first().copied(),
            })
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        match *self {
            Self::Moving { direction, start } => PlayerMovingStruct::encode(&PlayerMoving {
                kind: MessageKind::PlayerMoving as u8,
                direction: direction as u8,
                start: start as u8,
            }),
            Self::Turning { direction } => PlayerTurningStruct::encode(&PlayerTurning {
                kind: MessageKind::PlayerTurning as u8,
                direction,
            }),
            Self::Ping { timestamp } => PingPongStruct::encode(&PingPong {
                kind: MessageKind::Ping as u8,
                timestamp,
            }),
        }
    }

    /// Whether a newer message of the same kind fully replaces this one,
    /// so only the newest needs to reach the engine under rate limiting
    pub fn is_superseding_kind(kind: u8) -> bool {
        kind == MessageKind::PlayerTurning as u8 || kind == MessageKind::Ping as u8
    }
}

/// Messages sent from server to client
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    Hello(Hello),
    PlayerJoined(Vec<PlayerRecord>),
    PlayerLeft { id: PlayerId },
    PlayerMoved(Vec<PlayerRecord>),
    Pong { timestamp: u32 },
}

impl ServerMessage {
    /// Client-side dispatch, same order the browser client checks in
    pub fn decode(buf: &[u8]) -> Result<Self, ProtocolError> {
        if HelloStruct::verify(buf) {
            Ok(Self::Hello(HelloStruct::read(buf)))
        } else if BatchHeaderStruct::verify_joined(buf) {
            Ok(Self::PlayerJoined(BatchHeaderStruct::records(buf)))
        } else if BatchHeaderStruct::verify_moved(buf) {
            Ok(Self::PlayerMoved(BatchHeaderStruct::records(buf)))
        } else if PlayerLeftStruct::verify(buf) {
            Ok(Self::PlayerLeft {
                id: PlayerLeftStruct::id.read(buf),
            })
        } else if PingPongStruct::verify_pong(buf) {
            Ok(Self::Pong {
                timestamp: PingPongStruct::timestamp.read(buf),
            })
        } else {
            Err(ProtocolError::UnexpectedMessage {
                len: buf.len(),
                kind: buf.first().copied(),
            })
        }
    }
}

pub fn encode_hello(hello: &Hello) -> Bytes {
    Bytes::from(HelloStruct::encode(&Hello {
        kind: MessageKind::Hello as u8,
        ..*hello
    }))
}

pub fn encode_player_left(id: PlayerId) -> Bytes {
    Bytes::from(PlayerLeftStruct::encode(&PlayerLeft {
        kind: MessageKind::PlayerLeft as u8,
        id,
    }))
}

pub fn encode_pong(timestamp: u32) -> Bytes {
    Bytes::from(PingPongStruct::encode(&PingPong {
        kind: MessageKind::Pong as u8,
        timestamp,
    }))
}

/// Encodes a joined/moved batch. More than `u16::MAX` records are split across
/// several consecutive messages; an empty slice still yields one empty batch.
pub fn encode_batch(kind: MessageKind, records: &[PlayerRecord]) -> Vec<Bytes> {
    if records.is_empty() {
        return vec![encode_batch_chunk(kind, records)];
    }

    records
        .chunks(u16::MAX as usize)
        .map(|chunk| encode_batch_chunk(kind, chunk))
        .collect()
}

fn encode_batch_chunk(kind: MessageKind, records: &[PlayerRecord]) -> Bytes {
    let mut buf = vec![0u8; BatchHeaderStruct::SIZE + records.len() * PlayerStruct::SIZE];

    BatchHeaderStruct::write(
        &mut buf,
        &BatchHeader {
            kind: kind as u8,
            count: records.len() as u16,
        },
    );

    for (record, slot) in records
        .iter()
        .zip(buf[BatchHeaderStruct::SIZE..].chunks_exact_mut(PlayerStruct::SIZE))
    {
        PlayerStruct::write(slot, record);
    }

    Bytes::from(buf)
}
