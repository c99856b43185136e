//! Per-audience batching and dispatch of join/leave/move messages

use std::collections::BTreeMap;

use bytes::Bytes;
use tracing::debug;

use crate::ws::protocol::{encode_batch, encode_hello, encode_player_left, encode_pong, MessageKind, PlayerRecord};

use super::player::Player;
use super::registry::PlayerRegistry;
use super::PlayerId;

/// Delivery counters, cumulative over the server lifetime
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryStats {
    pub frames_sent: u64,
    pub send_failures: u64,
}

/// Encodes each broadcast once and hands the shared bytes to every recipient.
///
/// Connections already rejected for a protocol violation are skipped; their
/// writer is closing and the close event removes them on a later tick.
#[derive(Debug, Default)]
pub struct Replicator {
    stats: DeliveryStats,
}

impl Replicator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> DeliveryStats {
        self.stats
    }

    fn send(&mut self, player: &Player, frame: Bytes) {
        if player.rejected {
            return;
        }

        if player.connection.send(frame) {
            self.stats.frames_sent += 1;
        } else {
            // Closed socket; its close event is already on the way
            self.stats.send_failures += 1;
            debug!(player_id = player.id, "Send to closed connection dropped");
        }
    }

    fn send_all(&mut self, player: &Player, frames: &[Bytes]) {
        for frame in frames {
            self.send(player, frame.clone());
        }
    }

    /// `Hello` followed by the full roster, to every connection admitted this tick
    pub fn welcome_joined(&mut self, registry: &PlayerRegistry) {
        if registry.joined_ids().is_empty() {
            return;
        }

        let roster: Vec<PlayerRecord> = registry.players().map(Player::record).collect();
        let snapshot = encode_batch(MessageKind::PlayerJoined, &roster);

        for id in registry.joined_ids() {
            let Some(player) = registry.get(*id) else {
                continue;
            };
            self.send(player, encode_hello(&player.hello()));
            self.send_all(player, &snapshot);
        }
    }

    /// Records of this tick's joiners, to connections that existed before
    pub fn announce_joined(&mut self, registry: &PlayerRegistry) {
        let joined = registry.joined_ids();
        if joined.is_empty() {
            return;
        }

        let records: Vec<PlayerRecord> = joined
            .iter()
            .filter_map(|id| registry.get(*id))
            .map(Player::record)
            .collect();
        let frames = encode_batch(MessageKind::PlayerJoined, &records);

        for player in registry.players().filter(|p| !joined.contains(&p.id)) {
            self.send_all(player, &frames);
        }
    }

    /// One `PlayerLeft` per departed id, to every remaining connection
    pub fn announce_left(&mut self, registry: &PlayerRegistry) {
        if registry.left_ids().is_empty() {
            return;
        }

        let frames: Vec<Bytes> = registry
            .left_ids()
            .iter()
            .map(|id| encode_player_left(*id))
            .collect();

        for player in registry.players() {
            self.send_all(player, &frames);
        }
    }

    /// Full state of every moved player, to every connection including the movers
    pub fn broadcast_moved(&mut self, registry: &PlayerRegistry, moved: &[PlayerId]) {
        if moved.is_empty() {
            return;
        }

        let records: Vec<PlayerRecord> = moved
            .iter()
            .filter_map(|id| registry.get(*id))
            .map(Player::record)
            .collect();
        let frames = encode_batch(MessageKind::PlayerMoved, &records);

        for player in registry.players() {
            self.send_all(player, &frames);
        }
    }

    /// Echoes each pending ping back to its own connection
    pub fn send_pongs(&mut self, registry: &PlayerRegistry, pings: &BTreeMap<PlayerId, u32>) {
        for (id, timestamp) in pings {
            if let Some(player) = registry.get(*id) {
                self.send(player, encode_pong(*timestamp));
            }
        }
    }
}
