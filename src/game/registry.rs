//! Player registry: identity assignment, staged intents and per-tick event sets

use std::collections::{BTreeMap, BTreeSet, HashMap};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::ws::connection::Connection;
use crate::ws::protocol::{ClientMessage, ProtocolError};

use super::physics::PhysicsSystem;
use super::player::Player;
use super::PlayerId;

/// Owns every connected player plus the join/leave/ping sets of the current tick.
///
/// Mutated only by the tick engine, which applies connection events between ticks.
pub struct PlayerRegistry {
    players: BTreeMap<PlayerId, Player>,
    by_connection: HashMap<Uuid, PlayerId>,
    next_id: PlayerId,
    rng: ChaCha8Rng,

    joined_ids: BTreeSet<PlayerId>,
    left_ids: BTreeSet<PlayerId>,
    pending_pings: BTreeMap<PlayerId, u32>,

    rejected_messages: u64,
}

impl PlayerRegistry {
    pub fn new(seed: u64) -> Self {
        Self {
            players: BTreeMap::new(),
            by_connection: HashMap::new(),
            next_id: 0,
            rng: ChaCha8Rng::seed_from_u64(seed),
            joined_ids: BTreeSet::new(),
            left_ids: BTreeSet::new(),
            pending_pings: BTreeMap::new(),
            rejected_messages: 0,
        }
    }

    /// Admits a transport: next id, random spawn and hue, no motion.
    ///
    /// Ids are never reused. Once the id space is spent the transport is
    /// closed and `None` returned.
    pub fn admit(&mut self, connection: Connection) -> Option<&Player> {
        let id = self.next_id;
        let Some(next_id) = id.checked_add(1) else {
            warn!(connection_id = %connection.id(), "Player ids exhausted, refusing connection");
            connection.close();
            return None;
        };
        self.next_id = next_id;

        let (position, direction, hue) = PhysicsSystem::generate_spawn(&mut self.rng);
        let player = Player::new(id, position, direction, hue, connection);

        info!(
            player_id = id,
            connection_id = %player.connection.id(),
            x = position.x,
            y = position.y,
            hue,
            "Player admitted"
        );

        self.by_connection.insert(player.connection.id(), id);
        self.joined_ids.insert(id);
        self.players.insert(id, player);
        self.players.get(&id)
    }

    /// Removes a player. A player that joins and leaves within the same tick
    /// window produces neither a join nor a leave broadcast.
    pub fn remove(&mut self, id: PlayerId) -> Option<Player> {
        let player = self.players.remove(&id)?;
        self.by_connection.remove(&player.connection.id());
        self.pending_pings.remove(&id);

        if !self.joined_ids.remove(&id) {
            self.left_ids.insert(id);
        }

        info!(player_id = id, "Player removed");
        Some(player)
    }

    pub fn remove_connection(&mut self, connection_id: Uuid) -> Option<Player> {
        let id = self.player_for(connection_id)?;
        self.remove(id)
    }

    pub fn player_for(&self, connection_id: Uuid) -> Option<PlayerId> {
        self.by_connection.get(&connection_id).copied()
    }

    /// Decodes one binary frame and stages it on the player. Violations count
    /// as rejections and close that player's transport only.
    pub fn on_inbound_message(&mut self, id: PlayerId, bytes: &[u8]) -> Result<(), ProtocolError> {
        let Some(player) = self.players.get_mut(&id) else {
            debug!(player_id = id, "Message for unknown player dropped");
            return Ok(());
        };

        if player.rejected {
            return Ok(());
        }

        match ClientMessage::decode(bytes) {
            Ok(ClientMessage::Moving { direction, start }) => {
                player.stage_moving(direction, start);
                Ok(())
            }
            Ok(ClientMessage::Turning { direction }) => {
                player.stage_turning(direction);
                Ok(())
            }
            Ok(ClientMessage::Ping { timestamp }) => {
                self.pending_pings.insert(id, timestamp);
                Ok(())
            }
            Err(error) => {
                self.reject(id, &error);
                Err(error)
            }
        }
    }

    /// Marks a protocol violation: counts it and closes the transport.
    pub fn reject(&mut self, id: PlayerId, error: &ProtocolError) {
        let Some(player) = self.players.get_mut(&id) else {
            return;
        };
        if player.rejected {
            return;
        }

        warn!(player_id = id, error = %error, "Protocol violation, closing connection");
        player.rejected = true;
        player.connection.close();
        self.rejected_messages += 1;
    }

    pub fn get(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(&id)
    }

    /// Players in ascending id order
    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    pub fn players_mut(&mut self) -> impl Iterator<Item = &mut Player> {
        self.players.values_mut()
    }

    pub fn contains(&self, id: PlayerId) -> bool {
        self.players.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn joined_ids(&self) -> &BTreeSet<PlayerId> {
        &self.joined_ids
    }

    pub fn left_ids(&self) -> &BTreeSet<PlayerId> {
        &self.left_ids
    }

    pub fn pending_pings(&self) -> &BTreeMap<PlayerId, u32> {
        &self.pending_pings
    }

    pub fn rejected_messages(&self) -> u64 {
        self.rejected_messages
    }

    /// Takes this tick's pings, leaving the set empty
    pub fn take_pings(&mut self) -> BTreeMap<PlayerId, u32> {
        std::mem::take(&mut self.pending_pings)
    }

    /// Clears the per-tick event sets after they were broadcast
    pub fn end_tick(&mut self) {
        self.joined_ids.clear();
        self.left_ids.clear();
        self.pending_pings.clear();
    }
}
