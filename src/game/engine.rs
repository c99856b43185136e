//! Authoritative fixed-rate tick loop

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc::{self, error::TryRecvError};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::Config;

use super::physics::PhysicsSystem;
use super::registry::PlayerRegistry;
use super::replication::Replicator;
use super::{ConnectionEvent, PlayerId, ServerStats};

/// A tick taking this many nominal tick durations is reported as a stall
const STALL_FACTOR: u32 = 10;

/// What one tick did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    pub tick: u64,
    pub joined: usize,
    pub left: usize,
    pub moved: usize,
    pub pongs: usize,
}

/// Single writer of all player state.
///
/// Connection tasks only enqueue [`ConnectionEvent`]s; the engine applies them
/// at the start of each tick, then replicates and integrates.
pub struct TickEngine {
    registry: PlayerRegistry,
    replicator: Replicator,
    events_rx: mpsc::Receiver<ConnectionEvent>,
    stats: Arc<ServerStats>,

    tick: u64,
    tick_duration: Duration,
    max_tick_delta: Option<Duration>,
    total_joins: u64,
    total_leaves: u64,
}

impl TickEngine {
    pub fn new(
        config: &Config,
        events_rx: mpsc::Receiver<ConnectionEvent>,
        stats: Arc<ServerStats>,
    ) -> Self {
        let seed = config.spawn_seed.unwrap_or_else(rand::random);
        debug!(seed, "Spawn RNG seeded");

        Self {
            registry: PlayerRegistry::new(seed),
            replicator: Replicator::new(),
            events_rx,
            stats,
            tick: 0,
            tick_duration: config.tick_duration(),
            max_tick_delta: config.max_tick_delta,
            total_joins: 0,
            total_leaves: 0,
        }
    }

    pub fn registry(&self) -> &PlayerRegistry {
        &self.registry
    }

    pub fn current_tick(&self) -> u64 {
        self.tick
    }

    /// Run the authoritative tick loop until every event sender is gone
    pub async fn run(mut self) {
        info!(
            tick_ms = self.tick_duration.as_secs_f64() * 1000.0,
            max_tick_delta_ms = self.max_tick_delta.map(|d| d.as_millis() as u64),
            "Tick engine started"
        );

        let mut tick_interval = interval(self.tick_duration);
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let ticks_per_second = (1.0 / self.tick_duration.as_secs_f64()).round().max(1.0) as u64;
        let mut previous = Instant::now();

        loop {
            tick_interval.tick().await;

            let now = Instant::now();
            let elapsed = now.duration_since(previous);
            previous = now;

            let open = self.drain_events();
            let summary = self.tick(self.delta_time(elapsed));

            if summary.tick % ticks_per_second == 0 && !self.registry.is_empty() {
                debug!(
                    tick = summary.tick,
                    players = self.registry.len(),
                    joined = summary.joined,
                    left = summary.left,
                    moved = summary.moved,
                    "Tick"
                );
            }

            if !open {
                break;
            }
        }

        info!(tick = self.tick, "Tick engine stopped");
    }

    /// Seconds to integrate for a tick that started `elapsed` after the previous one
    pub fn delta_time(&self, elapsed: Duration) -> f32 {
        if elapsed > self.tick_duration * STALL_FACTOR {
            warn!(
                elapsed_ms = elapsed.as_millis() as u64,
                clamped = self.max_tick_delta.is_some(),
                "Tick loop stalled"
            );
        }

        match self.max_tick_delta {
            Some(max) => elapsed.min(max).as_secs_f32(),
            None => elapsed.as_secs_f32(),
        }
    }

    /// Apply every queued connection event. Returns false once all senders are dropped.
    pub fn drain_events(&mut self) -> bool {
        loop {
            match self.events_rx.try_recv() {
                Ok(event) => self.handle_event(event),
                Err(TryRecvError::Empty) => return true,
                Err(TryRecvError::Disconnected) => return false,
            }
        }
    }

    pub fn handle_event(&mut self, event: ConnectionEvent) {
        match event {
            ConnectionEvent::Opened { connection } => {
                self.registry.admit(connection);
            }
            ConnectionEvent::Frame {
                connection_id,
                payload,
                ticket,
            } => {
                if let Some(id) = self.registry.player_for(connection_id) {
                    if let Err(error) = self.registry.on_inbound_message(id, &payload) {
                        debug!(
                            connection_id = %connection_id,
                            player_id = id,
                            error = %error,
                            "Inbound frame rejected"
                        );
                    }
                }
                drop(ticket);
            }
            ConnectionEvent::Violation {
                connection_id,
                error,
            } => {
                if let Some(id) = self.registry.player_for(connection_id) {
                    self.registry.reject(id, &error);
                }
            }
            ConnectionEvent::Closed { connection_id } => {
                self.registry.remove_connection(connection_id);
            }
        }
    }

    /// One simulation and replication step of `dt` seconds
    pub fn tick(&mut self, dt: f32) -> TickSummary {
        self.tick += 1;

        let joined = self.registry.joined_ids().len();
        let left = self.registry.left_ids().len();

        // Emission order per connection: hello/roster, joins, leaves, moves
        self.replicator.welcome_joined(&self.registry);
        self.replicator.announce_joined(&self.registry);
        self.replicator.announce_left(&self.registry);

        let moved: Vec<PlayerId> = self
            .registry
            .players_mut()
            .filter_map(|player| player.reconcile().then_some(player.id))
            .collect();
        self.replicator.broadcast_moved(&self.registry, &moved);

        for player in self.registry.players_mut() {
            PhysicsSystem::integrate(player, dt);
        }

        let pings = self.registry.take_pings();
        self.replicator.send_pongs(&self.registry, &pings);

        self.registry.end_tick();
        self.total_joins += joined as u64;
        self.total_leaves += left as u64;
        self.publish_stats();

        TickSummary {
            tick: self.tick,
            joined,
            left,
            moved: moved.len(),
            pongs: pings.len(),
        }
    }

    fn publish_stats(&self) {
        let delivery = self.replicator.stats();
        let stats = &self.stats;

        stats.tick.store(self.tick, Ordering::Relaxed);
        stats.players.store(self.registry.len() as u64, Ordering::Relaxed);
        stats.joins.store(self.total_joins, Ordering::Relaxed);
        stats.leaves.store(self.total_leaves, Ordering::Relaxed);
        stats
            .rejected_messages
            .store(self.registry.rejected_messages(), Ordering::Relaxed);
        stats.frames_sent.store(delivery.frames_sent, Ordering::Relaxed);
        stats.send_failures.store(delivery.send_failures, Ordering::Relaxed);
    }
}
