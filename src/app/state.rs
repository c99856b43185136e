//! Application state shared across routes

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;

use crate::config::Config;
use crate::game::{ConnectionEvent, ServerStats, TickEngine};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// Connection tasks -> tick engine
    pub events: mpsc::Sender<ConnectionEvent>,
    pub stats: Arc<ServerStats>,
    pub started_at: Instant,
}

impl AppState {
    /// Builds the state together with the engine that consumes its events.
    /// The engine stops once every clone of the state is dropped.
    pub fn new(config: Config) -> (Self, TickEngine) {
        let config = Arc::new(config);
        let stats = Arc::new(ServerStats::default());

        let (events, events_rx) = mpsc::channel(config.event_queue_capacity);
        let engine = TickEngine::new(&config, events_rx, stats.clone());

        let state = Self {
            config,
            events,
            stats,
            started_at: Instant::now(),
        };

        (state, engine)
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
