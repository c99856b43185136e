//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::game::{DEFAULT_SERVER_FPS, DEFAULT_SERVER_PORT};

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Simulation ticks per second
    pub server_fps: u32,
    /// Upper bound on a single tick's delta time; unset means real elapsed time
    pub max_tick_delta: Option<Duration>,
    /// Per-connection turning/ping frames per second, 0 disables
    pub input_rate_limit: u32,
    /// Capacity of the connection -> engine event queue
    pub event_queue_capacity: usize,
    /// Frames one connection may have waiting in the event queue, 0 disables
    pub max_queued_frames: usize,
    /// Seed for spawn positions and hues; random if unset
    pub spawn_seed: Option<u64>,

    /// Allowed client origins for CORS; empty means any
    pub client_origins: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_SERVER_PORT)),
            log_level: "info".to_string(),
            server_fps: DEFAULT_SERVER_FPS,
            max_tick_delta: None,
            input_rate_limit: 240,
            event_queue_capacity: 4096,
            max_queued_frames: 64,
            spawn_seed: None,
            client_origins: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        // Hosting platforms provide PORT, fall back to SERVER_ADDR or default
        let server_addr = match (lookup("PORT"), lookup("SERVER_ADDR")) {
            (Some(port), _) => format!("0.0.0.0:{}", port)
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,
            (None, Some(addr)) => addr.parse().map_err(|_| ConfigError::InvalidAddress)?,
            (None, None) => defaults.server_addr,
        };

        let server_fps = parse(&lookup, "SERVER_FPS")?.unwrap_or(defaults.server_fps);
        if !(1..=1000).contains(&server_fps) {
            return Err(ConfigError::Invalid {
                name: "SERVER_FPS",
                value: server_fps.to_string(),
            });
        }

        let event_queue_capacity =
            parse(&lookup, "EVENT_QUEUE_CAPACITY")?.unwrap_or(defaults.event_queue_capacity);
        if event_queue_capacity == 0 {
            return Err(ConfigError::Invalid {
                name: "EVENT_QUEUE_CAPACITY",
                value: "0".to_string(),
            });
        }

        let client_origins = lookup("CLIENT_ORIGIN")
            .map(|origins| {
                origins
                    .split(',')
                    .map(str::trim)
                    .filter(|origin| !origin.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            server_addr,
            log_level: lookup("LOG_LEVEL").unwrap_or(defaults.log_level),
            server_fps,
            max_tick_delta: parse::<u64>(&lookup, "MAX_TICK_DELTA_MS")?.map(Duration::from_millis),
            input_rate_limit: parse(&lookup, "INPUT_RATE_LIMIT")?.unwrap_or(defaults.input_rate_limit),
            event_queue_capacity,
            max_queued_frames: parse(&lookup, "MAX_QUEUED_FRAMES")?.unwrap_or(defaults.max_queued_frames),
            spawn_seed: parse(&lookup, "SPAWN_SEED")?,
            client_origins,
        })
    }

    /// Nominal duration of one tick
    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.server_fps as f64)
    }
}

fn parse<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<T>, ConfigError> {
    match lookup(name) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { name, value }),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid server address format")]
    InvalidAddress,

    #[error("Invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}
