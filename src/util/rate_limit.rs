//! Rate limiting utilities

use std::collections::BTreeMap;
use std::num::NonZeroU32;

use bytes::Bytes;
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};

/// Rate limiter type alias
pub type Limiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Create a rate limiter with the specified requests per second, `None` for 0
pub fn create_limiter(requests_per_second: u32) -> Option<Limiter> {
    NonZeroU32::new(requests_per_second).map(|rate| RateLimiter::direct(Quota::per_second(rate)))
}

/// Per-connection throttle for messages a newer one of the same kind fully replaces.
///
/// Over quota, frames are not dropped: the newest frame of each kind is held and
/// released once quota frees up, so the last value a client sent always arrives.
/// Movement toggles never pass through here.
pub struct InputThrottle {
    limiter: Option<Limiter>,
    held: BTreeMap<u8, Bytes>,
}

impl InputThrottle {
    pub fn new(requests_per_second: u32) -> Self {
        Self {
            limiter: create_limiter(requests_per_second),
            held: BTreeMap::new(),
        }
    }

    /// Returns the frame if it may be forwarded now; otherwise it replaces any
    /// held frame of the same kind.
    pub fn admit(&mut self, kind: u8, frame: Bytes) -> Option<Bytes> {
        let Some(limiter) = &self.limiter else {
            return Some(frame);
        };

        // An older held frame of this kind is now stale
        if !self.held.contains_key(&kind) && limiter.check().is_ok() {
            return Some(frame);
        }

        self.held.insert(kind, frame);
        None
    }

    pub fn has_held(&self) -> bool {
        !self.held.is_empty()
    }

    /// Waits for quota and releases one held frame, lowest kind first
    pub async fn release(&mut self) -> Option<Bytes> {
        if self.held.is_empty() {
            return None;
        }
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
        self.held.pop_first().map(|(_, frame)| frame)
    }
}
