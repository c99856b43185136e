//! Per-connection outbound handle
//!
//! The tick engine never touches a socket. Each player record holds a
//! [`Connection`] whose outbox feeds the connection's writer task. Sends are
//! fire-and-forget: the outbox is unbounded and a closed outbox only means the
//! socket is already going away, which surfaces later as a close event.

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::{mpsc, OwnedSemaphorePermit, Semaphore};
use uuid::Uuid;

/// Work item for a connection's writer task
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    /// One binary WebSocket frame
    Frame(Bytes),
    /// Send a close frame and stop writing
    Close,
}

/// Owning transport reference of a player; not part of replicated state
#[derive(Debug, Clone)]
pub struct Connection {
    id: Uuid,
    outbox: mpsc::UnboundedSender<Outbound>,
}

impl Connection {
    pub fn new(id: Uuid, outbox: mpsc::UnboundedSender<Outbound>) -> Self {
        Self { id, outbox }
    }

    /// Fresh connection with a random id, plus the receiving end of its outbox
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Outbound>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(Uuid::new_v4(), tx), rx)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Queues a frame. Returns false if the writer is gone.
    pub fn send(&self, frame: Bytes) -> bool {
        self.outbox.send(Outbound::Frame(frame)).is_ok()
    }

    pub fn close(&self) {
        let _ = self.outbox.send(Outbound::Close);
    }
}

/// Caps how many inbound frames one connection may have waiting for the engine.
///
/// The event queue is shared by every connection. A reader holds a
/// [`FrameTicket`] per queued frame and stops reading its socket when the
/// budget runs out; the engine frees the slot by dropping the ticket.
#[derive(Debug, Clone)]
pub struct FrameBudget {
    slots: Option<Arc<Semaphore>>,
}

impl FrameBudget {
    /// `max_queued` of 0 disables the cap
    pub fn new(max_queued: usize) -> Self {
        let slots = (max_queued > 0)
            .then(|| Arc::new(Semaphore::new(max_queued.min(Semaphore::MAX_PERMITS))));
        Self { slots }
    }

    /// Waits until this connection has fewer than `max_queued` frames in flight
    pub async fn reserve(&self) -> FrameTicket {
        match &self.slots {
            Some(slots) => FrameTicket(slots.clone().acquire_owned().await.ok()),
            None => FrameTicket::untracked(),
        }
    }
}

/// One reserved slot of a [`FrameBudget`], released on drop
#[derive(Debug, Default)]
pub struct FrameTicket(Option<OwnedSemaphorePermit>);

impl FrameTicket {
    /// Ticket not counted against any budget
    pub fn untracked() -> Self {
        Self(None)
    }
}
