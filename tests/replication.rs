//! Tick engine scenarios driven through connection events

use std::sync::Arc;

use arena_server::config::Config;
use arena_server::game::{ConnectionEvent, Moving, ServerStats, TickEngine};
use arena_server::ws::connection::{Connection, FrameTicket, Outbound};
use arena_server::ws::protocol::{ClientMessage, ServerMessage};
use bytes::Bytes;
use tokio::sync::mpsc;
use uuid::Uuid;

const DT: f32 = 1.0 / 60.0;

struct Client {
    id: Uuid,
    rx: mpsc::UnboundedReceiver<Outbound>,
}

impl Client {
    fn received(&mut self) -> Vec<ServerMessage> {
        let mut out = Vec::new();
        while let Ok(item) = self.rx.try_recv() {
            match item {
                Outbound::Frame(frame) => out.push(ServerMessage::decode(&frame).unwrap()),
                Outbound::Close => break,
            }
        }
        out
    }

    fn was_closed(&mut self) -> bool {
        while let Ok(item) = self.rx.try_recv() {
            if item == Outbound::Close {
                return true;
            }
        }
        false
    }
}

struct Harness {
    engine: TickEngine,
    stats: Arc<ServerStats>,
    _events: mpsc::Sender<ConnectionEvent>,
}

impl Harness {
    fn new() -> Self {
        let config = Config {
            spawn_seed: Some(2024),
            ..Config::default()
        };
        let (events, rx) = mpsc::channel(16);
        let stats = Arc::new(ServerStats::default());
        Self {
            engine: TickEngine::new(&config, rx, stats.clone()),
            stats,
            _events: events,
        }
    }

    fn connect(&mut self) -> Client {
        let (connection, rx) = Connection::channel();
        let id = connection.id();
        self.engine.handle_event(ConnectionEvent::Opened { connection });
        Client { id, rx }
    }

    fn disconnect(&mut self, client: &Client) {
        self.engine.handle_event(ConnectionEvent::Closed {
            connection_id: client.id,
        });
    }

    fn send(&mut self, client: &Client, message: ClientMessage) {
        self.send_raw(client, message.encode());
    }

    fn send_raw(&mut self, client: &Client, payload: Vec<u8>) {
        self.engine.handle_event(ConnectionEvent::Frame {
            connection_id: client.id,
            payload: Bytes::from(payload),
            ticket: FrameTicket::untracked(),
        });
    }

    fn tick(&mut self) {
        self.engine.tick(DT);
    }
}

fn joined_ids(message: &ServerMessage) -> Vec<u32> {
    match message {
        ServerMessage::PlayerJoined(records) => records.iter().map(|r| r.id).collect(),
        other => panic!("expected joined batch, got {:?}", other),
    }
}

#[test]
fn first_and_second_joiners_see_the_right_rosters() {
    let mut h = Harness::new();

    let mut a = h.connect();
    h.tick();

    let to_a = a.received();
    assert_eq!(to_a.len(), 2);
    assert!(matches!(&to_a[0], ServerMessage::Hello(hello) if hello.id == 0));
    assert_eq!(joined_ids(&to_a[1]), vec![0]);

    let mut b = h.connect();
    h.tick();

    let to_b = b.received();
    assert_eq!(to_b.len(), 2);
    assert!(matches!(&to_b[0], ServerMessage::Hello(hello) if hello.id == 1));
    assert_eq!(joined_ids(&to_b[1]), vec![0, 1]);

    let to_a = a.received();
    assert_eq!(to_a.len(), 1);
    assert_eq!(joined_ids(&to_a[0]), vec![1]);
}

#[test]
fn hello_matches_roster_entry() {
    let mut h = Harness::new();
    let mut a = h.connect();
    h.tick();

    let to_a = a.received();
    let (ServerMessage::Hello(hello), ServerMessage::PlayerJoined(records)) = (&to_a[0], &to_a[1]) else {
        panic!("unexpected welcome: {:?}", to_a);
    };
    assert_eq!(records[0].x, hello.x);
    assert_eq!(records[0].y, hello.y);
    assert_eq!(records[0].direction, hello.direction);
    assert_eq!(records[0].hue, hello.hue);
    assert_eq!(records[0].moving, 0);
}

#[test]
fn moving_is_broadcast_to_everyone_including_the_mover() {
    let mut h = Harness::new();
    let mut a = h.connect();
    let mut b = h.connect();
    h.tick();
    a.received();
    b.received();

    h.send(&a, ClientMessage::Moving { direction: Moving::MovingForward, start: true });
    h.tick();

    for client in [&mut a, &mut b] {
        match client.received().as_slice() {
            [ServerMessage::PlayerMoved(records)] => {
                assert_eq!(records.len(), 1);
                assert_eq!(records[0].id, 0);
                assert_eq!(records[0].moving & 0b0001, 0b0001);
            }
            other => panic!("expected one moved batch, got {:?}", other),
        }
    }

    // Stopping is a change too
    h.send(&a, ClientMessage::Moving { direction: Moving::MovingForward, start: false });
    h.tick();
    match b.received().as_slice() {
        [ServerMessage::PlayerMoved(records)] => assert_eq!(records[0].moving, 0),
        other => panic!("expected one moved batch, got {:?}", other),
    }
}

#[test]
fn disconnect_is_announced_once() {
    let mut h = Harness::new();
    let a = h.connect();
    let mut b = h.connect();
    let mut c = h.connect();
    h.tick();
    b.received();
    c.received();

    h.disconnect(&a);
    h.tick();

    assert_eq!(b.received(), vec![ServerMessage::PlayerLeft { id: 0 }]);
    assert_eq!(c.received(), vec![ServerMessage::PlayerLeft { id: 0 }]);
    assert!(h.engine.registry().get(0).is_none());

    h.tick();
    assert!(b.received().is_empty());
}

#[test]
fn join_and_leave_between_ticks_is_never_broadcast() {
    let mut h = Harness::new();
    let mut a = h.connect();
    h.tick();
    a.received();

    let ghost = h.connect();
    h.disconnect(&ghost);
    h.tick();
    h.tick();

    assert!(a.received().is_empty());
    assert_eq!(h.engine.registry().len(), 1);

    // The ghost still consumed an id
    let mut c = h.connect();
    h.tick();
    assert!(matches!(&c.received()[0], ServerMessage::Hello(hello) if hello.id == 2));
}

#[test]
fn ping_is_echoed_unchanged() {
    let mut h = Harness::new();
    let mut a = h.connect();
    let mut b = h.connect();
    h.tick();
    a.received();
    b.received();

    h.send(&a, ClientMessage::Ping { timestamp: 0xDEAD_BEEF });
    h.tick();

    assert_eq!(a.received(), vec![ServerMessage::Pong { timestamp: 0xDEAD_BEEF }]);
    assert!(b.received().is_empty());
}

#[test]
fn per_connection_order_is_joins_then_leaves_then_moves() {
    let mut h = Harness::new();
    let mut a = h.connect();
    let b = h.connect();
    h.tick();
    a.received();

    h.send(&a, ClientMessage::Turning { direction: 1.0 });
    h.disconnect(&b);
    let _c = h.connect();
    h.tick();

    match a.received().as_slice() {
        [ServerMessage::PlayerJoined(joined), ServerMessage::PlayerLeft { id }, ServerMessage::PlayerMoved(moved)] => {
            assert_eq!(joined[0].id, 2);
            assert_eq!(*id, 1);
            assert_eq!(moved[0].id, 0);
            assert_eq!(moved[0].direction, 1.0);
        }
        other => panic!("unexpected order: {:?}", other),
    }
}

#[test]
fn malformed_frame_closes_only_the_offender() {
    let mut h = Harness::new();
    let mut a = h.connect();
    let mut b = h.connect();
    h.tick();
    a.received();
    b.received();

    // Joined-batch shaped frame from a client, one byte short
    h.send_raw(&a, vec![3, 1, 0, 0]);
    h.send(&b, ClientMessage::Ping { timestamp: 7 });
    h.tick();

    assert!(a.was_closed());
    assert_eq!(b.received(), vec![ServerMessage::Pong { timestamp: 7 }]);
    assert_eq!(h.stats.snapshot().rejected_messages, 1);

    // The transport close follows as a normal leave
    h.disconnect(&a);
    h.tick();
    assert_eq!(b.received(), vec![ServerMessage::PlayerLeft { id: 0 }]);
}

#[test]
fn intents_of_a_departed_player_are_discarded() {
    let mut h = Harness::new();
    let a = h.connect();
    let mut b = h.connect();
    h.tick();
    b.received();

    h.send(&a, ClientMessage::Moving { direction: Moving::TurningLeft, start: true });
    h.disconnect(&a);
    h.tick();

    assert_eq!(b.received(), vec![ServerMessage::PlayerLeft { id: 0 }]);
}
