//! WebSocket upgrade handler

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use bytes::Bytes;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::game::ConnectionEvent;
use crate::util::rate_limit::InputThrottle;
use crate::ws::connection::{Connection, FrameBudget, Outbound};
use crate::ws::protocol::{ClientMessage, ProtocolError};

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState) {
    let (connection, outbox_rx) = Connection::channel();
    let connection_id = connection.id();

    info!(connection_id = %connection_id, "New WebSocket connection");

    if state
        .events
        .send(ConnectionEvent::Opened { connection })
        .await
        .is_err()
    {
        warn!(connection_id = %connection_id, "Tick engine stopped, dropping connection");
        return;
    }

    let (ws_sink, ws_stream) = socket.split();
    run_session(connection_id, ws_sink, ws_stream, outbox_rx, &state).await;

    // The engine removes the player and announces the leave on its next tick
    let _ = state
        .events
        .send(ConnectionEvent::Closed { connection_id })
        .await;

    info!(connection_id = %connection_id, "WebSocket connection closed");
}

/// Run the WebSocket session with read/write split. Ends when either side does.
async fn run_session(
    connection_id: Uuid,
    mut ws_sink: SplitSink<WebSocket, Message>,
    mut ws_stream: SplitStream<WebSocket>,
    mut outbox_rx: mpsc::UnboundedReceiver<Outbound>,
    state: &AppState,
) {
    // Writer task: outbox -> WebSocket
    let mut writer_handle = tokio::spawn(async move {
        while let Some(item) = outbox_rx.recv().await {
            match item {
                Outbound::Frame(frame) => {
                    if let Err(e) = ws_sink.send(Message::Binary(frame.to_vec())).await {
                        debug!(connection_id = %connection_id, error = %e, "WebSocket send failed");
                        break;
                    }
                }
                Outbound::Close => {
                    let _ = ws_sink.send(Message::Close(None)).await;
                    break;
                }
            }
        }
    });

    let mut throttle = InputThrottle::new(state.config.input_rate_limit);
    let budget = FrameBudget::new(state.config.max_queued_frames);
    let events = &state.events;

    // Reader loop: WebSocket -> tick engine
    let reader = async {
        loop {
            let payload = tokio::select! {
                Some(held) = throttle.release(), if throttle.has_held() => held,
                message = ws_stream.next() => match message {
                    Some(Ok(Message::Binary(payload))) => {
                        let payload = Bytes::from(payload);
                        match payload.first().copied() {
                            Some(kind) if ClientMessage::is_superseding_kind(kind) => {
                                match throttle.admit(kind, payload) {
                                    Some(payload) => payload,
                                    None => {
                                        debug!(connection_id = %connection_id, kind, "Input held until quota frees");
                                        continue;
                                    }
                                }
                            }
                            _ => payload,
                        }
                    }
                    Some(Ok(Message::Text(_))) => {
                        let violation = ConnectionEvent::Violation {
                            connection_id,
                            error: ProtocolError::TextFrame,
                        };
                        if events.send(violation).await.is_err() {
                            debug!(connection_id = %connection_id, "Event channel closed");
                            break;
                        }
                        continue;
                    }
                    Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => continue,
                    Some(Ok(Message::Close(_))) => {
                        info!(connection_id = %connection_id, "Client initiated close");
                        break;
                    }
                    Some(Err(e)) => {
                        debug!(connection_id = %connection_id, error = %e, "WebSocket error");
                        break;
                    }
                    None => break,
                },
            };

            // Stops reading this socket while its earlier frames still fill the queue
            let ticket = budget.reserve().await;
            let event = ConnectionEvent::Frame {
                connection_id,
                payload,
                ticket,
            };
            if events.send(event).await.is_err() {
                debug!(connection_id = %connection_id, "Event channel closed");
                break;
            }
        }
    };

    tokio::select! {
        _ = reader => {}
        _ = &mut writer_handle => {
            debug!(connection_id = %connection_id, "Writer finished");
        }
    }

    writer_handle.abort();
}
