//! Observer `WebSocket` endpoint.
//!
//! Clients connect to the configured path (default `/ws`). On upgrade the
//! connection is registered with the [`ConnectionHub`](crate::hub::ConnectionHub),
//! which queues an `INIT` snapshot; from then on every `SWITCH_UPDATE`
//! broadcast is queued as well.
//!
//! The socket is split. A writer task drains the connection's queue onto
//! the wire; the reader loop below handles inbound frames. Only
//! `TOGGLE_SWITCH` is acted on. Anything else, including frames that do not
//! decode, is logged and skipped without closing the connection.
//!
//! When the reader stops, the connection leaves the hub first and the
//! writer gets a short grace period to flush queued frames and answer the
//! close handshake before it is cancelled.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message as Frame, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use switchboard_types::{ConnectionId, Message};
use tracing::{debug, warn};

use crate::hub::Connection;
use crate::state::AppState;

/// How long a closing connection's writer may take to flush.
const WRITER_DRAIN: Duration = Duration::from_secs(1);

/// Upgrade an HTTP request to an observer connection.
pub async fn ws_switches(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_ws(socket, state))
}

/// Handle the `WebSocket` lifecycle from registration to unregistration.
async fn handle_ws(socket: WebSocket, state: Arc<AppState>) {
    let (connection, mut outbox) = Connection::channel(state.outbox_capacity);
    let conn_id = connection.id;

    if let Err(e) = state.hub.register(connection) {
        warn!(%conn_id, error = %e, "failed to register observer connection");
        return;
    }

    let (mut sink, mut stream) = socket.split();

    let mut writer = tokio::spawn(async move {
        while let Some(frame) = outbox.recv().await {
            if sink.send(Frame::Text(String::from(&*frame).into())).await.is_err() {
                debug!(%conn_id, "observer send failed");
                break;
            }
        }
        // Queue closed: either the reader finished or the hub reaped us.
        let _ = sink.close().await;
    });

    let writer_finished = loop {
        tokio::select! {
            _ = &mut writer => {
                debug!(%conn_id, "observer writer finished");
                break true;
            }
            frame = stream.next() => {
                match frame {
                    Some(Ok(Frame::Text(text))) => handle_frame(&state, conn_id, text.as_str().as_bytes()),
                    Some(Ok(Frame::Binary(bytes))) => handle_frame(&state, conn_id, &bytes),
                    Some(Ok(Frame::Close(_))) | None => {
                        debug!(%conn_id, "observer disconnected");
                        break false;
                    }
                    Some(Err(e)) => {
                        debug!(%conn_id, error = %e, "observer transport error");
                        break false;
                    }
                    // Ping/pong are answered by the protocol layer.
                    Some(Ok(_)) => {}
                }
            }
        }
    };

    // Dropping the hub's sender closes the queue, so the writer drains what
    // is left and sends its close frame.
    state.hub.unregister(conn_id);
    if !writer_finished && tokio::time::timeout(WRITER_DRAIN, &mut writer).await.is_err() {
        debug!(%conn_id, "observer writer did not drain in time");
        writer.abort();
    }
}

/// Act on one inbound frame.
fn handle_frame(state: &AppState, conn_id: ConnectionId, bytes: &[u8]) {
    let message = match switchboard_types::decode(bytes) {
        Ok(message) => message,
        Err(e) => {
            warn!(%conn_id, error = %e, "ignoring undecodable observer frame");
            return;
        }
    };

    match message {
        Message::ToggleRequest { switch_id } => match state.registry.toggle(switch_id.as_str()) {
            Ok(switch) => {
                debug!(%conn_id, switch_id = %switch.id, status = %switch.status, "toggle applied");
            }
            Err(e) => {
                warn!(%conn_id, %switch_id, error = %e, "toggle request rejected");
            }
        },
        other @ (Message::Init { .. } | Message::Update { .. }) => {
            debug!(%conn_id, kind = other.kind(), "ignoring server-only message from observer");
        }
    }
}
