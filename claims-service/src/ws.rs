//! WebSocket endpoint streaming claim events.

use axum::{
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::Response,
};
use std::ops::ControlFlow;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, error, warn};

use crate::{notify::ClaimEvent, service::AppState};

/// Route handler for `GET /ws`
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    // Subscribe before the upgrade so no event is missed after the handshake
    let events = state.notifier.subscribe();
    debug!(
        subscribers = state.notifier.subscriber_count(),
        "WebSocket upgrade requested"
    );
    ws.on_upgrade(move |socket| stream_events(socket, events))
}

async fn stream_events(mut socket: WebSocket, mut events: broadcast::Receiver<ClaimEvent>) {
    debug!("WebSocket client connected");

    loop {
        tokio::select! {
            received = events.recv() => match event_frame(received) {
                ControlFlow::Continue(Some(frame)) => {
                    if socket.send(frame).await.is_err() {
                        break;
                    }
                }
                ControlFlow::Continue(None) => {}
                ControlFlow::Break(()) => break,
            },
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }

    debug!("WebSocket client disconnected");
}

/// Turn a broadcast result into the frame to send. `Break` once the channel is closed.
fn event_frame(received: Result<ClaimEvent, RecvError>) -> ControlFlow<(), Option<Message>> {
    match received {
        Ok(event) => match serde_json::to_string(&event) {
            Ok(payload) => ControlFlow::Continue(Some(Message::Text(payload.into()))),
            Err(e) => {
                error!(error = %e, "failed to serialize claim event");
                ControlFlow::Continue(None)
            }
        },
        Err(RecvError::Lagged(skipped)) => {
            warn!(skipped, "WebSocket client lagging, dropped claim events");
            ControlFlow::Continue(None)
        }
        Err(RecvError::Closed) => ControlFlow::Break(()),
    }
}
