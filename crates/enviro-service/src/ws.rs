//! WebSocket handler for real-time updates.
//!
//! Observers receive every [`HubEvent`] as a JSON text frame. The channel is
//! also a write path: a client may send a partial reading as JSON, which
//! goes through the same validate → update → broadcast path as a REST write
//! (the confirmation is the `reading-changed` event it receives back).

use std::sync::Arc;

use axum::{
    Router,
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::IntoResponse,
    routing::get,
};
use futures::{SinkExt, StreamExt};
use tracing::{debug, info, warn};

use enviro_core::HubEvent;

use crate::state::AppState;

/// Create the WebSocket router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/api/ws", get(ws_handler))
}

/// WebSocket upgrade handler.
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle a WebSocket connection.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    // Subscribe to events FIRST (before sending the snapshot) so nothing
    // published while the snapshot is in flight is missed.
    let mut rx = state.events_tx.subscribe();

    info!("WebSocket client connected");

    // Send the current reading so clients see state immediately.
    {
        let reading = state.store.lock().await.snapshot();
        let event = HubEvent::ReadingChanged { reading };
        if let Ok(json) = serde_json::to_string(&event) {
            if sender.send(Message::Text(json.into())).await.is_err() {
                info!("WebSocket client disconnected during initial snapshot");
                return;
            }
        }
    }

    debug!("sent initial snapshot to WebSocket client");

    // Forward broadcast events to the client.
    let mut send_task = tokio::spawn(async move {
        while let Ok(event) = rx.recv().await {
            let json = match serde_json::to_string(&event) {
                Ok(j) => j,
                Err(e) => {
                    warn!("failed to serialize event: {}", e);
                    continue;
                }
            };

            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    // Accept inbound writes (and keep-alive pings) from the client.
    let recv_state = Arc::clone(&state);
    let mut recv_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            match result {
                Ok(Message::Text(text)) => {
                    handle_client_write(&recv_state, text.as_str()).await;
                }
                Ok(Message::Close(_)) => break,
                Ok(Message::Ping(data)) => {
                    debug!("received ping");
                    // Pong is handled automatically by axum.
                    let _ = data;
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("WebSocket receive error: {}", e);
                    break;
                }
            }
        }
    });

    // Wait for either task to finish, then abort the other.
    tokio::select! {
        _ = &mut send_task => {
            recv_task.abort();
        },
        _ = &mut recv_task => {
            send_task.abort();
        },
    }

    info!("WebSocket client disconnected");
}

/// Apply a client-supplied partial reading.
async fn handle_client_write(state: &Arc<AppState>, text: &str) {
    let patch = match serde_json::from_str(text) {
        Ok(patch) => patch,
        Err(e) => {
            warn!("ignoring malformed WebSocket write: {}", e);
            return;
        }
    };

    if let Err(errors) = state.apply_update(&patch).await {
        let details: Vec<String> = errors.iter().map(ToString::to_string).collect();
        warn!("WebSocket write rejected: {}", details.join("; "));
    }
}
