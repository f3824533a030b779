//! WebSocket handler — relays frames between one client and the prop actor.
//!
//! DESIGN
//! ======
//! On upgrade, generates a client ID, registers a bounded outbound channel
//! with the actor, and enters a `select!` loop:
//! - Incoming client text → forwarded to the actor verbatim
//! - Frames from the actor → written to the socket
//!
//! The actor owns all parsing and dispatch. This task only moves bytes.

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;

use super::AppState;
use crate::hub::CLIENT_CHANNEL_CAPACITY;

pub async fn handle_ws(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| run_ws(socket, state))
}

async fn run_ws(mut socket: WebSocket, state: AppState) {
    let client_id = Uuid::new_v4();
    let (client_tx, mut client_rx) = mpsc::channel(CLIENT_CHANNEL_CAPACITY);
    if !state.handle.connect(client_id, client_tx).await {
        return;
    }
    info!(%client_id, prop_id = %state.prop_id, "ws: client connected");

    loop {
        tokio::select! {
            msg = socket.recv() => {
                let Some(Ok(msg)) = msg else { break };
                match msg {
                    Message::Text(text) => state.handle.client_text(text.as_str().to_owned()).await,
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            frame = client_rx.recv() => {
                let Some(frame) = frame else { break };
                if socket.send(Message::text(frame.to_string())).await.is_err() {
                    debug!(%client_id, "ws: send failed");
                    break;
                }
            }
        }
    }

    state.handle.disconnect(client_id).await;
    info!(%client_id, "ws: client disconnected");
}

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;
