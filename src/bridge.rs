//! Room Controller bridge — a reconnecting WebSocket client.
//!
//! DESIGN
//! ======
//! One outbound connection per prop, identified by `prop_id`. On every
//! (re)connect the bridge announces `prop_online` and re-sends the latest
//! known changes so the controller's view is current. Changes from the
//! runtime are forwarded fire-and-forget and merged into that latest view;
//! the merged view is re-sent periodically as a resync.
//!
//! Commands are executed through the prop handle. Each command carrying a
//! `requestId` gets exactly one `cmd_ack`, no-op or not.
//!
//! LIFECYCLE
//! =========
//! 1. Connect → `prop_online` → latest changes
//! 2. Disconnect or connect failure → exponential backoff, forever
//! 3. Shutdown → `prop_offline` (if connected) → close → no reconnect

use std::time::Duration;

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, interval_at};
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, warn};

use crate::frame::{RoomCommand, RoomOutbound, parse_room_command};
use crate::runtime::PropHandle;

const BACKOFF_INITIAL: Duration = Duration::from_secs(2);
const BACKOFF_MAX: Duration = Duration::from_secs(30);
const BACKOFF_FACTOR: f64 = 1.5;

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

// =============================================================================
// BACKOFF
// =============================================================================

/// Reconnect delay: grows by `factor` per failed wait, capped at `max`.
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    factor: f64,
    current: Duration,
}

impl Backoff {
    #[must_use]
    pub fn new(initial: Duration, max: Duration, factor: f64) -> Self {
        Self { initial, max, factor, current: initial }
    }

    /// The delay to wait now; the following one grows.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = self.current.mul_f64(self.factor).min(self.max);
        delay
    }

    pub fn reset(&mut self) {
        self.current = self.initial;
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(BACKOFF_INITIAL, BACKOFF_MAX, BACKOFF_FACTOR)
    }
}

// =============================================================================
// CONFIG
// =============================================================================

#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub url: String,
    pub prop_id: String,
    /// Period of the full-state resync.
    pub resync: Duration,
    pub backoff: Backoff,
}

impl BridgeConfig {
    #[must_use]
    pub fn new(url: impl Into<String>, prop_id: impl Into<String>, resync: Duration) -> Self {
        Self { url: url.into(), prop_id: prop_id.into(), resync, backoff: Backoff::default() }
    }
}

// =============================================================================
// TASK
// =============================================================================

enum SessionEnd {
    Disconnected,
    Shutdown,
}

/// Spawn the bridge. It stops once `shutdown` turns true or its sender drops.
pub fn spawn(
    config: BridgeConfig,
    handle: PropHandle,
    updates: mpsc::Receiver<Value>,
    shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(run(config, handle, updates, shutdown))
}

async fn run(
    mut config: BridgeConfig,
    handle: PropHandle,
    mut updates: mpsc::Receiver<Value>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut latest: Option<Value> = None;
    loop {
        let connected = tokio::select! {
            result = connect_async(config.url.as_str()) => result,
            () = shutdown_requested(&mut shutdown) => break,
        };
        match connected {
            Ok((stream, _)) => {
                config.backoff.reset();
                info!(url = %config.url, prop_id = %config.prop_id, "bridge: connected");
                match session(stream, &config, &handle, &mut updates, &mut shutdown, &mut latest).await {
                    SessionEnd::Shutdown => break,
                    SessionEnd::Disconnected => warn!(url = %config.url, "bridge: disconnected"),
                }
            }
            Err(e) => warn!(url = %config.url, error = %e, "bridge: connect failed"),
        }

        let delay = config.backoff.next_delay();
        info!(delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX), "bridge: reconnecting");
        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);
        loop {
            tokio::select! {
                () = &mut sleep => break,
                Some(changes) = updates.recv() => merge(&mut latest, changes),
                () = shutdown_requested(&mut shutdown) => return,
            }
        }
    }
    info!("bridge: stopped");
}

async fn session(
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    config: &BridgeConfig,
    handle: &PropHandle,
    updates: &mut mpsc::Receiver<Value>,
    shutdown: &mut watch::Receiver<bool>,
    latest: &mut Option<Value>,
) -> SessionEnd {
    let (mut sink, mut source) = stream.split();
    if send(&mut sink, &RoomOutbound::online(&config.prop_id)).await.is_err() {
        return SessionEnd::Disconnected;
    }
    if let Some(changes) = latest.clone() {
        let _ = send(&mut sink, &RoomOutbound::update(&config.prop_id, changes)).await;
    }

    let mut resync = interval_at(Instant::now() + config.resync, config.resync);
    loop {
        tokio::select! {
            () = shutdown_requested(shutdown) => {
                let _ = send(&mut sink, &RoomOutbound::offline(&config.prop_id)).await;
                let _ = sink.close().await;
                return SessionEnd::Shutdown;
            }
            Some(changes) = updates.recv() => {
                merge(latest, changes.clone());
                if let Err(e) = send(&mut sink, &RoomOutbound::update(&config.prop_id, changes)).await {
                    debug!(error = %e, "bridge: update not sent");
                }
            }
            _ = resync.tick() => {
                if let Some(changes) = latest.clone() {
                    let _ = send(&mut sink, &RoomOutbound::update(&config.prop_id, changes)).await;
                }
            }
            msg = source.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    if let Some(command) = parse_room_command(text.as_str()) {
                        execute(&mut sink, config, handle, command).await;
                    }
                }
                Some(Ok(Message::Close(_))) | None => return SessionEnd::Disconnected,
                Some(Err(e)) => {
                    warn!(error = %e, "bridge: socket error");
                    return SessionEnd::Disconnected;
                }
                Some(Ok(_)) => {}
            }
        }
    }
}

async fn execute(sink: &mut WsSink, config: &BridgeConfig, handle: &PropHandle, command: RoomCommand) {
    if !command.is_for(&config.prop_id) {
        debug!(command = %command.command, target = ?command.prop_id, "bridge: command for another prop");
        return;
    }
    let request_id = command.request_id.clone();
    let name = command.command.clone();
    let result = handle.room_command(command).await.map_err(|e| e.to_string());
    match &result {
        Ok(()) => info!(command = %name, "bridge: command done"),
        Err(message) => warn!(command = %name, error = %message, "bridge: command failed"),
    }
    if let Some(request_id) = request_id {
        if let Err(e) = send(sink, &RoomOutbound::ack(request_id, result)).await {
            warn!(error = %e, "bridge: ack not sent");
        }
    }
}

async fn send(sink: &mut WsSink, message: &RoomOutbound) -> Result<(), tungstenite::Error> {
    sink.send(Message::text(message.to_text())).await
}

/// Resolves once shutdown is requested or the sender is gone.
async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}

/// Fold new changes into the cumulative view. Objects merge field-wise.
fn merge(latest: &mut Option<Value>, changes: Value) {
    match (latest, changes) {
        (Some(Value::Object(current)), Value::Object(fields)) => current.extend(fields),
        (slot, changes) => *slot = Some(changes),
    }
}

#[cfg(test)]
#[path = "bridge_test.rs"]
mod tests;
