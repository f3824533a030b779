//! Runtime — the single actor task that owns a prop's state machine.
//!
//! DESIGN
//! ======
//! Every mutation is serialized through one task. Three sources feed it:
//! - Control messages from WebSocket clients and the Room Controller bridge,
//!   sent through a `PropHandle`.
//! - Decoded hardware input on the input channel.
//! - The machine's own earliest timer deadline.
//!
//! Each wakeup first fires due timers at their scheduled instants, then
//! handles the message, then flushes drained events: broadcast to the hub
//! (mock-only events skipped outside mock mode) and `room_changes` forwarded
//! to the bridge when they differ from the last ones sent.
//!
//! LIFECYCLE
//! =========
//! 1. `spawn` → actor loop running, hub empty
//! 2. Client connects → `config` then `state` sent to that client only
//! 3. `shutdown` (or every handle dropped) → timers cleared, hub dropped,
//!    task ends

use std::future::pending;
use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::frame::{GmControl, Inbound, RoomCommand, config_frame, parse_inbound, signal_frame, state_frame};
use crate::hub::{ClientTx, Hub};
use crate::prop::{CommandError, HackSignal, Prop, PropEvent, Route};

const CONTROL_CHANNEL_CAPACITY: usize = 256;
const INPUT_CHANNEL_CAPACITY: usize = 256;

// =============================================================================
// HANDLE
// =============================================================================

enum Control {
    Connect { client_id: Uuid, tx: ClientTx },
    Disconnect { client_id: Uuid },
    Client { text: String },
    Room { command: RoomCommand, reply: oneshot::Sender<Result<(), CommandError>> },
    Snapshot { reply: oneshot::Sender<Value> },
    Shutdown,
}

/// Cloneable sender side of a running prop actor.
#[derive(Clone)]
pub struct PropHandle {
    tx: mpsc::Sender<Control>,
}

impl PropHandle {
    /// Register a client. It receives `config` and `state` before anything else.
    pub async fn connect(&self, client_id: Uuid, tx: ClientTx) -> bool {
        self.tx.send(Control::Connect { client_id, tx }).await.is_ok()
    }

    pub async fn disconnect(&self, client_id: Uuid) {
        let _ = self.tx.send(Control::Disconnect { client_id }).await;
    }

    /// Raw text frame from a client.
    pub async fn client_text(&self, text: String) {
        let _ = self.tx.send(Control::Client { text }).await;
    }

    /// Execute a Room Controller command and wait for its outcome.
    ///
    /// # Errors
    ///
    /// The command's own failure, or `Unavailable` once the actor is gone.
    pub async fn room_command(&self, command: RoomCommand) -> Result<(), CommandError> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(Control::Room { command, reply }).await.map_err(|_| CommandError::Unavailable)?;
        rx.await.map_err(|_| CommandError::Unavailable)?
    }

    /// Current snapshot as JSON, `None` once the actor is gone.
    pub async fn snapshot(&self) -> Option<Value> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(Control::Snapshot { reply }).await.ok()?;
        rx.await.ok()
    }

    pub async fn shutdown(&self) {
        let _ = self.tx.send(Control::Shutdown).await;
    }
}

/// Channel for decoded hardware input.
#[must_use]
pub fn input_channel<I>() -> (mpsc::Sender<I>, mpsc::Receiver<I>) {
    mpsc::channel(INPUT_CHANNEL_CAPACITY)
}

pub struct RuntimeOptions {
    /// Broadcast mock-only events and accept simulated input.
    pub mock: bool,
    /// Where `room_changes` go. `None` when no Room Controller is configured.
    pub room_updates: Option<mpsc::Sender<Value>>,
}

/// Spawn the actor. The task ends on `shutdown` or when every handle is dropped.
pub fn spawn<P: Prop>(machine: P, inputs: mpsc::Receiver<P::Input>, options: RuntimeOptions) -> (PropHandle, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(CONTROL_CHANNEL_CAPACITY);
    let runtime = PropRuntime {
        machine,
        hub: Hub::new(),
        mock: options.mock,
        room_updates: options.room_updates,
        last_room_changes: None,
    };
    let task = tokio::spawn(runtime.run(rx, inputs));
    (PropHandle { tx }, task)
}

// =============================================================================
// ACTOR
// =============================================================================

struct PropRuntime<P: Prop> {
    machine: P,
    hub: Hub,
    mock: bool,
    room_updates: Option<mpsc::Sender<Value>>,
    last_room_changes: Option<Value>,
}

fn clock() -> Instant {
    tokio::time::Instant::now().into_std()
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(tokio::time::Instant::from_std(at)).await,
        None => pending().await,
    }
}

impl<P: Prop> PropRuntime<P> {
    async fn run(mut self, mut control: mpsc::Receiver<Control>, mut inputs: mpsc::Receiver<P::Input>) {
        info!(mock = self.mock, "runtime: started");
        loop {
            let deadline = self.machine.next_deadline();
            tokio::select! {
                msg = control.recv() => {
                    let Some(msg) = msg else { break };
                    let now = self.step(clock());
                    if !self.handle_control(msg, now) {
                        break;
                    }
                }
                Some(input) = inputs.recv() => {
                    let now = self.step(clock());
                    self.machine.handle_input(input, now);
                }
                () = sleep_until_opt(deadline) => {
                    self.step(clock());
                }
            }
            self.flush();
        }
        self.machine.timers_mut().clear();
        self.hub.clear();
        info!("runtime: stopped");
    }

    /// Fire due timers and flush what they emitted.
    fn step(&mut self, now: Instant) -> Instant {
        self.machine.advance(now);
        self.flush();
        now
    }

    /// Returns false when the actor should stop.
    fn handle_control(&mut self, msg: Control, now: Instant) -> bool {
        match msg {
            Control::Connect { client_id, tx } => self.connect(client_id, tx),
            Control::Disconnect { client_id } => {
                if self.hub.part(client_id) {
                    info!(%client_id, clients = self.hub.len(), "runtime: client left");
                    if self.hub.is_empty() {
                        debug!("runtime: no clients connected");
                    }
                }
            }
            Control::Client { text } => self.handle_client(&text, now),
            Control::Room { command, reply } => {
                let result = self.handle_room(&command, now);
                let _ = reply.send(result);
            }
            Control::Snapshot { reply } => {
                let _ = reply.send(serde_json::to_value(self.machine.snapshot()).unwrap_or(Value::Null));
            }
            Control::Shutdown => return false,
        }
        true
    }

    fn connect(&mut self, client_id: Uuid, tx: ClientTx) {
        self.hub.join(client_id, tx);
        let config: Arc<str> = config_frame(self.mock, self.machine.manifest()).into();
        let state: Arc<str> = state_frame(&self.machine.snapshot()).into();
        if self.hub.send_to(client_id, config) {
            self.hub.send_to(client_id, state);
        }
        info!(%client_id, clients = self.hub.len(), "runtime: client joined");
    }

    fn handle_client(&mut self, text: &str, now: Instant) {
        let Some(inbound) = parse_inbound::<P::Message>(text) else {
            debug!(len = text.len(), "runtime: unrecognized client frame");
            return;
        };
        match inbound {
            Inbound::Control(GmControl::Activate) => self.machine.activate(now),
            Inbound::Control(GmControl::Reset) => self.machine.reset(now),
            Inbound::Control(GmControl::ForceSolve) => self.machine.force_solve(now),
            Inbound::Control(GmControl::Ready) => {
                if self.mock && self.machine.is_inactive() {
                    info!("runtime: client ready, auto-activating");
                    self.machine.activate(now);
                }
            }
            Inbound::Prop(message) => match self.machine.route(message) {
                Some(Route::Display(input)) => self.machine.handle_input(input, now),
                Some(Route::Simulated(input)) if self.mock => self.machine.handle_input(input, now),
                Some(Route::Simulated(input)) => debug!(?input, "runtime: simulated input outside mock mode"),
                None => debug!("runtime: client message dropped"),
            },
        }
    }

    fn handle_room(&mut self, command: &RoomCommand, now: Instant) -> Result<(), CommandError> {
        info!(command = %command.command, "runtime: room command");
        match command.command.as_str() {
            "force_solve" => self.machine.force_solve(now),
            "reset" => self.machine.reset(now),
            "hack_mode" => self.hack(HackSignal::Mode, now),
            "hack_resolved" => self.hack(HackSignal::Resolved, now),
            _ => return self.machine.room_command(command, now),
        }
        Ok(())
    }

    fn hack(&mut self, signal: HackSignal, now: Instant) {
        let kind = match signal {
            HackSignal::Mode => "hackMode",
            HackSignal::Resolved => "hackResolved",
        };
        self.hub.broadcast(&Arc::from(signal_frame(kind)));
        self.machine.on_hack(signal, now);
    }

    fn flush(&mut self) {
        for event in self.machine.drain_events() {
            if let Some(changes) = event.room_changes() {
                self.report(changes);
            }
            if event.mock_only() && !self.mock {
                continue;
            }
            match serde_json::to_string(&event) {
                Ok(text) => {
                    self.hub.broadcast(&Arc::from(text));
                }
                Err(e) => warn!(error = %e, ?event, "runtime: event serialization failed"),
            }
        }
    }

    fn report(&mut self, changes: Value) {
        if self.last_room_changes.as_ref() == Some(&changes) {
            return;
        }
        if let Some(tx) = &self.room_updates {
            if let Err(e) = tx.try_send(changes.clone()) {
                warn!(error = %e, "runtime: room update dropped");
            }
        }
        self.last_room_changes = Some(changes);
    }
}

#[cfg(test)]
#[path = "runtime_test.rs"]
mod tests;
