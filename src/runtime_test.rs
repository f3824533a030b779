use super::*;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::time::timeout;

use crate::hub::CLIENT_CHANNEL_CAPACITY;
use crate::timer::Timers;

// =============================================================================
// TEST PROP
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum Phase {
    Inactive,
    Running,
    Solved,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
enum TestMessage {
    Press,
    Done,
    Garbled,
}

#[derive(Debug)]
enum TestInput {
    Press,
    Done,
}

#[derive(Debug)]
enum TestTimer {
    Expire,
}

#[derive(Debug, Clone, Serialize)]
struct TestSnapshot {
    state: Phase,
    presses: u32,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
enum TestEvent {
    State(TestSnapshot),
    Pressed,
    Mirror,
    Expired,
    Hacked,
}

impl PropEvent for TestEvent {
    fn room_changes(&self) -> Option<Value> {
        match self {
            Self::State(s) => Some(json!({ "state": s.state })),
            _ => None,
        }
    }

    fn mock_only(&self) -> bool {
        matches!(self, Self::Mirror)
    }
}

struct TestProp {
    phase: Phase,
    presses: u32,
    timers: Timers<TestTimer>,
    events: Vec<TestEvent>,
}

impl TestProp {
    fn new() -> Self {
        Self { phase: Phase::Inactive, presses: 0, timers: Timers::new(), events: Vec::new() }
    }

    fn emit_state(&mut self) {
        let s = self.snapshot();
        self.events.push(TestEvent::State(s));
    }
}

impl Prop for TestProp {
    type Input = TestInput;
    type Message = TestMessage;
    type Event = TestEvent;
    type Timer = TestTimer;
    type Snapshot = TestSnapshot;

    fn manifest(&self) -> Value {
        json!({ "buttons": 3 })
    }

    fn snapshot(&self) -> TestSnapshot {
        TestSnapshot { state: self.phase, presses: self.presses }
    }

    fn is_inactive(&self) -> bool {
        self.phase == Phase::Inactive
    }

    fn activate(&mut self, now: Instant) {
        self.phase = Phase::Running;
        self.timers.schedule_in(now, Duration::from_secs(1), TestTimer::Expire);
        self.emit_state();
    }

    fn reset(&mut self, _now: Instant) {
        self.timers.clear();
        self.phase = Phase::Inactive;
        self.presses = 0;
        self.emit_state();
    }

    fn force_solve(&mut self, _now: Instant) {
        self.timers.clear();
        self.phase = Phase::Solved;
        self.emit_state();
    }

    fn handle_input(&mut self, input: TestInput, _now: Instant) {
        match input {
            TestInput::Press => {
                self.presses += 1;
                self.events.push(TestEvent::Pressed);
                self.events.push(TestEvent::Mirror);
                self.emit_state();
            }
            TestInput::Done => {
                self.phase = Phase::Solved;
                self.emit_state();
            }
        }
    }

    fn route(&self, message: TestMessage) -> Option<Route<TestInput>> {
        match message {
            TestMessage::Press => Some(Route::Simulated(TestInput::Press)),
            TestMessage::Done => Some(Route::Display(TestInput::Done)),
            TestMessage::Garbled => None,
        }
    }

    fn on_timer(&mut self, timer: TestTimer, _now: Instant) {
        match timer {
            TestTimer::Expire => self.events.push(TestEvent::Expired),
        }
    }

    fn timers(&self) -> &Timers<TestTimer> {
        &self.timers
    }

    fn timers_mut(&mut self) -> &mut Timers<TestTimer> {
        &mut self.timers
    }

    fn drain_events(&mut self) -> Vec<TestEvent> {
        std::mem::take(&mut self.events)
    }

    fn on_hack(&mut self, _signal: HackSignal, _now: Instant) {
        self.events.push(TestEvent::Hacked);
    }

    fn room_command(&mut self, command: &RoomCommand, _now: Instant) -> Result<(), CommandError> {
        match command.command.as_str() {
            "bump" => {
                self.presses += 1;
                self.emit_state();
                Ok(())
            }
            _ => Err(CommandError::Unknown),
        }
    }
}

// =============================================================================
// HELPERS
// =============================================================================

struct Harness {
    handle: PropHandle,
    task: JoinHandle<()>,
    inputs: mpsc::Sender<TestInput>,
    room: mpsc::Receiver<Value>,
}

fn start(mock: bool) -> Harness {
    let (inputs, input_rx) = input_channel();
    let (room_tx, room) = mpsc::channel(16);
    let (handle, task) = spawn(TestProp::new(), input_rx, RuntimeOptions { mock, room_updates: Some(room_tx) });
    Harness { handle, task, inputs, room }
}

async fn join(handle: &PropHandle) -> mpsc::Receiver<Arc<str>> {
    let (tx, mut rx) = mpsc::channel(CLIENT_CHANNEL_CAPACITY);
    assert!(handle.connect(Uuid::new_v4(), tx).await);
    assert_eq!(next(&mut rx).await["type"], "config");
    assert_eq!(next(&mut rx).await["type"], "state");
    rx
}

async fn next(rx: &mut mpsc::Receiver<Arc<str>>) -> Value {
    let frame = timeout(Duration::from_secs(5), rx.recv()).await.expect("frame timed out").expect("client channel closed");
    serde_json::from_str(&frame).expect("frame is json")
}

async fn next_room(rx: &mut mpsc::Receiver<Value>) -> Value {
    timeout(Duration::from_secs(5), rx.recv()).await.expect("room update timed out").expect("room channel closed")
}

/// Round-trip through the actor so every earlier message is processed.
async fn settle(handle: &PropHandle) -> Value {
    handle.snapshot().await.expect("runtime alive")
}

// =============================================================================
// TESTS
// =============================================================================

#[tokio::test]
async fn connect_sends_config_then_state() {
    let h = start(true);
    let (tx, mut rx) = mpsc::channel(CLIENT_CHANNEL_CAPACITY);
    h.handle.connect(Uuid::new_v4(), tx).await;

    let config = next(&mut rx).await;
    assert_eq!(config, json!({ "type": "config", "mock": true, "buttons": 3 }));
    let state = next(&mut rx).await;
    assert_eq!(state, json!({ "type": "state", "state": "inactive", "presses": 0 }));
}

#[tokio::test]
async fn gm_activate_broadcasts_to_every_client() {
    let h = start(false);
    let mut a = join(&h.handle).await;
    let mut b = join(&h.handle).await;

    h.handle.client_text(r#"{"type":"activate"}"#.into()).await;
    assert_eq!(next(&mut a).await["state"], "running");
    assert_eq!(next(&mut b).await["state"], "running");
}

#[tokio::test]
async fn simulated_input_requires_mock_mode() {
    let h = start(false);
    let mut rx = join(&h.handle).await;
    h.handle.client_text(r#"{"type":"activate"}"#.into()).await;
    next(&mut rx).await;

    h.handle.client_text(r#"{"type":"press"}"#.into()).await;
    assert_eq!(settle(&h.handle).await["presses"], 0);

    h.handle.client_text(r#"{"type":"done"}"#.into()).await;
    assert_eq!(next(&mut rx).await["state"], "solved", "display input always accepted");
}

#[tokio::test]
async fn mock_only_events_reach_mock_clients() {
    let h = start(true);
    let mut rx = join(&h.handle).await;
    h.handle.client_text(r#"{"type":"press"}"#.into()).await;

    let kinds = [next(&mut rx).await, next(&mut rx).await, next(&mut rx).await];
    let kinds: Vec<&str> = kinds.iter().map(|v| v["type"].as_str().unwrap_or_default()).collect();
    assert_eq!(kinds, ["pressed", "mirror", "state"]);
}

#[tokio::test]
async fn mock_only_events_skipped_outside_mock() {
    let h = start(false);
    let mut rx = join(&h.handle).await;
    h.inputs.send(TestInput::Press).await.unwrap();

    assert_eq!(next(&mut rx).await["type"], "pressed");
    assert_eq!(next(&mut rx).await["type"], "state");
}

#[tokio::test]
async fn ready_auto_activates_only_in_mock_mode() {
    let h = start(false);
    h.handle.client_text(r#"{"type":"ready"}"#.into()).await;
    assert_eq!(settle(&h.handle).await["state"], "inactive");

    let h = start(true);
    h.handle.client_text(r#"{"type":"ready"}"#.into()).await;
    assert_eq!(settle(&h.handle).await["state"], "running");
}

#[tokio::test]
async fn garbage_and_dropped_messages_change_nothing() {
    let h = start(true);
    for text in ["not json", r#"{"type":"teleport"}"#, r#"{"type":"garbled"}"#] {
        h.handle.client_text(text.into()).await;
    }
    assert_eq!(settle(&h.handle).await, json!({ "state": "inactive", "presses": 0 }));
}

#[tokio::test(start_paused = true)]
async fn timers_fire_from_the_actor() {
    let h = start(false);
    let mut rx = join(&h.handle).await;
    h.handle.client_text(r#"{"type":"activate"}"#.into()).await;
    assert_eq!(next(&mut rx).await["state"], "running");

    tokio::time::sleep(Duration::from_millis(999)).await;
    assert!(rx.try_recv().is_err());
    assert_eq!(next(&mut rx).await["type"], "expired");
}

#[tokio::test(start_paused = true)]
async fn reset_cancels_pending_timer() {
    let h = start(false);
    let mut rx = join(&h.handle).await;
    h.handle.client_text(r#"{"type":"activate"}"#.into()).await;
    h.handle.client_text(r#"{"type":"reset"}"#.into()).await;
    assert_eq!(next(&mut rx).await["state"], "running");
    assert_eq!(next(&mut rx).await["state"], "inactive");

    tokio::time::sleep(Duration::from_secs(2)).await;
    settle(&h.handle).await;
    assert!(rx.try_recv().is_err(), "no expiry after reset");
}

#[tokio::test]
async fn room_commands_are_acknowledged() {
    let h = start(false);
    assert_eq!(h.handle.room_command(RoomCommand::new("force_solve")).await, Ok(()));
    assert_eq!(h.handle.room_command(RoomCommand::new("force_solve")).await, Ok(()), "no-op still succeeds");
    assert_eq!(h.handle.room_command(RoomCommand::new("bump")).await, Ok(()));
    assert_eq!(h.handle.room_command(RoomCommand::new("warp")).await, Err(CommandError::Unknown));
    assert_eq!(settle(&h.handle).await, json!({ "state": "solved", "presses": 1 }));
}

#[tokio::test]
async fn hack_signal_broadcast_precedes_machine_reaction() {
    let h = start(false);
    let mut rx = join(&h.handle).await;
    h.handle.room_command(RoomCommand::new("hack_mode")).await.unwrap();
    assert_eq!(next(&mut rx).await, json!({ "type": "hackMode" }));
    assert_eq!(next(&mut rx).await, json!({ "type": "hacked" }));

    h.handle.room_command(RoomCommand::new("hack_resolved")).await.unwrap();
    assert_eq!(next(&mut rx).await, json!({ "type": "hackResolved" }));
}

#[tokio::test]
async fn identical_room_changes_are_forwarded_once() {
    let mut h = start(true);
    h.handle.client_text(r#"{"type":"activate"}"#.into()).await;
    settle(&h.handle).await;
    h.inputs.send(TestInput::Press).await.unwrap();
    h.inputs.send(TestInput::Press).await.unwrap();
    h.handle.room_command(RoomCommand::new("force_solve")).await.unwrap();

    assert_eq!(next_room(&mut h.room).await, json!({ "state": "running" }));
    assert_eq!(next_room(&mut h.room).await, json!({ "state": "solved" }));
}

#[tokio::test]
async fn disconnected_client_stops_receiving() {
    let h = start(false);
    let client_id = Uuid::new_v4();
    let (tx, mut rx) = mpsc::channel(CLIENT_CHANNEL_CAPACITY);
    h.handle.connect(client_id, tx).await;
    next(&mut rx).await;
    next(&mut rx).await;

    h.handle.disconnect(client_id).await;
    h.handle.client_text(r#"{"type":"activate"}"#.into()).await;
    settle(&h.handle).await;
    assert!(rx.recv().await.is_none(), "hub dropped the sender");
}

#[tokio::test]
async fn shutdown_stops_the_actor() {
    let h = start(false);
    h.handle.shutdown().await;
    timeout(Duration::from_secs(5), h.task).await.expect("actor stopped").unwrap();
    assert_eq!(h.handle.room_command(RoomCommand::new("reset")).await, Err(CommandError::Unavailable));
    assert!(h.handle.snapshot().await.is_none());
}
