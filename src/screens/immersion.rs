//! Immersion screen — the spy dashboard that only reacts to the hack.
//!
//! The display renders everything itself. The prop tracks whether the room
//! is hacked so late joiners and the Room Controller see the same mode.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::info;

use crate::config::PropDefaults;
use crate::prop::{HackSignal, Prop, PropEvent, Route};
use crate::timer::Timers;

pub const DEFAULTS: PropDefaults = PropDefaults { prop_id: "screen-immersion", port: 3011 };

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImmersionMode {
    Idle,
    Hack,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImmersionInput {
    /// Mock stand-in for the room-wide hack signals.
    Hack(HackSignal),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ImmersionMessage {
    HackMode,
    HackResolved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImmersionTimer {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImmersionSnapshot {
    pub mode: ImmersionMode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ImmersionEvent {
    State(ImmersionSnapshot),
    HackMode,
    HackResolved,
    Reset,
}

impl PropEvent for ImmersionEvent {
    fn room_changes(&self) -> Option<Value> {
        match self {
            Self::State(s) => Some(json!({ "mode": s.mode })),
            _ => None,
        }
    }
}

// =============================================================================
// MACHINE
// =============================================================================

pub struct ImmersionScreen {
    mode: ImmersionMode,
    timers: Timers<ImmersionTimer>,
    events: Vec<ImmersionEvent>,
}

impl Default for ImmersionScreen {
    fn default() -> Self {
        Self::new()
    }
}

impl ImmersionScreen {
    #[must_use]
    pub fn new() -> Self {
        Self { mode: ImmersionMode::Idle, timers: Timers::new(), events: Vec::new() }
    }

    #[must_use]
    pub fn mode(&self) -> ImmersionMode {
        self.mode
    }

    fn set(&mut self, mode: ImmersionMode) {
        self.mode = mode;
        self.events.push(ImmersionEvent::State(ImmersionSnapshot { mode }));
    }

    fn apply_hack(&mut self, signal: HackSignal) {
        info!(?signal, "immersion: hack signal");
        match signal {
            HackSignal::Mode => self.set(ImmersionMode::Hack),
            HackSignal::Resolved => self.set(ImmersionMode::Idle),
        }
    }
}

impl Prop for ImmersionScreen {
    type Input = ImmersionInput;
    type Message = ImmersionMessage;
    type Event = ImmersionEvent;
    type Timer = ImmersionTimer;
    type Snapshot = ImmersionSnapshot;

    fn manifest(&self) -> Value {
        json!({})
    }

    fn snapshot(&self) -> ImmersionSnapshot {
        ImmersionSnapshot { mode: self.mode }
    }

    fn is_inactive(&self) -> bool {
        false
    }

    fn activate(&mut self, _now: Instant) {}

    fn reset(&mut self, _now: Instant) {
        info!("immersion: reset");
        self.set(ImmersionMode::Idle);
        self.events.push(ImmersionEvent::Reset);
    }

    fn force_solve(&mut self, _now: Instant) {}

    fn handle_input(&mut self, input: ImmersionInput, _now: Instant) {
        let ImmersionInput::Hack(signal) = input;
        self.apply_hack(signal);
        self.events.push(match signal {
            HackSignal::Mode => ImmersionEvent::HackMode,
            HackSignal::Resolved => ImmersionEvent::HackResolved,
        });
    }

    fn route(&self, message: ImmersionMessage) -> Option<Route<ImmersionInput>> {
        let signal = match message {
            ImmersionMessage::HackMode => HackSignal::Mode,
            ImmersionMessage::HackResolved => HackSignal::Resolved,
        };
        Some(Route::Simulated(ImmersionInput::Hack(signal)))
    }

    fn on_timer(&mut self, timer: ImmersionTimer, _now: Instant) {
        match timer {}
    }

    fn timers(&self) -> &Timers<ImmersionTimer> {
        &self.timers
    }

    fn timers_mut(&mut self) -> &mut Timers<ImmersionTimer> {
        &mut self.timers
    }

    fn drain_events(&mut self) -> Vec<ImmersionEvent> {
        std::mem::take(&mut self.events)
    }

    fn on_hack(&mut self, signal: HackSignal, _now: Instant) {
        self.apply_hack(signal);
    }
}

#[cfg(test)]
#[path = "immersion_test.rs"]
mod tests;
