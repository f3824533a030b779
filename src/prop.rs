//! Prop — the state machine contract shared by every puzzle and screen.
//!
//! DESIGN
//! ======
//! A prop is plain synchronous state. Every operation takes the current
//! instant explicitly and never blocks. Side effects leave the machine in
//! two ways only:
//! - Output sinks (LEDs, tones) written synchronously inside a transition.
//! - Events queued internally and drained by the runtime after each step.
//!
//! The runtime owns transport: it serializes drained events once, fans them
//! out to display clients, and forwards `room_changes` to the bridge.
//!
//! LIFECYCLE
//! =========
//! `inactive → running(sub-states…) → solved`. `reset` returns to inactive
//! from anywhere; `force_solve` jumps to solved from anywhere but solved.
//! Both clear every pending timer before setting up the new state.

use std::fmt;
use std::time::Instant;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::frame::RoomCommand;
use crate::timer::Timers;

// =============================================================================
// EVENTS
// =============================================================================

/// An event broadcast verbatim to every connected display client.
pub trait PropEvent: Serialize + fmt::Debug {
    /// Fields to report to the Room Controller as a `prop_update`.
    fn room_changes(&self) -> Option<Value> {
        None
    }

    /// Mirrors of physical output that only a mock display renders.
    fn mock_only(&self) -> bool {
        false
    }
}

// =============================================================================
// ROUTING
// =============================================================================

/// How a decoded client message reaches the machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route<I> {
    /// Stand-in for physical input. Accepted in mock mode only.
    Simulated(I),
    /// Reported by the display itself (clip ended, animation done).
    Display(I),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HackSignal {
    Mode,
    Resolved,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("Unknown command")]
    Unknown,
    #[error("Missing {0}")]
    MissingArgument(&'static str),
    #[error("Unknown clip: {0}")]
    UnknownClip(String),
    #[error("prop runtime unavailable")]
    Unavailable,
}

// =============================================================================
// CONTRACT
// =============================================================================

pub trait Prop: Send + 'static {
    /// Debounced, decoded input from hardware, mock clients, or the display.
    type Input: fmt::Debug + Send + 'static;
    /// Prop-specific client messages (everything but the GM controls).
    type Message: DeserializeOwned;
    type Event: PropEvent;
    type Timer: fmt::Debug;
    type Snapshot: Serialize;

    /// Static parameters sent once per connection inside the config frame.
    fn manifest(&self) -> Value;

    /// Pure projection of the current state.
    fn snapshot(&self) -> Self::Snapshot;

    fn is_inactive(&self) -> bool;

    fn activate(&mut self, now: Instant);

    fn reset(&mut self, now: Instant);

    fn force_solve(&mut self, now: Instant);

    fn handle_input(&mut self, input: Self::Input, now: Instant);

    /// `None` drops a message whose fields are out of range.
    fn route(&self, message: Self::Message) -> Option<Route<Self::Input>>;

    fn on_timer(&mut self, timer: Self::Timer, now: Instant);

    fn timers(&self) -> &Timers<Self::Timer>;

    fn timers_mut(&mut self) -> &mut Timers<Self::Timer>;

    fn drain_events(&mut self) -> Vec<Self::Event>;

    /// Room-wide hack effect started or ended.
    fn on_hack(&mut self, _signal: HackSignal, _now: Instant) {}

    /// Commands beyond the shared `force_solve`/`reset`/`hack_*` set.
    fn room_command(&mut self, _command: &RoomCommand, _now: Instant) -> Result<(), CommandError> {
        Err(CommandError::Unknown)
    }

    /// Fire every timer due at or before `now`, each at its own deadline.
    fn advance(&mut self, now: Instant) {
        while let Some((at, timer)) = self.timers_mut().pop_due(now) {
            self.on_timer(timer, at);
        }
    }

    fn next_deadline(&self) -> Option<Instant> {
        self.timers().next_deadline()
    }
}
