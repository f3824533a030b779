//! Missile — reverse a missile along its flight path, one joystick leg at a time.
//!
//! DESIGN
//! ======
//! Activation plays the scripted forward flight for `forward_anim_duration`
//! (the display may cut it short with `forwardAnimDone`). The player then
//! walks the path backwards: leg `total - 1 - reverse_leg` has to be undone
//! by pushing the compass opposite of its forward direction.
//!
//! Each input window is bounded by a countdown. Policy:
//! - Wrong input is reported and ignored; the countdown keeps running.
//! - Countdown expiry throws the missile back to the target city and re-arms
//!   the countdown. With no progress to lose the only visible effect is the
//!   fresh `timerUpdate`.
//!
//! The countdown is stopped while a leg animates and re-armed when it lands.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::config::PropDefaults;
use crate::hardware::decode::Direction;
use crate::prop::{Prop, PropEvent, Route};
use crate::timer::{MAX_DELAY, MIN_DELAY, Timers, seconds};

pub const DEFAULTS: PropDefaults = PropDefaults { prop_id: "puzzle-5-missile", port: 3003 };

// =============================================================================
// CONFIG
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct City {
    pub name: String,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct JoystickPins {
    pub up: u8,
    pub down: u8,
    pub left: u8,
    pub right: u8,
}

impl JoystickPins {
    /// `[up, down, left, right]`.
    #[must_use]
    pub fn as_array(self) -> [u8; 4] {
        [self.up, self.down, self.left, self.right]
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MissileConfig {
    /// Origin first, target last.
    pub path: Vec<City>,
    /// Forward direction of each leg `path[i] → path[i + 1]`.
    pub directions: Vec<Direction>,
    /// Seconds.
    pub forward_anim_duration: f64,
    /// Seconds.
    pub leg_anim_duration: f64,
    pub leg_settle_ms: u64,
    /// Seconds per input before the missile is thrown back.
    pub input_time_limit: f64,
    pub countdown_tick_ms: u64,
    /// Accept a cardinal push when the expected direction is a diagonal containing it.
    pub cardinal_tolerance: bool,
    pub joystick_pins: JoystickPins,
}

impl Default for MissileConfig {
    fn default() -> Self {
        use Direction::{E, N, Ne, Nw, S, Se, Sw};

        let city = |name: &str, x: f64, y: f64| City { name: name.into(), x, y };
        let path = vec![
            city("Los Angeles", 130.6, 405.6),
            city("New York", 218.3, 389.2),
            city("Mexico", 170.6, 446.0),
            city("Lima", 232.3, 530.0),
            city("Rio de Janeiro", 303.7, 562.8),
            city("Le Cap", 479.7, 630.0),
            city("Dakar", 367.3, 470.0),
            city("Casablanca", 389.0, 431.6),
            city("Madrid", 402.6, 425.3),
            city("Paris", 405.4, 402.7),
            city("Berlin", 427.6, 394.0),
            city("Moscou", 496.1, 357.8),
            city("Pékin", 675.0, 410.4),
            city("Singapour", 675.0, 500.0),
            city("Jakarta", 706.4, 530.0),
            city("Nouméa", 785.0, 590.0),
            city("Sydney", 760.4, 629.3),
        ];
        let directions = vec![E, Sw, Se, Se, E, Nw, Ne, Ne, N, E, Ne, E, S, Se, Se, Sw];
        Self {
            path,
            directions,
            forward_anim_duration: 8.0,
            leg_anim_duration: 0.8,
            leg_settle_ms: 200,
            input_time_limit: 4.0,
            countdown_tick_ms: 250,
            cardinal_tolerance: true,
            joystick_pins: JoystickPins { up: 16, down: 20, left: 19, right: 26 },
        }
    }
}

impl MissileConfig {
    fn forward(&self) -> Duration {
        seconds(self.forward_anim_duration)
    }

    fn leg(&self) -> Duration {
        seconds(self.leg_anim_duration) + Duration::from_millis(self.leg_settle_ms).min(MAX_DELAY)
    }

    fn input_limit(&self) -> Duration {
        seconds(self.input_time_limit).max(MIN_DELAY)
    }

    fn tick(&self) -> Duration {
        Duration::from_millis(self.countdown_tick_ms).max(MIN_DELAY)
    }
}

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MissileState {
    Inactive,
    ForwardAnimation,
    Reversing,
    AnimateLeg,
    Solved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissileInput {
    Push(Direction),
    ForwardAnimDone,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum MissileMessage {
    Direction { direction: String },
    ForwardAnimDone,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissileTimer {
    ForwardDone,
    LegDone,
    CountdownTick,
    InputDeadline,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MissileSnapshot {
    pub state: MissileState,
    pub missile_at: usize,
    pub reverse_leg: usize,
    pub total_legs: usize,
    pub total_cities: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum MissileEvent {
    State(MissileSnapshot),
    #[serde(rename_all = "camelCase")]
    ForwardAnimation {
        path: Vec<City>,
        directions: Vec<Direction>,
        duration: f64,
    },
    #[serde(rename_all = "camelCase")]
    CorrectInput {
        dir: Direction,
        from_index: usize,
        to_index: usize,
        duration: f64,
    },
    WrongInput {
        dir: Direction,
        expected: Direction,
    },
    #[serde(rename_all = "camelCase")]
    TimerUpdate {
        remaining_ms: u64,
        limit_ms: u64,
    },
    #[serde(rename_all = "camelCase")]
    Timeout {
        lost_legs: usize,
    },
}

impl PropEvent for MissileEvent {
    fn room_changes(&self) -> Option<Value> {
        let Self::State(snapshot) = self else {
            return None;
        };
        #[allow(clippy::cast_precision_loss)]
        let progress = if snapshot.total_legs == 0 {
            0.0
        } else {
            snapshot.reverse_leg as f64 / snapshot.total_legs as f64
        };
        Some(json!({ "state": snapshot.state, "progress": progress }))
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

// =============================================================================
// MACHINE
// =============================================================================

pub struct Missile {
    config: MissileConfig,
    state: MissileState,
    missile_at: usize,
    reverse_leg: usize,
    input_deadline: Option<Instant>,
    timers: Timers<MissileTimer>,
    events: Vec<MissileEvent>,
}

impl Missile {
    #[must_use]
    pub fn new(config: MissileConfig) -> Self {
        let missile_at = config.path.len().saturating_sub(1);
        Self {
            config,
            state: MissileState::Inactive,
            missile_at,
            reverse_leg: 0,
            input_deadline: None,
            timers: Timers::new(),
            events: Vec::new(),
        }
    }

    #[must_use]
    pub fn state(&self) -> MissileState {
        self.state
    }

    #[must_use]
    pub fn total_legs(&self) -> usize {
        self.config.directions.len()
    }

    /// Direction that undoes the current leg, if any remain.
    #[must_use]
    pub fn expected(&self) -> Option<Direction> {
        let forward_index = self.total_legs().checked_sub(1 + self.reverse_leg)?;
        self.config.directions.get(forward_index).map(|d| d.opposite())
    }

    /// Remaining time in the current input window.
    #[must_use]
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.input_deadline.map(|at| at.saturating_duration_since(now))
    }

    fn at_target(&self) -> usize {
        self.config.path.len().saturating_sub(1)
    }

    fn accepts(&self, dir: Direction, expected: Direction) -> bool {
        if dir == expected {
            return true;
        }
        if !self.config.cardinal_tolerance || dir.is_diagonal() || !expected.is_diagonal() {
            return false;
        }
        let (a, b) = expected.components();
        dir == a || dir == b
    }

    fn emit_state(&mut self) {
        let snapshot = self.snapshot();
        self.events.push(MissileEvent::State(snapshot));
    }

    fn stop_countdown(&mut self) {
        self.timers.cancel_where(|t| matches!(t, MissileTimer::CountdownTick | MissileTimer::InputDeadline));
        self.input_deadline = None;
    }

    fn arm_countdown(&mut self, now: Instant) {
        self.stop_countdown();
        let limit = self.config.input_limit();
        let deadline = now + limit;
        self.input_deadline = Some(deadline);
        self.timers.schedule(deadline, MissileTimer::InputDeadline);
        let tick = self.config.tick();
        if tick < limit {
            self.timers.schedule_in(now, tick, MissileTimer::CountdownTick);
        }
        self.events.push(MissileEvent::TimerUpdate { remaining_ms: millis(limit), limit_ms: millis(limit) });
    }

    fn start_reversing(&mut self, now: Instant) {
        self.timers.cancel_where(|t| matches!(t, MissileTimer::ForwardDone));
        self.state = MissileState::Reversing;
        self.missile_at = self.at_target();
        self.reverse_leg = 0;
        info!(legs = self.total_legs(), "missile: forward flight done, reversing");
        self.arm_countdown(now);
        self.emit_state();
    }

    fn push(&mut self, dir: Direction, now: Instant) {
        let Some(expected) = self.expected() else {
            return;
        };
        if !self.accepts(dir, expected) {
            debug!(?dir, ?expected, leg = self.reverse_leg, "missile: wrong direction");
            self.events.push(MissileEvent::WrongInput { dir, expected });
            return;
        }
        self.stop_countdown();
        let from = self.missile_at;
        self.missile_at = self.missile_at.saturating_sub(1);
        self.reverse_leg += 1;
        self.state = MissileState::AnimateLeg;
        info!(?dir, from, to = self.missile_at, leg = self.reverse_leg, "missile: leg reversed");
        self.events.push(MissileEvent::CorrectInput {
            dir,
            from_index: from,
            to_index: self.missile_at,
            duration: self.config.leg_anim_duration,
        });
        self.emit_state();
        let delay = self.config.leg();
        self.timers.schedule_in(now, delay, MissileTimer::LegDone);
    }

    fn leg_done(&mut self, now: Instant) {
        if self.reverse_leg >= self.total_legs() {
            self.state = MissileState::Solved;
            info!("missile: returned to origin, solved");
        } else {
            self.state = MissileState::Reversing;
            self.arm_countdown(now);
        }
        self.emit_state();
    }

    fn timed_out(&mut self, now: Instant) {
        let lost = self.reverse_leg;
        self.input_deadline = None;
        if lost > 0 {
            info!(lost, "missile: timed out, back to target");
            self.reverse_leg = 0;
            self.missile_at = self.at_target();
            self.events.push(MissileEvent::Timeout { lost_legs: lost });
            self.emit_state();
        }
        self.arm_countdown(now);
    }
}

impl Prop for Missile {
    type Input = MissileInput;
    type Message = MissileMessage;
    type Event = MissileEvent;
    type Timer = MissileTimer;
    type Snapshot = MissileSnapshot;

    fn manifest(&self) -> Value {
        json!({
            "path": self.config.path,
            "directions": self.config.directions,
            "forwardAnimDuration": self.config.forward_anim_duration,
            "legAnimDuration": self.config.leg_anim_duration,
            "inputTimeLimit": self.config.input_time_limit,
        })
    }

    fn snapshot(&self) -> MissileSnapshot {
        MissileSnapshot {
            state: self.state,
            missile_at: self.missile_at,
            reverse_leg: self.reverse_leg,
            total_legs: self.total_legs(),
            total_cities: self.config.path.len(),
        }
    }

    fn is_inactive(&self) -> bool {
        self.state == MissileState::Inactive
    }

    fn activate(&mut self, now: Instant) {
        if self.state != MissileState::Inactive {
            return;
        }
        self.state = MissileState::ForwardAnimation;
        self.reverse_leg = 0;
        self.missile_at = self.at_target();
        info!(duration = self.config.forward_anim_duration, "missile: activated, forward flight");
        self.events.push(MissileEvent::ForwardAnimation {
            path: self.config.path.clone(),
            directions: self.config.directions.clone(),
            duration: self.config.forward_anim_duration,
        });
        self.emit_state();
        let delay = self.config.forward();
        self.timers.schedule_in(now, delay, MissileTimer::ForwardDone);
    }

    fn reset(&mut self, _now: Instant) {
        self.timers.clear();
        self.input_deadline = None;
        self.state = MissileState::Inactive;
        self.reverse_leg = 0;
        self.missile_at = self.at_target();
        info!("missile: reset");
        self.emit_state();
    }

    fn force_solve(&mut self, _now: Instant) {
        if self.state == MissileState::Solved {
            return;
        }
        self.timers.clear();
        self.input_deadline = None;
        self.missile_at = 0;
        self.reverse_leg = self.total_legs();
        self.state = MissileState::Solved;
        info!("missile: force-solved");
        self.emit_state();
    }

    fn handle_input(&mut self, input: MissileInput, now: Instant) {
        match (self.state, input) {
            (MissileState::ForwardAnimation, MissileInput::ForwardAnimDone) => self.start_reversing(now),
            (MissileState::Reversing, MissileInput::Push(dir)) => self.push(dir, now),
            (state, input) => debug!(?state, ?input, "missile: input ignored"),
        }
    }

    fn route(&self, message: MissileMessage) -> Option<Route<MissileInput>> {
        match message {
            MissileMessage::Direction { direction } => {
                Direction::parse(&direction).map(|dir| Route::Simulated(MissileInput::Push(dir)))
            }
            MissileMessage::ForwardAnimDone => Some(Route::Display(MissileInput::ForwardAnimDone)),
        }
    }

    fn on_timer(&mut self, timer: MissileTimer, now: Instant) {
        match timer {
            MissileTimer::ForwardDone => {
                if self.state == MissileState::ForwardAnimation {
                    self.start_reversing(now);
                }
            }
            MissileTimer::LegDone => {
                if self.state == MissileState::AnimateLeg {
                    self.leg_done(now);
                }
            }
            MissileTimer::CountdownTick => {
                let Some(deadline) = self.input_deadline else {
                    return;
                };
                let remaining = deadline.saturating_duration_since(now);
                self.events.push(MissileEvent::TimerUpdate {
                    remaining_ms: millis(remaining),
                    limit_ms: millis(self.config.input_limit()),
                });
                let tick = self.config.tick();
                if remaining > tick {
                    self.timers.schedule_in(now, tick, MissileTimer::CountdownTick);
                }
            }
            MissileTimer::InputDeadline => {
                if self.state == MissileState::Reversing {
                    self.timed_out(now);
                }
            }
        }
    }

    fn timers(&self) -> &Timers<MissileTimer> {
        &self.timers
    }

    fn timers_mut(&mut self) -> &mut Timers<MissileTimer> {
        &mut self.timers
    }

    fn drain_events(&mut self) -> Vec<MissileEvent> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
#[path = "missile_test.rs"]
mod tests;
