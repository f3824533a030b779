//! Vehicle — browse a vehicle list and dial its code into four levers.
//!
//! DESIGN
//! ======
//! Validation succeeds only when the browsed vehicle is the configured one
//! AND the lever vector equals its code element-wise. A failed validation
//! shows feedback for `feedback_delay` and returns to browsing with the
//! vehicle and levers untouched.
//!
//! Physical levers are only wired at the positions used by some code, so a
//! hardware reading may be `None` for a lever. `None` leaves that lever's
//! last known position in place.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::config::PropDefaults;
use crate::prop::{Prop, PropEvent, Route};
use crate::timer::Timers;

pub const DEFAULTS: PropDefaults = PropDefaults { prop_id: "puzzle-4-vehicle", port: 3002 };

// =============================================================================
// CONFIG
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vehicle {
    pub name: String,
    pub video: String,
    pub code: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct NavigationPins {
    pub left: u8,
    pub right: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VehicleConfig {
    pub vehicles: Vec<Vehicle>,
    pub correct_vehicle_index: usize,
    pub lever_count: usize,
    pub lever_positions: u8,
    pub feedback_delay_ms: u64,
    pub navigation_pins: NavigationPins,
    pub validate_pin: u8,
    /// Per lever: wired position → GPIO pin.
    pub lever_pins: Vec<BTreeMap<u8, u8>>,
}

impl Default for VehicleConfig {
    fn default() -> Self {
        let vehicle = |i: usize, name: &str, code: [u8; 4]| Vehicle {
            name: name.into(),
            video: format!("vehicle-{i}.mp4"),
            code: code.to_vec(),
        };
        Self {
            vehicles: vec![
                vehicle(1, "Stealth Helicopter", [2, 7, 4, 5]),
                vehicle(2, "Armored SUV", [4, 7, 8, 1]),
                vehicle(3, "Speedboat", [2, 9, 4, 6]),
                vehicle(4, "Jet Fighter", [8, 3, 2, 1]),
                vehicle(5, "Submarine", [4, 3, 8, 5]),
            ],
            correct_vehicle_index: 2,
            lever_count: 4,
            lever_positions: 10,
            feedback_delay_ms: 2000,
            navigation_pins: NavigationPins { left: 5, right: 6 },
            validate_pin: 13,
            lever_pins: vec![
                BTreeMap::from([(2, 2), (4, 3), (8, 4)]),
                BTreeMap::from([(3, 7), (7, 8), (9, 9)]),
                BTreeMap::from([(2, 10), (4, 11), (8, 14)]),
                BTreeMap::from([(1, 15), (5, 18), (6, 21)]),
            ],
        }
    }
}

impl VehicleConfig {
    /// `(position, pin)` pairs per lever, for polling.
    #[must_use]
    pub fn lever_wiring(&self) -> Vec<Vec<(u8, u8)>> {
        self.lever_pins.iter().map(|pins| pins.iter().map(|(pos, pin)| (*pos, *pin)).collect()).collect()
    }
}

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleState {
    Inactive,
    Browsing,
    Feedback,
    Solved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Nav {
    Left,
    Right,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VehicleInput {
    Navigate(Nav),
    Validate,
    SetLever { lever: usize, position: u8 },
    SetLevers(Vec<Option<u8>>),
    AdjustLever { lever: usize, delta: i8 },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum VehicleMessage {
    Navigate { direction: Nav },
    Validate,
    LeverAdjust { lever: usize, delta: i8 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VehicleTimer {
    FeedbackDone,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleSnapshot {
    pub state: VehicleState,
    pub current_vehicle: usize,
    pub total_vehicles: usize,
    pub vehicle_name: String,
    pub vehicle_video: String,
    pub levers: Vec<u8>,
    pub lever_count: usize,
    pub lever_positions: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum VehicleEvent {
    State(VehicleSnapshot),
    VehicleChanged {
        index: usize,
        name: String,
        video: String,
    },
    LeversChanged {
        levers: Vec<u8>,
    },
    ValidateResult {
        correct: bool,
        #[serde(rename = "vehicleName")]
        vehicle_name: String,
    },
}

impl PropEvent for VehicleEvent {
    fn room_changes(&self) -> Option<Value> {
        let Self::State(snapshot) = self else {
            return None;
        };
        let progress = if snapshot.state == VehicleState::Solved { 1.0 } else { 0.0 };
        Some(json!({ "state": snapshot.state, "progress": progress }))
    }
}

// =============================================================================
// MACHINE
// =============================================================================

pub struct VehicleSelect {
    config: VehicleConfig,
    state: VehicleState,
    current: usize,
    levers: Vec<u8>,
    timers: Timers<VehicleTimer>,
    events: Vec<VehicleEvent>,
}

impl VehicleSelect {
    #[must_use]
    pub fn new(config: VehicleConfig) -> Self {
        let levers = vec![1; config.lever_count];
        Self { config, state: VehicleState::Inactive, current: 0, levers, timers: Timers::new(), events: Vec::new() }
    }

    #[must_use]
    pub fn state(&self) -> VehicleState {
        self.state
    }

    #[must_use]
    pub fn levers(&self) -> &[u8] {
        &self.levers
    }

    #[must_use]
    pub fn current_vehicle(&self) -> usize {
        self.current
    }

    fn vehicle(&self) -> Option<&Vehicle> {
        self.config.vehicles.get(self.current)
    }

    fn emit_state(&mut self) {
        let snapshot = self.snapshot();
        self.events.push(VehicleEvent::State(snapshot));
    }

    fn emit_vehicle(&mut self) {
        if let Some(v) = self.vehicle() {
            let event = VehicleEvent::VehicleChanged { index: self.current, name: v.name.clone(), video: v.video.clone() };
            self.events.push(event);
        }
    }

    fn emit_levers(&mut self) {
        self.events.push(VehicleEvent::LeversChanged { levers: self.levers.clone() });
        self.emit_state();
    }

    fn valid_position(&self, position: u8) -> bool {
        (1..=self.config.lever_positions).contains(&position)
    }

    fn set_lever(&mut self, lever: usize, position: u8) {
        if lever >= self.levers.len() || !self.valid_position(position) {
            debug!(lever, position, "vehicle: lever reading dropped");
            return;
        }
        if self.levers[lever] != position {
            self.levers[lever] = position;
            debug!(lever = lever + 1, position, "vehicle: lever moved");
            self.emit_levers();
        }
    }

    fn validate(&mut self, now: Instant) {
        let name = self.vehicle().map(|v| v.name.clone()).unwrap_or_default();
        let correct = self.current == self.config.correct_vehicle_index
            && self.vehicle().is_some_and(|v| v.code == self.levers);
        info!(vehicle = %name, levers = ?self.levers, correct, "vehicle: validate");
        self.events.push(VehicleEvent::ValidateResult { correct, vehicle_name: name });
        if correct {
            self.state = VehicleState::Solved;
        } else {
            self.state = VehicleState::Feedback;
            let delay = Duration::from_millis(self.config.feedback_delay_ms);
            self.timers.schedule_in(now, delay, VehicleTimer::FeedbackDone);
        }
        self.emit_state();
    }
}

impl Prop for VehicleSelect {
    type Input = VehicleInput;
    type Message = VehicleMessage;
    type Event = VehicleEvent;
    type Timer = VehicleTimer;
    type Snapshot = VehicleSnapshot;

    fn manifest(&self) -> Value {
        let videos: Vec<&str> = self.config.vehicles.iter().map(|v| v.video.as_str()).collect();
        json!({
            "videos": videos,
            "leverCount": self.config.lever_count,
            "leverPositions": self.config.lever_positions,
        })
    }

    fn snapshot(&self) -> VehicleSnapshot {
        let (name, video) = self.vehicle().map(|v| (v.name.clone(), v.video.clone())).unwrap_or_default();
        VehicleSnapshot {
            state: self.state,
            current_vehicle: self.current,
            total_vehicles: self.config.vehicles.len(),
            vehicle_name: name,
            vehicle_video: video,
            levers: self.levers.clone(),
            lever_count: self.config.lever_count,
            lever_positions: self.config.lever_positions,
        }
    }

    fn is_inactive(&self) -> bool {
        self.state == VehicleState::Inactive
    }

    fn activate(&mut self, _now: Instant) {
        if self.state != VehicleState::Inactive {
            return;
        }
        info!(vehicles = self.config.vehicles.len(), "vehicle: activated");
        self.state = VehicleState::Browsing;
        self.current = 0;
        self.levers = vec![1; self.config.lever_count];
        self.emit_vehicle();
        self.emit_state();
    }

    fn reset(&mut self, _now: Instant) {
        self.timers.clear();
        self.state = VehicleState::Inactive;
        self.current = 0;
        self.levers = vec![1; self.config.lever_count];
        info!("vehicle: reset");
        self.emit_state();
    }

    fn force_solve(&mut self, _now: Instant) {
        if self.state == VehicleState::Solved {
            return;
        }
        self.timers.clear();
        self.current = self.config.correct_vehicle_index;
        if let Some(code) = self.vehicle().map(|v| v.code.clone()) {
            self.levers = code;
        }
        self.state = VehicleState::Solved;
        info!("vehicle: force-solved");
        self.emit_vehicle();
        self.events.push(VehicleEvent::LeversChanged { levers: self.levers.clone() });
        let vehicle_name = self.vehicle().map(|v| v.name.clone()).unwrap_or_default();
        self.events.push(VehicleEvent::ValidateResult { correct: true, vehicle_name });
        self.emit_state();
    }

    fn handle_input(&mut self, input: VehicleInput, now: Instant) {
        if self.state != VehicleState::Browsing {
            debug!(?input, state = ?self.state, "vehicle: input ignored");
            return;
        }
        match input {
            VehicleInput::Navigate(nav) => {
                let total = self.config.vehicles.len();
                if total == 0 {
                    return;
                }
                self.current = match nav {
                    Nav::Left => (self.current + total - 1) % total,
                    Nav::Right => (self.current + 1) % total,
                };
                self.emit_vehicle();
                self.emit_state();
            }
            VehicleInput::Validate => self.validate(now),
            VehicleInput::SetLever { lever, position } => self.set_lever(lever, position),
            VehicleInput::SetLevers(positions) => {
                let before = self.levers.clone();
                for (lever, position) in positions.into_iter().enumerate().take(self.levers.len()) {
                    if let Some(position) = position.filter(|p| self.valid_position(*p)) {
                        self.levers[lever] = position;
                    }
                }
                if self.levers != before {
                    debug!(levers = ?self.levers, "vehicle: levers updated");
                    self.emit_levers();
                }
            }
            VehicleInput::AdjustLever { lever, delta } => {
                let Some(current) = self.levers.get(lever).copied() else {
                    return;
                };
                let target = (i16::from(current) + i16::from(delta)).clamp(1, i16::from(self.config.lever_positions).max(1));
                if let Ok(position) = u8::try_from(target) {
                    self.set_lever(lever, position);
                }
            }
        }
    }

    fn route(&self, message: VehicleMessage) -> Option<Route<VehicleInput>> {
        let input = match message {
            VehicleMessage::Navigate { direction } => VehicleInput::Navigate(direction),
            VehicleMessage::Validate => VehicleInput::Validate,
            VehicleMessage::LeverAdjust { lever, delta } => VehicleInput::AdjustLever { lever, delta },
        };
        Some(Route::Simulated(input))
    }

    fn on_timer(&mut self, timer: VehicleTimer, _now: Instant) {
        match timer {
            VehicleTimer::FeedbackDone => {
                if self.state == VehicleState::Feedback {
                    self.state = VehicleState::Browsing;
                    self.emit_state();
                }
            }
        }
    }

    fn timers(&self) -> &Timers<VehicleTimer> {
        &self.timers
    }

    fn timers_mut(&mut self) -> &mut Timers<VehicleTimer> {
        &mut self.timers
    }

    fn drain_events(&mut self) -> Vec<VehicleEvent> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
#[path = "vehicle_test.rs"]
mod tests;
