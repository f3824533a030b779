//! World Map — steer a crosshair with two encoders and hold it on target.
//!
//! DESIGN
//! ======
//! Each axis is a position in `[0, 1]` stepped by `1/steps` per detent.
//! Each axis also has its own beep timer whose interval follows
//! `min + sqrt(d) * (max - min)`, where `d` is the axis distance to target
//! normalized by 0.5 and capped at 1. The interval changes fast near the
//! target and slowly far away.
//!
//! Solving needs both axes inside `tolerance` for a continuous
//! `hold_duration`. A `HoldTick` every 100 ms reports progress. Leaving the
//! zone on either axis drops the hold back to zero.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::config::PropDefaults;
use crate::hardware::ToneSink;
use crate::prop::{Prop, PropEvent, Route};
use crate::timer::{Timers, seconds};

pub const DEFAULTS: PropDefaults = PropDefaults { prop_id: "puzzle-2-world-map", port: 3000 };

/// Distance at which the beep interval reaches its maximum.
const MAX_DISTANCE: f64 = 0.5;

// =============================================================================
// CONFIG
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncoderPins {
    pub clk: u8,
    pub dt: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisPins {
    pub x: EncoderPins,
    pub y: EncoderPins,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WorldMapConfig {
    pub target_x: f64,
    pub target_y: f64,
    pub tolerance: f64,
    /// Seconds.
    pub hold_duration: f64,
    pub steps_x: u32,
    pub steps_y: u32,
    pub start_x: f64,
    pub start_y: f64,
    pub min_beep_interval: u64,
    pub max_beep_interval: u64,
    pub beep_frequency_hz: u32,
    pub beep_duration_ms: u32,
    pub hold_tick_ms: u64,
    pub encoder_pins: AxisPins,
}

impl Default for WorldMapConfig {
    fn default() -> Self {
        Self {
            target_x: 0.63,
            target_y: 0.41,
            tolerance: 0.05,
            hold_duration: 2.0,
            steps_x: 200,
            steps_y: 150,
            start_x: 0.15,
            start_y: 0.75,
            min_beep_interval: 100,
            max_beep_interval: 2000,
            beep_frequency_hz: 800,
            beep_duration_ms: 60,
            hold_tick_ms: 100,
            encoder_pins: AxisPins { x: EncoderPins { clk: 16, dt: 20 }, y: EncoderPins { clk: 19, dt: 26 } },
        }
    }
}

impl WorldMapConfig {
    #[must_use]
    pub fn hold(&self) -> Duration {
        seconds(self.hold_duration)
    }

    /// Beep interval for a normalized axis distance.
    #[must_use]
    pub fn beep_interval(&self, distance: f64) -> Duration {
        let d = distance.clamp(0.0, 1.0);
        #[allow(clippy::cast_precision_loss)]
        let (min, max) = (self.min_beep_interval as f64, self.max_beep_interval as f64);
        let ms = (min + d.sqrt() * (max - min)).round().max(0.0);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        Duration::from_millis(ms as u64)
    }
}

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
}

impl Axis {
    fn index(self) -> usize {
        match self {
            Self::X => 0,
            Self::Y => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorldMapState {
    Inactive,
    Tracking,
    Solved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorldMapInput {
    Turn { axis: Axis, direction: i8 },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum WorldMapMessage {
    Key { axis: Axis, direction: i8 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorldMapTimer {
    Beep(Axis),
    HoldTick,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldMapSnapshot {
    pub state: WorldMapState,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum WorldMapEvent {
    State(WorldMapSnapshot),
    Position { x: f64, y: f64 },
    HoldProgress { progress: f64 },
    Beep { axis: Axis },
    Solved,
}

impl PropEvent for WorldMapEvent {
    fn room_changes(&self) -> Option<Value> {
        let Self::State(snapshot) = self else {
            return None;
        };
        let progress = if snapshot.state == WorldMapState::Solved { 1.0 } else { 0.0 };
        Some(json!({ "state": snapshot.state, "progress": progress }))
    }

    fn mock_only(&self) -> bool {
        matches!(self, Self::Beep { .. })
    }
}

// =============================================================================
// MACHINE
// =============================================================================

pub struct WorldMap {
    config: WorldMapConfig,
    state: WorldMapState,
    x: f64,
    y: f64,
    hold_start: Option<Instant>,
    intervals: [Option<Duration>; 2],
    tone: Box<dyn ToneSink>,
    timers: Timers<WorldMapTimer>,
    events: Vec<WorldMapEvent>,
}

impl WorldMap {
    #[must_use]
    pub fn new(config: WorldMapConfig, tone: Box<dyn ToneSink>) -> Self {
        let (x, y) = (config.start_x, config.start_y);
        info!(mock_tone = tone.is_mock(), "world_map: created");
        Self {
            config,
            state: WorldMapState::Inactive,
            x,
            y,
            hold_start: None,
            intervals: [None, None],
            tone,
            timers: Timers::new(),
            events: Vec::new(),
        }
    }

    #[must_use]
    pub fn state(&self) -> WorldMapState {
        self.state
    }

    #[must_use]
    pub fn position(&self) -> (f64, f64) {
        (self.x, self.y)
    }

    #[must_use]
    pub fn beep_interval(&self, axis: Axis) -> Option<Duration> {
        self.intervals[axis.index()]
    }

    #[must_use]
    pub fn is_holding(&self) -> bool {
        self.hold_start.is_some()
    }

    fn axis_distance(&self, axis: Axis) -> f64 {
        let delta = match axis {
            Axis::X => self.x - self.config.target_x,
            Axis::Y => self.y - self.config.target_y,
        };
        (delta.abs() / MAX_DISTANCE).min(1.0)
    }

    fn in_zone(&self) -> bool {
        (self.x - self.config.target_x).abs() <= self.config.tolerance
            && (self.y - self.config.target_y).abs() <= self.config.tolerance
    }

    fn update_audio(&mut self, now: Instant) {
        for axis in [Axis::X, Axis::Y] {
            let interval = self.config.beep_interval(self.axis_distance(axis));
            let slot = &mut self.intervals[axis.index()];
            if *slot == Some(interval) && self.timers.contains(|t| *t == WorldMapTimer::Beep(axis)) {
                continue;
            }
            *slot = Some(interval);
            self.timers.cancel_where(|t| *t == WorldMapTimer::Beep(axis));
            self.timers.schedule_in(now, interval, WorldMapTimer::Beep(axis));
        }
    }

    fn stop_audio(&mut self) {
        self.intervals = [None, None];
        self.timers.cancel_where(|t| matches!(t, WorldMapTimer::Beep(_)));
    }

    fn check_hold(&mut self, now: Instant) {
        if self.in_zone() {
            if self.hold_start.is_none() {
                debug!(x = self.x, y = self.y, "world_map: hold started");
                self.hold_start = Some(now);
                self.timers.schedule_in(now, Duration::from_millis(self.config.hold_tick_ms), WorldMapTimer::HoldTick);
            }
        } else if self.hold_start.take().is_some() {
            debug!("world_map: hold broken");
            self.timers.cancel_where(|t| *t == WorldMapTimer::HoldTick);
            self.events.push(WorldMapEvent::HoldProgress { progress: 0.0 });
        }
    }

    fn emit_position(&mut self) {
        self.events.push(WorldMapEvent::Position { x: self.x, y: self.y });
        self.emit_state();
    }

    fn emit_state(&mut self) {
        let snapshot = self.snapshot();
        self.events.push(WorldMapEvent::State(snapshot));
    }

    fn solve(&mut self) {
        self.timers.clear();
        self.hold_start = None;
        self.stop_audio();
        self.state = WorldMapState::Solved;
        info!(x = self.x, y = self.y, "world_map: solved");
        self.events.push(WorldMapEvent::Solved);
        self.emit_state();
    }
}

impl Prop for WorldMap {
    type Input = WorldMapInput;
    type Message = WorldMapMessage;
    type Event = WorldMapEvent;
    type Timer = WorldMapTimer;
    type Snapshot = WorldMapSnapshot;

    fn manifest(&self) -> Value {
        json!({
            "startX": self.config.start_x,
            "startY": self.config.start_y,
            "stepsX": self.config.steps_x,
            "stepsY": self.config.steps_y,
            "tolerance": self.config.tolerance,
            "holdDuration": self.config.hold_duration,
        })
    }

    fn snapshot(&self) -> WorldMapSnapshot {
        WorldMapSnapshot { state: self.state, x: self.x, y: self.y }
    }

    fn is_inactive(&self) -> bool {
        self.state == WorldMapState::Inactive
    }

    fn activate(&mut self, now: Instant) {
        if self.state != WorldMapState::Inactive {
            return;
        }
        info!("world_map: activated");
        self.state = WorldMapState::Tracking;
        self.update_audio(now);
        self.check_hold(now);
        self.emit_position();
    }

    fn reset(&mut self, _now: Instant) {
        self.timers.clear();
        self.hold_start = None;
        self.intervals = [None, None];
        self.state = WorldMapState::Inactive;
        self.x = self.config.start_x;
        self.y = self.config.start_y;
        info!("world_map: reset");
        self.emit_position();
    }

    fn force_solve(&mut self, _now: Instant) {
        if self.state == WorldMapState::Solved {
            return;
        }
        self.x = self.config.target_x;
        self.y = self.config.target_y;
        self.events.push(WorldMapEvent::Position { x: self.x, y: self.y });
        info!("world_map: force-solved");
        self.solve();
    }

    fn handle_input(&mut self, input: WorldMapInput, now: Instant) {
        let WorldMapInput::Turn { axis, direction } = input;
        if self.state != WorldMapState::Tracking {
            debug!(?axis, state = ?self.state, "world_map: turn ignored");
            return;
        }
        if direction != 1 && direction != -1 {
            debug!(direction, "world_map: invalid direction dropped");
            return;
        }
        let step = f64::from(direction);
        match axis {
            Axis::X => self.x = (self.x + step / f64::from(self.config.steps_x.max(1))).clamp(0.0, 1.0),
            Axis::Y => self.y = (self.y + step / f64::from(self.config.steps_y.max(1))).clamp(0.0, 1.0),
        }
        self.update_audio(now);
        self.check_hold(now);
        self.emit_position();
    }

    fn route(&self, message: WorldMapMessage) -> Option<Route<WorldMapInput>> {
        match message {
            WorldMapMessage::Key { axis, direction } if direction == 1 || direction == -1 => {
                Some(Route::Simulated(WorldMapInput::Turn { axis, direction }))
            }
            WorldMapMessage::Key { .. } => None,
        }
    }

    fn on_timer(&mut self, timer: WorldMapTimer, now: Instant) {
        if self.state != WorldMapState::Tracking {
            return;
        }
        match timer {
            WorldMapTimer::Beep(axis) => {
                self.tone.beep();
                self.events.push(WorldMapEvent::Beep { axis });
                if let Some(interval) = self.intervals[axis.index()] {
                    self.timers.schedule_in(now, interval, WorldMapTimer::Beep(axis));
                }
            }
            WorldMapTimer::HoldTick => {
                let Some(start) = self.hold_start else {
                    return;
                };
                let elapsed = now.duration_since(start);
                let hold = self.config.hold();
                let progress = if hold.is_zero() { 1.0 } else { (elapsed.as_secs_f64() / hold.as_secs_f64()).min(1.0) };
                self.events.push(WorldMapEvent::HoldProgress { progress });
                if elapsed >= hold {
                    self.solve();
                } else {
                    self.timers.schedule_in(now, Duration::from_millis(self.config.hold_tick_ms), WorldMapTimer::HoldTick);
                }
            }
        }
    }

    fn timers(&self) -> &Timers<WorldMapTimer> {
        &self.timers
    }

    fn timers_mut(&mut self) -> &mut Timers<WorldMapTimer> {
        &mut self.timers
    }

    fn drain_events(&mut self) -> Vec<WorldMapEvent> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
#[path = "world_map_test.rs"]
mod tests;
