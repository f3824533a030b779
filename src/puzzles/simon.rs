//! Simon — ten lit buttons, press each one while it is lit.
//!
//! DESIGN
//! ======
//! Every unlocked button runs its own blink cycle: `BlinkOn` after a random
//! delay, `BlinkOff` after `blink_duration`, then another random delay. A
//! correct press locks the button and cancels its cycle. A wrong press
//! flashes the whole panel for `wrong_flash_duration`; when the flash ends
//! each LED returns to `locked || lit`.

use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::config::PropDefaults;
use crate::hardware::LedBank;
use crate::prop::{HackSignal, Prop, PropEvent, Route};
use crate::timer::Timers;

pub const DEFAULTS: PropDefaults = PropDefaults { prop_id: "puzzle-1-simon", port: 3004 };

// =============================================================================
// CONFIG
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ButtonConfig {
    pub id: u8,
    pub button_pin: u8,
    pub led_pin: u8,
    #[serde(default = "default_color")]
    pub color: String,
}

fn default_color() -> String {
    "white".into()
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SimonConfig {
    pub buttons: Vec<ButtonConfig>,
    pub blink_interval_min: u64,
    pub blink_interval_max: u64,
    pub blink_duration: u64,
    pub wrong_flash_duration: u64,
}

impl Default for SimonConfig {
    fn default() -> Self {
        const PINS: [(u8, u8); 10] = [(16, 0), (19, 1), (20, 22), (26, 23), (5, 2), (6, 3), (13, 4), (27, 7), (17, 8), (14, 9)];
        let buttons = (1u8..)
            .zip(PINS)
            .map(|(id, (button_pin, led_pin))| ButtonConfig { id, button_pin, led_pin, color: default_color() })
            .collect();
        Self { buttons, blink_interval_min: 1000, blink_interval_max: 3000, blink_duration: 600, wrong_flash_duration: 300 }
    }
}

impl SimonConfig {
    #[must_use]
    pub fn led_pins(&self) -> Vec<u8> {
        self.buttons.iter().map(|b| b.led_pin).collect()
    }

    #[must_use]
    pub fn button_pins(&self) -> Vec<(u8, u8)> {
        self.buttons.iter().map(|b| (b.id, b.button_pin)).collect()
    }
}

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SimonState {
    Inactive,
    Active,
    Solved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimonInput {
    Press(u8),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SimonMessage {
    ButtonPress {
        #[serde(rename = "buttonId")]
        button_id: u8,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimonTimer {
    BlinkOn(usize),
    BlinkOff(usize),
    FlashEnd,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimonSnapshot {
    pub state: SimonState,
    pub total_buttons: usize,
    pub pressed_count: usize,
    pub pressed_buttons: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SimonEvent {
    State(SimonSnapshot),
    ButtonBlink {
        #[serde(rename = "buttonId")]
        button_id: u8,
        #[serde(rename = "isLit")]
        is_lit: bool,
    },
    CorrectPress {
        #[serde(rename = "buttonId")]
        button_id: u8,
    },
    WrongPress {
        #[serde(rename = "buttonId")]
        button_id: u8,
    },
    LedChange {
        #[serde(rename = "buttonId")]
        button_id: u8,
        state: bool,
    },
    HackResolved,
}

impl PropEvent for SimonEvent {
    fn room_changes(&self) -> Option<Value> {
        let Self::State(snapshot) = self else {
            return None;
        };
        #[allow(clippy::cast_precision_loss)]
        let progress = if snapshot.total_buttons == 0 {
            0.0
        } else {
            snapshot.pressed_count as f64 / snapshot.total_buttons as f64
        };
        let mut changes = json!({ "state": snapshot.state, "progress": progress });
        if snapshot.state == SimonState::Solved {
            changes["hackResolved"] = json!(true);
        }
        Some(changes)
    }

    fn mock_only(&self) -> bool {
        matches!(self, Self::LedChange { .. })
    }
}

// =============================================================================
// MACHINE
// =============================================================================

pub struct Simon {
    config: SimonConfig,
    state: SimonState,
    lit: Vec<bool>,
    locked: Vec<bool>,
    pressed: Vec<u8>,
    flashing: bool,
    leds: Box<dyn LedBank>,
    rng: StdRng,
    timers: Timers<SimonTimer>,
    events: Vec<SimonEvent>,
}

impl Simon {
    #[must_use]
    pub fn new(config: SimonConfig, leds: Box<dyn LedBank>, rng: StdRng) -> Self {
        let count = config.buttons.len();
        info!(buttons = count, mock_leds = leds.is_mock(), "simon: created");
        Self {
            config,
            state: SimonState::Inactive,
            lit: vec![false; count],
            locked: vec![false; count],
            pressed: Vec::new(),
            flashing: false,
            leds,
            rng,
            timers: Timers::new(),
            events: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_entropy(config: SimonConfig, leds: Box<dyn LedBank>) -> Self {
        Self::new(config, leds, StdRng::from_os_rng())
    }

    #[must_use]
    pub fn state(&self) -> SimonState {
        self.state
    }

    /// Whether button `id` is currently in the lit half of its blink.
    #[must_use]
    pub fn is_lit(&self, id: u8) -> bool {
        self.index_of(id).is_some_and(|idx| self.lit[idx])
    }

    #[must_use]
    pub fn led(&self, id: u8) -> bool {
        self.index_of(id).is_some_and(|idx| self.leds.get(idx))
    }

    fn index_of(&self, id: u8) -> Option<usize> {
        self.config.buttons.iter().position(|b| b.id == id)
    }

    fn id_at(&self, idx: usize) -> u8 {
        self.config.buttons[idx].id
    }

    fn set_led(&mut self, idx: usize, on: bool) {
        self.leds.set(idx, on);
        let button_id = self.id_at(idx);
        self.events.push(SimonEvent::LedChange { button_id, state: on });
    }

    fn set_all_leds(&mut self, on: bool) {
        for idx in 0..self.config.buttons.len() {
            self.set_led(idx, on);
        }
    }

    fn blink_delay(&mut self) -> Duration {
        let (min, max) = (self.config.blink_interval_min, self.config.blink_interval_max);
        let ms = if max > min { self.rng.random_range(min..max) } else { min };
        Duration::from_millis(ms)
    }

    fn schedule_blink(&mut self, idx: usize, now: Instant) {
        let delay = self.blink_delay();
        self.timers.schedule_in(now, delay, SimonTimer::BlinkOn(idx));
    }

    fn emit_state(&mut self) {
        let snapshot = self.snapshot();
        self.events.push(SimonEvent::State(snapshot));
    }

    fn solve(&mut self) {
        self.timers.clear();
        self.flashing = false;
        self.state = SimonState::Solved;
        self.set_all_leds(true);
        info!(pressed = self.pressed.len(), "simon: solved");
        self.emit_state();
        self.events.push(SimonEvent::HackResolved);
    }

    fn wrong_press(&mut self, button_id: u8, now: Instant) {
        debug!(button_id, "simon: wrong press");
        self.events.push(SimonEvent::WrongPress { button_id });
        self.flashing = true;
        self.set_all_leds(true);
        self.timers.cancel_where(|t| *t == SimonTimer::FlashEnd);
        self.timers.schedule_in(now, Duration::from_millis(self.config.wrong_flash_duration), SimonTimer::FlashEnd);
    }
}

impl Prop for Simon {
    type Input = SimonInput;
    type Message = SimonMessage;
    type Event = SimonEvent;
    type Timer = SimonTimer;
    type Snapshot = SimonSnapshot;

    fn manifest(&self) -> Value {
        json!({ "buttons": self.config.buttons })
    }

    fn snapshot(&self) -> SimonSnapshot {
        SimonSnapshot {
            state: self.state,
            total_buttons: self.config.buttons.len(),
            pressed_count: self.pressed.len(),
            pressed_buttons: self.pressed.clone(),
        }
    }

    fn is_inactive(&self) -> bool {
        self.state == SimonState::Inactive
    }

    fn activate(&mut self, now: Instant) {
        if self.state != SimonState::Inactive {
            return;
        }
        info!(buttons = self.config.buttons.len(), "simon: activated");
        self.state = SimonState::Active;
        self.pressed.clear();
        self.lit.fill(false);
        self.locked.fill(false);
        self.set_all_leds(false);
        for idx in 0..self.config.buttons.len() {
            self.schedule_blink(idx, now);
        }
        self.emit_state();
    }

    fn reset(&mut self, _now: Instant) {
        self.timers.clear();
        self.state = SimonState::Inactive;
        self.pressed.clear();
        self.lit.fill(false);
        self.locked.fill(false);
        self.flashing = false;
        self.set_all_leds(false);
        info!("simon: reset");
        self.emit_state();
    }

    fn force_solve(&mut self, _now: Instant) {
        if self.state == SimonState::Solved {
            return;
        }
        self.timers.clear();
        for idx in 0..self.config.buttons.len() {
            if !self.locked[idx] {
                self.locked[idx] = true;
                let id = self.id_at(idx);
                self.pressed.push(id);
            }
        }
        info!("simon: force-solved");
        self.solve();
    }

    fn handle_input(&mut self, input: SimonInput, now: Instant) {
        let SimonInput::Press(button_id) = input;
        if self.state != SimonState::Active {
            debug!(button_id, state = ?self.state, "simon: press ignored");
            return;
        }
        let Some(idx) = self.index_of(button_id) else {
            debug!(button_id, "simon: unknown button dropped");
            return;
        };

        if !self.lit[idx] || self.locked[idx] {
            self.wrong_press(button_id, now);
            return;
        }

        self.locked[idx] = true;
        self.pressed.push(button_id);
        self.timers.cancel_where(|t| matches!(t, SimonTimer::BlinkOn(i) | SimonTimer::BlinkOff(i) if *i == idx));
        if !self.flashing {
            self.set_led(idx, true);
        }
        info!(button_id, pressed = self.pressed.len(), "simon: correct press");
        self.events.push(SimonEvent::CorrectPress { button_id });
        self.emit_state();

        if self.locked.iter().all(|l| *l) {
            self.solve();
        }
    }

    fn route(&self, message: SimonMessage) -> Option<Route<SimonInput>> {
        match message {
            SimonMessage::ButtonPress { button_id } => Some(Route::Simulated(SimonInput::Press(button_id))),
        }
    }

    fn on_timer(&mut self, timer: SimonTimer, now: Instant) {
        if self.state != SimonState::Active {
            return;
        }
        match timer {
            SimonTimer::BlinkOn(idx) => {
                if self.locked[idx] {
                    return;
                }
                self.lit[idx] = true;
                if !self.flashing {
                    self.set_led(idx, true);
                }
                let button_id = self.id_at(idx);
                self.events.push(SimonEvent::ButtonBlink { button_id, is_lit: true });
                self.timers.schedule_in(now, Duration::from_millis(self.config.blink_duration), SimonTimer::BlinkOff(idx));
            }
            SimonTimer::BlinkOff(idx) => {
                if self.locked[idx] {
                    return;
                }
                self.lit[idx] = false;
                if !self.flashing {
                    self.set_led(idx, false);
                }
                let button_id = self.id_at(idx);
                self.events.push(SimonEvent::ButtonBlink { button_id, is_lit: false });
                self.schedule_blink(idx, now);
            }
            SimonTimer::FlashEnd => {
                self.flashing = false;
                for idx in 0..self.config.buttons.len() {
                    let on = self.locked[idx] || self.lit[idx];
                    self.set_led(idx, on);
                }
            }
        }
    }

    fn timers(&self) -> &Timers<SimonTimer> {
        &self.timers
    }

    fn timers_mut(&mut self) -> &mut Timers<SimonTimer> {
        &mut self.timers
    }

    fn drain_events(&mut self) -> Vec<SimonEvent> {
        std::mem::take(&mut self.events)
    }

    fn on_hack(&mut self, signal: HackSignal, now: Instant) {
        if signal == HackSignal::Mode && self.state == SimonState::Inactive {
            self.activate(now);
        }
    }
}

#[cfg(test)]
#[path = "simon_test.rs"]
mod tests;
