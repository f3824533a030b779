//! Right screen — the captive's video feed, swapped for the Gadget Code
//! display while that puzzle runs.
//!
//! DESIGN
//! ======
//! The screen shows one of two modes, plus `hack` while the room-wide hack
//! effect runs. The mode in force when the hack starts is remembered and
//! restored when it resolves. Explicit `show_*` commands also update the
//! remembered mode.

use std::collections::BTreeMap;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::config::PropDefaults;
use crate::frame::RoomCommand;
use crate::prop::{CommandError, HackSignal, Prop, PropEvent, Route};
use crate::timer::Timers;

pub const DEFAULTS: PropDefaults = PropDefaults { prop_id: "screen-right", port: 3012 };

const CLIP_ID_PREFIX: &str = "tf-";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RightScreenConfig {
    /// Clip key → filename.
    pub videos: BTreeMap<String, String>,
    /// Where the display loads the Gadget Code puzzle from.
    pub puzzle3_url: String,
}

impl Default for RightScreenConfig {
    fn default() -> Self {
        let videos = [
            ("idle", "tim-ferris-idle.mp4"),
            ("intro", "tim-ferris-intro.mp4"),
            ("escape1", "tim-ferris-escape-1.mp4"),
            ("escape2", "tim-ferris-escape-2.mp4"),
            ("rescued", "tim-ferris-rescued.mp4"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_owned(), v.to_owned()))
        .collect();
        Self { videos, puzzle3_url: "ws://localhost:3001".into() }
    }
}

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScreenMode {
    TimFerris,
    #[serde(rename = "puzzle-3")]
    Puzzle3,
    Hack,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RightInput {
    /// Toggle between the two regular modes.
    SwitchMode,
    SetMode(ScreenMode),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RightMessage {
    SwitchMode,
    SetMode { mode: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RightTimer {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RightSnapshot {
    pub mode: ScreenMode,
    pub mode_before_hack: ScreenMode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RightEvent {
    State(RightSnapshot),
    ModeChange {
        mode: ScreenMode,
    },
    #[serde(rename_all = "camelCase")]
    PlayClip {
        filename: String,
        clip_id: String,
    },
    Reset,
}

impl PropEvent for RightEvent {
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

pub struct RightScreen {
    config: RightScreenConfig,
    mode: ScreenMode,
    mode_before_hack: ScreenMode,
    timers: Timers<RightTimer>,
    events: Vec<RightEvent>,
}

impl RightScreen {
    #[must_use]
    pub fn new(config: RightScreenConfig) -> Self {
        Self {
            config,
            mode: ScreenMode::TimFerris,
            mode_before_hack: ScreenMode::TimFerris,
            timers: Timers::new(),
            events: Vec::new(),
        }
    }

    #[must_use]
    pub fn mode(&self) -> ScreenMode {
        self.mode
    }

    fn emit_state(&mut self) {
        let snapshot = self.snapshot();
        self.events.push(RightEvent::State(snapshot));
    }

    fn switch_to(&mut self, mode: ScreenMode) {
        info!(?mode, "right: mode change");
        self.mode = mode;
        self.events.push(RightEvent::ModeChange { mode });
        self.emit_state();
    }

    fn show(&mut self, mode: ScreenMode) {
        self.mode_before_hack = mode;
        self.switch_to(mode);
    }

    fn play_clip(&mut self, key: &str) -> Result<(), CommandError> {
        let filename = self.config.videos.get(key).cloned().ok_or_else(|| CommandError::UnknownClip(key.to_owned()))?;
        if self.mode == ScreenMode::Puzzle3 {
            self.switch_to(ScreenMode::TimFerris);
        }
        info!(clip = key, %filename, "right: playing clip");
        self.events.push(RightEvent::PlayClip { filename, clip_id: format!("{CLIP_ID_PREFIX}{key}") });
        Ok(())
    }
}

impl Prop for RightScreen {
    type Input = RightInput;
    type Message = RightMessage;
    type Event = RightEvent;
    type Timer = RightTimer;
    type Snapshot = RightSnapshot;

    fn manifest(&self) -> Value {
        let videos: Vec<&String> = self.config.videos.values().collect();
        json!({ "videos": videos, "puzzle3Url": self.config.puzzle3_url, "mode": self.mode })
    }

    fn snapshot(&self) -> RightSnapshot {
        RightSnapshot { mode: self.mode, mode_before_hack: self.mode_before_hack }
    }

    fn is_inactive(&self) -> bool {
        false
    }

    fn activate(&mut self, _now: Instant) {}

    fn reset(&mut self, _now: Instant) {
        info!("right: reset");
        self.mode = ScreenMode::TimFerris;
        self.mode_before_hack = ScreenMode::TimFerris;
        self.events.push(RightEvent::Reset);
        self.emit_state();
    }

    fn force_solve(&mut self, _now: Instant) {}

    fn handle_input(&mut self, input: RightInput, _now: Instant) {
        if self.mode == ScreenMode::Hack {
            debug!(?input, "right: mode change ignored during hack");
            return;
        }
        match input {
            RightInput::SwitchMode => {
                let next = match self.mode {
                    ScreenMode::TimFerris => ScreenMode::Puzzle3,
                    _ => ScreenMode::TimFerris,
                };
                self.switch_to(next);
            }
            RightInput::SetMode(mode) => self.switch_to(mode),
        }
    }

    fn route(&self, message: RightMessage) -> Option<Route<RightInput>> {
        match message {
            RightMessage::SwitchMode => Some(Route::Display(RightInput::SwitchMode)),
            RightMessage::SetMode { mode } => match mode.as_str() {
                "tim-ferris" => Some(Route::Display(RightInput::SetMode(ScreenMode::TimFerris))),
                "puzzle-3" => Some(Route::Display(RightInput::SetMode(ScreenMode::Puzzle3))),
                _ => None,
            },
        }
    }

    fn on_timer(&mut self, timer: RightTimer, _now: Instant) {
        match timer {}
    }

    fn timers(&self) -> &Timers<RightTimer> {
        &self.timers
    }

    fn timers_mut(&mut self) -> &mut Timers<RightTimer> {
        &mut self.timers
    }

    fn drain_events(&mut self) -> Vec<RightEvent> {
        std::mem::take(&mut self.events)
    }

    fn on_hack(&mut self, signal: HackSignal, _now: Instant) {
        match signal {
            HackSignal::Mode => {
                if self.mode != ScreenMode::Hack {
                    self.mode_before_hack = self.mode;
                }
                info!(restore = ?self.mode_before_hack, "right: hack mode");
                self.mode = ScreenMode::Hack;
                self.emit_state();
            }
            HackSignal::Resolved => {
                if self.mode == ScreenMode::Hack {
                    let restore = self.mode_before_hack;
                    self.switch_to(restore);
                }
            }
        }
    }

    fn room_command(&mut self, command: &RoomCommand, _now: Instant) -> Result<(), CommandError> {
        match command.command.as_str() {
            "play_clip" => {
                let key = command.arg_str("clip").ok_or(CommandError::MissingArgument("clip"))?.to_owned();
                self.play_clip(&key)
            }
            "show_puzzle_3" => {
                self.show(ScreenMode::Puzzle3);
                Ok(())
            }
            "show_tim_ferris" => {
                self.show(ScreenMode::TimFerris);
                Ok(())
            }
            _ => Err(CommandError::Unknown),
        }
    }
}

#[cfg(test)]
#[path = "right_test.rs"]
mod tests;
