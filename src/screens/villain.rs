//! Villain screen — idle loop, scripted clips, and the hack takeover.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::info;

use crate::config::PropDefaults;
use crate::frame::RoomCommand;
use crate::prop::{CommandError, HackSignal, Prop, PropEvent, Route};
use crate::timer::Timers;

pub const DEFAULTS: PropDefaults = PropDefaults { prop_id: "screen-villain", port: 3010 };

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct VillainVideos {
    pub intro: String,
    pub idle: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct VillainConfig {
    pub videos: VillainVideos,
}

impl Default for VillainVideos {
    fn default() -> Self {
        Self { intro: "villain-intro.mp4".into(), idle: "villain-idle.mp4".into() }
    }
}

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VillainMode {
    Idle,
    Clip,
    Hack,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VillainInput {
    ClipEnded,
    /// Mock stand-in for the room-wide hack signals.
    Hack(HackSignal),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum VillainMessage {
    ClipEnded {
        #[serde(default)]
        filename: Option<String>,
    },
    HackMode,
    HackResolved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VillainTimer {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VillainSnapshot {
    pub mode: VillainMode,
    pub current_clip: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum VillainEvent {
    State(VillainSnapshot),
    PlayClip { filename: String },
    HackMode,
    HackResolved,
    Reset,
}

impl PropEvent for VillainEvent {
    fn room_changes(&self) -> Option<Value> {
        match self {
            Self::State(s) => Some(json!({ "mode": s.mode, "currentClip": s.current_clip })),
            _ => None,
        }
    }
}

// =============================================================================
// MACHINE
// =============================================================================

pub struct VillainScreen {
    config: VillainConfig,
    mode: VillainMode,
    current_clip: Option<String>,
    timers: Timers<VillainTimer>,
    events: Vec<VillainEvent>,
}

impl VillainScreen {
    #[must_use]
    pub fn new(config: VillainConfig) -> Self {
        Self { config, mode: VillainMode::Idle, current_clip: None, timers: Timers::new(), events: Vec::new() }
    }

    #[must_use]
    pub fn mode(&self) -> VillainMode {
        self.mode
    }

    fn set(&mut self, mode: VillainMode, clip: Option<String>) {
        self.mode = mode;
        self.current_clip = clip;
        let snapshot = self.snapshot();
        self.events.push(VillainEvent::State(snapshot));
    }

    fn play(&mut self, filename: String) {
        info!(%filename, "villain: playing clip");
        self.set(VillainMode::Clip, Some(filename.clone()));
        self.events.push(VillainEvent::PlayClip { filename });
    }

    fn apply_hack(&mut self, signal: HackSignal) {
        info!(?signal, "villain: hack signal");
        match signal {
            HackSignal::Mode => self.set(VillainMode::Hack, None),
            HackSignal::Resolved => self.set(VillainMode::Idle, None),
        }
    }
}

impl Prop for VillainScreen {
    type Input = VillainInput;
    type Message = VillainMessage;
    type Event = VillainEvent;
    type Timer = VillainTimer;
    type Snapshot = VillainSnapshot;

    fn manifest(&self) -> Value {
        json!({ "videos": [self.config.videos.intro, self.config.videos.idle] })
    }

    fn snapshot(&self) -> VillainSnapshot {
        VillainSnapshot { mode: self.mode, current_clip: self.current_clip.clone() }
    }

    fn is_inactive(&self) -> bool {
        false
    }

    fn activate(&mut self, _now: Instant) {
        let intro = self.config.videos.intro.clone();
        self.play(intro);
    }

    fn reset(&mut self, _now: Instant) {
        info!("villain: reset");
        self.set(VillainMode::Idle, None);
        self.events.push(VillainEvent::Reset);
    }

    fn force_solve(&mut self, _now: Instant) {}

    fn handle_input(&mut self, input: VillainInput, _now: Instant) {
        match input {
            VillainInput::ClipEnded => self.set(VillainMode::Idle, None),
            VillainInput::Hack(signal) => {
                self.apply_hack(signal);
                self.events.push(match signal {
                    HackSignal::Mode => VillainEvent::HackMode,
                    HackSignal::Resolved => VillainEvent::HackResolved,
                });
            }
        }
    }

    fn route(&self, message: VillainMessage) -> Option<Route<VillainInput>> {
        Some(match message {
            VillainMessage::ClipEnded { filename } => {
                info!(filename = filename.as_deref().unwrap_or("?"), "villain: clip ended");
                Route::Display(VillainInput::ClipEnded)
            }
            VillainMessage::HackMode => Route::Simulated(VillainInput::Hack(HackSignal::Mode)),
            VillainMessage::HackResolved => Route::Simulated(VillainInput::Hack(HackSignal::Resolved)),
        })
    }

    fn on_timer(&mut self, timer: VillainTimer, _now: Instant) {
        match timer {}
    }

    fn timers(&self) -> &Timers<VillainTimer> {
        &self.timers
    }

    fn timers_mut(&mut self) -> &mut Timers<VillainTimer> {
        &mut self.timers
    }

    fn drain_events(&mut self) -> Vec<VillainEvent> {
        std::mem::take(&mut self.events)
    }

    fn on_hack(&mut self, signal: HackSignal, _now: Instant) {
        self.apply_hack(signal);
    }

    fn room_command(&mut self, command: &RoomCommand, _now: Instant) -> Result<(), CommandError> {
        match command.command.as_str() {
            "play_clip" => {
                let filename = command.arg_str("filename").ok_or(CommandError::MissingArgument("filename"))?;
                self.play(filename.to_owned());
                Ok(())
            }
            _ => Err(CommandError::Unknown),
        }
    }
}

#[cfg(test)]
#[path = "villain_test.rs"]
mod tests;
