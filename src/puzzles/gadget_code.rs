//! Gadget Code — three video situations, each unlocked by a 4-digit code.
//!
//! DESIGN
//! ======
//! The machine never times clips itself. Every `playClip` is answered by
//! the display with `clipEnded` (or `situationClipEnded`) and only the
//! answer matching the clip currently playing moves the machine on. While
//! a clip plays, keypad input is ignored.
//!
//! ```text
//! inactive → intro → playing_clip(situation n) → situation
//!   situation --submit ok--> playing_clip(correct) → next situation | playing_clip(solved) → solved
//!   situation --submit bad-> playing_clip(wrong) → situation
//! ```

use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::config::PropDefaults;
use crate::hardware::LedBank;
use crate::hardware::decode::Key;
use crate::prop::{Prop, PropEvent, Route};
use crate::timer::Timers;

pub const DEFAULTS: PropDefaults = PropDefaults { prop_id: "puzzle-3-gadget-code", port: 3001 };

// =============================================================================
// CONFIG
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Situation {
    pub video: String,
    pub correct_code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Videos {
    pub intro: String,
    pub correct: String,
    pub wrong: String,
    pub solved: String,
    pub idle: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct KeypadPins {
    pub d0: u8,
    pub d1: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GadgetCodeConfig {
    pub situations: Vec<Situation>,
    pub videos: Videos,
    pub code_length: usize,
    pub led_pins: Vec<u8>,
    pub keypad_pins: KeypadPins,
}

impl Default for GadgetCodeConfig {
    fn default() -> Self {
        let situations = ["4729", "8153", "3946"]
            .iter()
            .enumerate()
            .map(|(i, code)| Situation { video: format!("situation-{}.mp4", i + 1), correct_code: (*code).to_string() })
            .collect();
        Self {
            situations,
            videos: Videos {
                intro: "intro.mp4".into(),
                correct: "correct.mp4".into(),
                wrong: "wrong.mp4".into(),
                solved: "solved.mp4".into(),
                idle: "idle.mp4".into(),
            },
            code_length: 4,
            led_pins: vec![24, 25, 12],
            keypad_pins: KeypadPins { d0: 17, d1: 27 },
        }
    }
}

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GadgetState {
    Inactive,
    Intro,
    PlayingClip,
    Situation,
    Solved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Clip {
    Situation(usize),
    Correct,
    Wrong,
    Solved,
}

impl Clip {
    fn id(self) -> String {
        match self {
            Self::Situation(index) => format!("situation-{}", index + 1),
            Self::Correct => "correct".into(),
            Self::Wrong => "wrong".into(),
            Self::Solved => "solved".into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Inactive,
    Intro,
    Playing(Clip),
    Situation,
    Solved,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GadgetInput {
    Digit(u8),
    Submit,
    Delete,
    Clear,
    ClipEnded(String),
    SituationClipEnded,
}

impl From<Key> for GadgetInput {
    fn from(key: Key) -> Self {
        match key {
            Key::Digit(d) => Self::Digit(d),
            Key::Star => Self::Clear,
            Key::Hash => Self::Submit,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum DigitField {
    Number(u8),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum GadgetMessage {
    Digit { digit: DigitField },
    Submit,
    Delete,
    Clear,
    ClipEnded {
        #[serde(rename = "clipId")]
        clip_id: String,
    },
    SituationClipEnded,
}

/// No internal timers: clip ends come from the display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GadgetTimer {}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GadgetSnapshot {
    pub state: GadgetState,
    pub current_situation: usize,
    pub total_situations: usize,
    pub code_length: usize,
    pub code_progress: usize,
    pub leds: Vec<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum GadgetEvent {
    State(GadgetSnapshot),
    PlayClip {
        filename: String,
        #[serde(rename = "clipId")]
        clip_id: String,
    },
    ShowIdle {
        #[serde(rename = "situationIndex")]
        situation_index: usize,
    },
    CodeProgress { entered: usize, total: usize },
    CodeResult { correct: bool, code: String },
}

impl PropEvent for GadgetEvent {
    fn room_changes(&self) -> Option<Value> {
        let Self::State(snapshot) = self else {
            return None;
        };
        #[allow(clippy::cast_precision_loss)]
        let progress = if snapshot.total_situations == 0 {
            0.0
        } else {
            snapshot.current_situation as f64 / snapshot.total_situations as f64
        };
        Some(json!({ "state": snapshot.state, "progress": progress }))
    }
}

// =============================================================================
// MACHINE
// =============================================================================

pub struct GadgetCode {
    config: GadgetCodeConfig,
    phase: Phase,
    current: usize,
    buffer: String,
    leds: Box<dyn LedBank>,
    timers: Timers<GadgetTimer>,
    events: Vec<GadgetEvent>,
}

impl GadgetCode {
    #[must_use]
    pub fn new(config: GadgetCodeConfig, leds: Box<dyn LedBank>) -> Self {
        info!(situations = config.situations.len(), mock_leds = leds.is_mock(), "gadget_code: created");
        Self {
            config,
            phase: Phase::Inactive,
            current: 0,
            buffer: String::new(),
            leds,
            timers: Timers::new(),
            events: Vec::new(),
        }
    }

    #[must_use]
    pub fn state(&self) -> GadgetState {
        match self.phase {
            Phase::Inactive => GadgetState::Inactive,
            Phase::Intro => GadgetState::Intro,
            Phase::Playing(_) => GadgetState::PlayingClip,
            Phase::Situation => GadgetState::Situation,
            Phase::Solved => GadgetState::Solved,
        }
    }

    /// The clip the display is expected to be playing.
    #[must_use]
    pub fn playing(&self) -> Option<Clip> {
        match self.phase {
            Phase::Playing(clip) => Some(clip),
            _ => None,
        }
    }

    #[must_use]
    pub fn current_situation(&self) -> usize {
        self.current
    }

    fn total(&self) -> usize {
        self.config.situations.len()
    }

    fn emit_state(&mut self) {
        let snapshot = self.snapshot();
        self.events.push(GadgetEvent::State(snapshot));
    }

    fn emit_progress(&mut self) {
        self.events.push(GadgetEvent::CodeProgress { entered: self.buffer.len(), total: self.config.code_length });
        self.emit_state();
    }

    fn play(&mut self, clip: Clip) {
        let filename = match clip {
            Clip::Situation(index) => self.config.situations[index].video.clone(),
            Clip::Correct => self.config.videos.correct.clone(),
            Clip::Wrong => self.config.videos.wrong.clone(),
            Clip::Solved => self.config.videos.solved.clone(),
        };
        debug!(%filename, "gadget_code: play clip");
        self.phase = Phase::Playing(clip);
        self.events.push(GadgetEvent::PlayClip { filename, clip_id: clip.id() });
        self.emit_state();
    }

    fn play_next(&mut self) {
        if self.current >= self.total() {
            self.play(Clip::Solved);
        } else {
            self.play(Clip::Situation(self.current));
        }
    }

    fn enter_situation(&mut self) {
        self.phase = Phase::Situation;
        self.buffer.clear();
        info!(situation = self.current + 1, "gadget_code: awaiting code");
        self.events.push(GadgetEvent::ShowIdle { situation_index: self.current });
        self.emit_state();
    }

    fn clip_ended(&mut self, clip_id: &str) {
        match self.phase {
            Phase::Intro if clip_id == "intro" => self.play_next(),
            Phase::Playing(clip) if clip.id() == clip_id => match clip {
                Clip::Situation(_) | Clip::Wrong => self.enter_situation(),
                Clip::Correct => self.play_next(),
                Clip::Solved => {
                    self.phase = Phase::Solved;
                    info!("gadget_code: solved");
                    self.emit_state();
                }
            },
            _ => debug!(clip_id, phase = ?self.phase, "gadget_code: stale clip end ignored"),
        }
    }

    fn submit(&mut self) {
        if self.buffer.is_empty() {
            return;
        }
        let entered = std::mem::take(&mut self.buffer);
        let correct = self.config.situations.get(self.current).is_some_and(|s| s.correct_code == entered);
        info!(situation = self.current + 1, correct, "gadget_code: code submitted");
        self.events.push(GadgetEvent::CodeResult { correct, code: entered });
        if correct {
            self.leds.set(self.current, true);
            self.current += 1;
            self.play(Clip::Correct);
        } else {
            self.play(Clip::Wrong);
        }
    }
}

impl Prop for GadgetCode {
    type Input = GadgetInput;
    type Message = GadgetMessage;
    type Event = GadgetEvent;
    type Timer = GadgetTimer;
    type Snapshot = GadgetSnapshot;

    fn manifest(&self) -> Value {
        let videos = &self.config.videos;
        let mut manifest: Vec<&str> = self.config.situations.iter().map(|s| s.video.as_str()).collect();
        manifest.extend([&videos.intro, &videos.correct, &videos.wrong, &videos.solved, &videos.idle].map(String::as_str));
        json!({
            "videos": manifest,
            "codeLength": self.config.code_length,
            "totalSituations": self.total(),
        })
    }

    fn snapshot(&self) -> GadgetSnapshot {
        GadgetSnapshot {
            state: self.state(),
            current_situation: self.current,
            total_situations: self.total(),
            code_length: self.config.code_length,
            code_progress: self.buffer.len(),
            leds: (0..self.leds.len()).map(|i| self.leds.get(i)).collect(),
        }
    }

    fn is_inactive(&self) -> bool {
        self.phase == Phase::Inactive
    }

    fn activate(&mut self, _now: Instant) {
        if self.phase != Phase::Inactive {
            return;
        }
        info!("gadget_code: activated");
        self.phase = Phase::Intro;
        self.current = 0;
        self.buffer.clear();
        self.leds.set_all(false);
        self.events.push(GadgetEvent::PlayClip { filename: self.config.videos.intro.clone(), clip_id: "intro".into() });
        self.emit_state();
    }

    fn reset(&mut self, _now: Instant) {
        self.timers.clear();
        self.phase = Phase::Inactive;
        self.current = 0;
        self.buffer.clear();
        self.leds.set_all(false);
        info!("gadget_code: reset");
        self.emit_state();
    }

    fn force_solve(&mut self, _now: Instant) {
        if self.phase == Phase::Solved {
            return;
        }
        self.timers.clear();
        self.leds.set_all(true);
        self.current = self.total();
        self.buffer.clear();
        self.phase = Phase::Solved;
        info!("gadget_code: force-solved");
        self.events.push(GadgetEvent::PlayClip { filename: self.config.videos.solved.clone(), clip_id: "solved".into() });
        self.emit_state();
    }

    fn handle_input(&mut self, input: GadgetInput, _now: Instant) {
        match input {
            GadgetInput::ClipEnded(clip_id) => self.clip_ended(&clip_id),
            GadgetInput::SituationClipEnded => {
                if matches!(self.phase, Phase::Playing(Clip::Situation(_))) {
                    self.enter_situation();
                }
            }
            _ if self.phase != Phase::Situation => debug!(?input, phase = ?self.phase, "gadget_code: input ignored"),
            GadgetInput::Digit(digit) => {
                if digit > 9 || self.buffer.len() >= self.config.code_length {
                    return;
                }
                self.buffer.push(char::from(b'0' + digit));
                self.emit_progress();
            }
            GadgetInput::Submit => self.submit(),
            GadgetInput::Delete => {
                if self.buffer.pop().is_some() {
                    self.emit_progress();
                }
            }
            GadgetInput::Clear => {
                self.buffer.clear();
                self.emit_progress();
            }
        }
    }

    fn route(&self, message: GadgetMessage) -> Option<Route<GadgetInput>> {
        let route = match message {
            GadgetMessage::Digit { digit } => {
                let value = match digit {
                    DigitField::Number(n) => n,
                    DigitField::Text(text) => text.trim().parse().ok()?,
                };
                Route::Simulated(GadgetInput::Digit(value))
            }
            GadgetMessage::Submit => Route::Simulated(GadgetInput::Submit),
            GadgetMessage::Delete => Route::Simulated(GadgetInput::Delete),
            GadgetMessage::Clear => Route::Simulated(GadgetInput::Clear),
            GadgetMessage::ClipEnded { clip_id } => Route::Display(GadgetInput::ClipEnded(clip_id)),
            GadgetMessage::SituationClipEnded => Route::Display(GadgetInput::SituationClipEnded),
        };
        Some(route)
    }

    fn on_timer(&mut self, timer: GadgetTimer, _now: Instant) {
        match timer {}
    }

    fn timers(&self) -> &Timers<GadgetTimer> {
        &self.timers
    }

    fn timers_mut(&mut self) -> &mut Timers<GadgetTimer> {
        &mut self.timers
    }

    fn drain_events(&mut self) -> Vec<GadgetEvent> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
#[path = "gadget_code_test.rs"]
mod tests;
