//! Hardware — output sinks, input guards, and their mock stand-ins.
//!
//! DESIGN
//! ======
//! Each physical surface (an LED bank, a tone output, a set of input pins)
//! is chosen once at startup. A surface that fails to open logs a warning
//! and degrades to its mock alone; other surfaces keep their hardware.
//! State machines only see the `LedBank`/`ToneSink` traits.

pub mod decode;
pub mod gpio;

use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

#[derive(Debug, thiserror::Error)]
pub enum GpioError {
    #[error("gpio unavailable: {0}")]
    Unavailable(#[from] rppal::gpio::Error),
    #[error("gpio pin {pin} could not be claimed: {source}")]
    Pin { pin: u8, source: rppal::gpio::Error },
}

// =============================================================================
// LED OUTPUT
// =============================================================================

pub trait LedBank: Send {
    fn len(&self) -> usize;

    /// Out-of-range indexes are ignored.
    fn set(&mut self, index: usize, on: bool);

    fn get(&self, index: usize) -> bool;

    fn set_all(&mut self, on: bool) {
        for index in 0..self.len() {
            self.set(index, on);
        }
    }

    fn is_mock(&self) -> bool;
}

/// In-memory LED bank. Displays mirror it from the machine's events.
#[derive(Debug, Clone, Default)]
pub struct MockLeds {
    states: Vec<bool>,
}

impl MockLeds {
    #[must_use]
    pub fn new(len: usize) -> Self {
        Self { states: vec![false; len] }
    }
}

impl LedBank for MockLeds {
    fn len(&self) -> usize {
        self.states.len()
    }

    fn set(&mut self, index: usize, on: bool) {
        if let Some(state) = self.states.get_mut(index) {
            *state = on;
        }
    }

    fn get(&self, index: usize) -> bool {
        self.states.get(index).copied().unwrap_or(false)
    }

    fn is_mock(&self) -> bool {
        true
    }
}

/// GPIO LEDs when available, otherwise a mock bank of the same size.
#[must_use]
pub fn leds_or_mock(mock: bool, pins: &[u8]) -> Box<dyn LedBank> {
    if mock {
        return Box::new(MockLeds::new(pins.len()));
    }
    match gpio::GpioLeds::open(pins) {
        Ok(leds) => Box::new(leds),
        Err(e) => {
            warn!(error = %e, "hardware: leds unavailable, using mock");
            Box::new(MockLeds::new(pins.len()))
        }
    }
}

// =============================================================================
// TONE OUTPUT
// =============================================================================

pub trait ToneSink: Send {
    fn beep(&mut self);

    fn is_mock(&self) -> bool;
}

/// Counts beeps. Mock displays synthesize the sound from beep events.
#[derive(Debug, Clone, Default)]
pub struct MockTone {
    pub beeps: usize,
}

impl ToneSink for MockTone {
    fn beep(&mut self) {
        self.beeps += 1;
    }

    fn is_mock(&self) -> bool {
        true
    }
}

/// Plays a pre-rendered WAV through `aplay`. Each beep is a detached child
/// process; a failed spawn disables the sink.
pub struct AplayTone {
    wav: Arc<[u8]>,
    failed: bool,
}

impl AplayTone {
    #[must_use]
    pub fn new(freq_hz: u32, duration_ms: u32) -> Self {
        Self { wav: beep_wav(freq_hz, duration_ms).into(), failed: false }
    }
}

impl ToneSink for AplayTone {
    fn beep(&mut self) {
        if self.failed {
            return;
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let child = tokio::process::Command::new("aplay")
            .args(["-q", "-"])
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .spawn();
        let mut child = match child {
            Ok(child) => child,
            Err(e) => {
                warn!(error = %e, "hardware: aplay unavailable, beeps disabled");
                self.failed = true;
                return;
            }
        };
        let wav = Arc::clone(&self.wav);
        runtime.spawn(async move {
            if let Some(mut stdin) = child.stdin.take() {
                if let Err(e) = stdin.write_all(&wav).await {
                    debug!(error = %e, "hardware: beep write failed");
                }
            }
            let _ = child.wait().await;
        });
    }

    fn is_mock(&self) -> bool {
        false
    }
}

#[must_use]
pub fn tone_or_mock(mock: bool, freq_hz: u32, duration_ms: u32) -> Box<dyn ToneSink> {
    if mock { Box::new(MockTone::default()) } else { Box::new(AplayTone::new(freq_hz, duration_ms)) }
}

const SAMPLE_RATE: u32 = 44_100;
/// Longest beep rendered; longer requests are cut to this.
pub const MAX_BEEP_MS: u32 = 5_000;

/// 16-bit mono PCM sine beep with a 10% fade at each end.
#[must_use]
pub fn beep_wav(freq_hz: u32, duration_ms: u32) -> Vec<u8> {
    let samples = SAMPLE_RATE * duration_ms.min(MAX_BEEP_MS) / 1000;
    let data_len = samples * 2;
    let mut wav = Vec::with_capacity(44 + data_len as usize);

    wav.extend_from_slice(b"RIFF");
    wav.extend_from_slice(&(36 + data_len).to_le_bytes());
    wav.extend_from_slice(b"WAVE");
    wav.extend_from_slice(b"fmt ");
    wav.extend_from_slice(&16u32.to_le_bytes());
    wav.extend_from_slice(&1u16.to_le_bytes());
    wav.extend_from_slice(&1u16.to_le_bytes());
    wav.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
    wav.extend_from_slice(&(SAMPLE_RATE * 2).to_le_bytes());
    wav.extend_from_slice(&2u16.to_le_bytes());
    wav.extend_from_slice(&16u16.to_le_bytes());
    wav.extend_from_slice(b"data");
    wav.extend_from_slice(&data_len.to_le_bytes());

    let fade = (samples / 10).max(1);
    for i in 0..samples {
        let envelope = if i < fade {
            f64::from(i) / f64::from(fade)
        } else if i > samples - fade {
            f64::from(samples - i) / f64::from(fade)
        } else {
            1.0
        };
        let phase = 2.0 * std::f64::consts::PI * f64::from(freq_hz) * f64::from(i) / f64::from(SAMPLE_RATE);
        #[allow(clippy::cast_possible_truncation)]
        let sample = (0.5 * envelope * 32767.0 * phase.sin()) as i16;
        wav.extend_from_slice(&sample.to_le_bytes());
    }
    wav
}

// =============================================================================
// INPUT GUARD
// =============================================================================

/// Keeps input pins claimed and polling tasks alive. Dropping it releases
/// the pins and stops the tasks.
#[derive(Default)]
pub struct InputGuard {
    pins: Vec<rppal::gpio::InputPin>,
    tasks: Vec<JoinHandle<()>>,
}

impl InputGuard {
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    pub fn hold_pin(&mut self, pin: rppal::gpio::InputPin) {
        self.pins.push(pin);
    }

    pub fn hold_task(&mut self, task: JoinHandle<()>) {
        self.tasks.push(task);
    }

    pub fn merge(&mut self, mut other: InputGuard) {
        self.pins.append(&mut other.pins);
        self.tasks.append(&mut other.tasks);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pins.is_empty() && self.tasks.is_empty()
    }
}

impl Drop for InputGuard {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
        for pin in &mut self.pins {
            let _ = pin.clear_async_interrupt();
        }
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
