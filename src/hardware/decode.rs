//! Pure decoders turning raw pin activity into input events.
//!
//! DESIGN
//! ======
//! Interrupt callbacks and polling loops only feed these decoders; none of
//! them touch GPIO themselves, so every edge case is testable with
//! synthetic timestamps.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

// =============================================================================
// WIEGAND
// =============================================================================

/// Silence after the last pulse that closes a Wiegand frame.
pub const WIEGAND_FRAME_GAP: Duration = Duration::from_millis(50);

/// A decoded keypad key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Digit(u8),
    /// `*`, mapped to clear.
    Star,
    /// `#`, mapped to submit.
    Hash,
}

impl Key {
    #[must_use]
    pub fn from_value(value: u8) -> Option<Self> {
        match value {
            0..=9 => Some(Self::Digit(value)),
            10 => Some(Self::Star),
            11 => Some(Self::Hash),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WiegandFrame {
    Key(Key),
    /// 26+ bit card read. Not used by keypad props.
    Card { bits: usize },
    Invalid { bits: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum WiegandPhase {
    Idle,
    Accumulating { bits: Vec<u8>, last_pulse: Instant },
}

/// Bit accumulator for a Wiegand D0/D1 pair.
#[derive(Debug, Clone)]
pub struct WiegandDecoder {
    phase: WiegandPhase,
    gap: Duration,
}

impl Default for WiegandDecoder {
    fn default() -> Self {
        Self::new(WIEGAND_FRAME_GAP)
    }
}

impl WiegandDecoder {
    #[must_use]
    pub fn new(gap: Duration) -> Self {
        Self { phase: WiegandPhase::Idle, gap }
    }

    /// Record a pulse on D0 (`bit = 0`) or D1 (`bit = 1`).
    pub fn pulse(&mut self, bit: u8, at: Instant) {
        match &mut self.phase {
            WiegandPhase::Idle => {
                self.phase = WiegandPhase::Accumulating { bits: vec![bit & 1], last_pulse: at };
            }
            WiegandPhase::Accumulating { bits, last_pulse } => {
                bits.push(bit & 1);
                *last_pulse = at;
            }
        }
    }

    /// When the current frame closes, if one is open.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        match &self.phase {
            WiegandPhase::Idle => None,
            WiegandPhase::Accumulating { last_pulse, .. } => Some(*last_pulse + self.gap),
        }
    }

    /// Close the frame if the line has been silent for the frame gap.
    pub fn poll(&mut self, now: Instant) -> Option<WiegandFrame> {
        let deadline = self.deadline()?;
        if now < deadline {
            return None;
        }
        let WiegandPhase::Accumulating { bits, .. } = std::mem::replace(&mut self.phase, WiegandPhase::Idle) else {
            return None;
        };
        Some(decode_wiegand(&bits))
    }
}

fn bits_to_value(bits: &[u8]) -> u32 {
    bits.iter().fold(0, |acc, &b| (acc << 1) | u32::from(b))
}

/// 4-bit frames carry the key directly. 8-bit frames carry the key in the
/// low nibble and its complement in the high nibble.
#[must_use]
pub fn decode_wiegand(bits: &[u8]) -> WiegandFrame {
    let invalid = WiegandFrame::Invalid { bits: bits.len() };
    match bits.len() {
        4 => u8::try_from(bits_to_value(bits)).ok().and_then(Key::from_value).map_or(invalid, WiegandFrame::Key),
        8 => {
            let Ok(value) = u8::try_from(bits_to_value(bits)) else {
                return invalid;
            };
            let (high, low) = (value >> 4, value & 0x0f);
            if high != !low & 0x0f {
                return invalid;
            }
            Key::from_value(low).map_or(invalid, WiegandFrame::Key)
        }
        n if n >= 26 => WiegandFrame::Card { bits: n },
        _ => invalid,
    }
}

// =============================================================================
// ROTARY ENCODER
// =============================================================================

/// Step direction from a CLK edge, given the CLK level after the edge and
/// the DT level read at the same moment.
#[must_use]
pub fn quadrature_step(clk_high: bool, dt_high: bool) -> i8 {
    if clk_high == dt_high { -1 } else { 1 }
}

// =============================================================================
// JOYSTICK
// =============================================================================

/// Eight-way compass direction. `n` is joystick up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    N,
    Ne,
    E,
    Se,
    S,
    Sw,
    W,
    Nw,
}

impl Direction {
    pub const ALL: [Direction; 8] = [
        Direction::N,
        Direction::Ne,
        Direction::E,
        Direction::Se,
        Direction::S,
        Direction::Sw,
        Direction::W,
        Direction::Nw,
    ];

    #[must_use]
    pub fn opposite(self) -> Self {
        match self {
            Self::N => Self::S,
            Self::Ne => Self::Sw,
            Self::E => Self::W,
            Self::Se => Self::Nw,
            Self::S => Self::N,
            Self::Sw => Self::Ne,
            Self::W => Self::E,
            Self::Nw => Self::Se,
        }
    }

    #[must_use]
    pub fn is_diagonal(self) -> bool {
        matches!(self, Self::Ne | Self::Se | Self::Sw | Self::Nw)
    }

    /// The two cardinal components of a diagonal, or the direction itself.
    #[must_use]
    pub fn components(self) -> (Self, Self) {
        match self {
            Self::Ne => (Self::N, Self::E),
            Self::Se => (Self::S, Self::E),
            Self::Sw => (Self::S, Self::W),
            Self::Nw => (Self::N, Self::W),
            cardinal => (cardinal, cardinal),
        }
    }

    /// Parse the joystick vocabulary (`up`/`down`/`left`/`right`) as well as
    /// compass names.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "up" | "n" => Some(Self::N),
            "down" | "s" => Some(Self::S),
            "left" | "w" => Some(Self::W),
            "right" | "e" => Some(Self::E),
            "ne" => Some(Self::Ne),
            "se" => Some(Self::Se),
            "sw" => Some(Self::Sw),
            "nw" => Some(Self::Nw),
            _ => None,
        }
    }
}

/// Combine the four switch levels (true = closed) into a direction.
/// Opposing switches cancel.
#[must_use]
pub fn joystick_direction(up: bool, down: bool, left: bool, right: bool) -> Option<Direction> {
    let vertical = i8::from(up) - i8::from(down);
    let horizontal = i8::from(right) - i8::from(left);
    match (vertical, horizontal) {
        (1, 0) => Some(Direction::N),
        (1, 1) => Some(Direction::Ne),
        (0, 1) => Some(Direction::E),
        (-1, 1) => Some(Direction::Se),
        (-1, 0) => Some(Direction::S),
        (-1, -1) => Some(Direction::Sw),
        (0, -1) => Some(Direction::W),
        (1, -1) => Some(Direction::Nw),
        _ => None,
    }
}

/// Debounced edge detector over polled joystick readings. A direction is
/// reported once when it appears, then again only after the stick returns
/// to center or changes direction, and never within `debounce` of the
/// previous report.
#[derive(Debug, Clone)]
pub struct JoystickSampler {
    last: Option<Direction>,
    last_report: Option<Instant>,
    debounce: Duration,
}

impl JoystickSampler {
    #[must_use]
    pub fn new(debounce: Duration) -> Self {
        Self { last: None, last_report: None, debounce }
    }

    pub fn sample(&mut self, reading: Option<Direction>, now: Instant) -> Option<Direction> {
        if reading == self.last {
            return None;
        }
        if self.last_report.is_some_and(|at| now.duration_since(at) < self.debounce) {
            return None;
        }
        self.last = reading;
        let dir = reading?;
        self.last_report = Some(now);
        Some(dir)
    }
}

// =============================================================================
// LEVERS
// =============================================================================

/// Position of a rotary cam lever wired only at a few positions. Each entry
/// pairs a position with whether its pin reads low (selected).
/// `None` means the lever rests on an unwired position.
#[must_use]
pub fn lever_position(readings: &[(u8, bool)]) -> Option<u8> {
    readings.iter().find(|(_, low)| *low).map(|(pos, _)| *pos)
}

/// Change detector for polled lever readings.
#[derive(Debug, Clone, Default)]
pub struct LeverSampler {
    last: Vec<Option<u8>>,
}

impl LeverSampler {
    #[must_use]
    pub fn new(levers: usize) -> Self {
        Self { last: vec![None; levers] }
    }

    /// Returns the full reading when any lever moved since the last sample.
    pub fn sample(&mut self, positions: Vec<Option<u8>>) -> Option<Vec<Option<u8>>> {
        if positions == self.last {
            return None;
        }
        self.last.clone_from(&positions);
        Some(positions)
    }
}

#[cfg(test)]
#[path = "decode_test.rs"]
mod tests;
