//! Named, cancelable timers on a virtual clock.
//!
//! DESIGN
//! ======
//! State machines never sleep. They schedule a typed key at an `Instant`
//! and the runtime drives them forward with `pop_due(now)`. Tests pass
//! synthetic instants, so a whole puzzle can be played without waiting.
//!
//! Entries fire in deadline order; ties fire in scheduling order. A
//! cancelled entry is removed outright, so it can never fire late.

use std::time::{Duration, Instant};

/// Floor applied by `schedule_in`. A periodic timer always lands strictly
/// after the instant it fired at.
pub const MIN_DELAY: Duration = Duration::from_millis(1);

/// Ceiling applied by `schedule_in` and `seconds`.
pub const MAX_DELAY: Duration = Duration::from_secs(24 * 60 * 60);

/// Configured seconds as a `Duration` in `0..=MAX_DELAY`. NaN reads as zero.
#[must_use]
pub fn seconds(value: f64) -> Duration {
    Duration::try_from_secs_f64(value.clamp(0.0, MAX_DELAY.as_secs_f64())).unwrap_or(Duration::ZERO)
}

#[derive(Debug)]
struct Entry<K> {
    seq: u64,
    at: Instant,
    key: K,
}

#[derive(Debug)]
pub struct Timers<K> {
    entries: Vec<Entry<K>>,
    next_seq: u64,
}

impl<K> Default for Timers<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> Timers<K> {
    #[must_use]
    pub fn new() -> Self {
        Self { entries: Vec::new(), next_seq: 0 }
    }

    pub fn schedule(&mut self, at: Instant, key: K) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.push(Entry { seq, at, key });
    }

    /// Schedule `delay` after `now`, clamped to `MIN_DELAY..=MAX_DELAY`.
    pub fn schedule_in(&mut self, now: Instant, delay: Duration, key: K) {
        self.schedule(now + delay.clamp(MIN_DELAY, MAX_DELAY), key);
    }

    /// Cancel every pending timer whose key matches. Returns how many went.
    pub fn cancel_where(&mut self, mut pred: impl FnMut(&K) -> bool) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| !pred(&e.key));
        before - self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn contains(&self, mut pred: impl FnMut(&K) -> bool) -> bool {
        self.entries.iter().any(|e| pred(&e.key))
    }

    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.entries.iter().map(|e| e.at).min()
    }

    /// Remove and return the earliest timer due at or before `now`, along
    /// with the instant it was scheduled for.
    pub fn pop_due(&mut self, now: Instant) -> Option<(Instant, K)> {
        let idx = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.at <= now)
            .min_by_key(|(_, e)| (e.at, e.seq))
            .map(|(i, _)| i)?;
        let entry = self.entries.remove(idx);
        Some((entry.at, entry.key))
    }
}

#[cfg(test)]
#[path = "timer_test.rs"]
mod tests;
