//! Periodic whole-arena reset
//!
//! A single countdown that re-arms itself every time it fires. The arena
//! runs forever; there is no terminal state.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetScheduler {
    pub interval_ms: u64,
    pub ends_at: u64,
}

impl ResetScheduler {
    pub fn new(now: u64, interval_ms: u64) -> Self {
        Self {
            interval_ms,
            ends_at: now + interval_ms,
        }
    }

    /// True when the countdown expired at `now`; the next countdown is
    /// armed from `now` before returning.
    pub fn tick(&mut self, now: u64) -> bool {
        if now < self.ends_at {
            return false;
        }
        self.ends_at = now + self.interval_ms;
        true
    }

    pub fn remaining(&self, now: u64) -> u64 {
        self.ends_at.saturating_sub(now)
    }

    /// HUD text, e.g. "Reset: 04:59"
    pub fn countdown_label(&self, now: u64) -> String {
        let remain = self.remaining(now);
        format!(
            "Reset: {:02}:{:02}",
            remain / 60_000,
            (remain % 60_000) / 1000
        )
    }
}
