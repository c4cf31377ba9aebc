//! Per-question countdown clock
//!
//! A fresh [`Clock`] is created for every question; prior timing state is
//! never reused. The clock is driven externally: the session schedules a
//! tick alarm once per [`crate::constants::clock::TICK_INTERVAL_SECONDS`]
//! and calls [`Clock::tick`] when it fires, so tests control time
//! deterministically and embedders map ticks onto real timers.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::clock;

/// Whether the clock is currently decrementing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClockState {
    /// Decrementing once per tick
    #[default]
    Running,
    /// Halted; ticks are inert and expiry is suppressed until resumed
    Paused,
}

/// Outcome of driving the clock one interval forward
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// The clock decremented and time remains
    Running {
        /// Seconds left after this tick
        remaining: u64,
    },
    /// The clock just reached zero; reported exactly once per instance
    Expired,
    /// The tick had no effect (paused or already expired)
    Idle,
}

/// Raised by a [`TickCue`] whose playback was rejected
///
/// Playback failure is always swallowed by the clock; it exists so cue
/// implementations can report blocked autoplay without panicking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("tick cue playback was blocked")]
pub struct CueBlocked;

/// A short audible cue played on every running tick
pub trait TickCue {
    /// Plays the cue once
    ///
    /// # Errors
    ///
    /// Returns [`CueBlocked`] when playback is rejected (e.g. by an
    /// autoplay policy); the clock ignores the error.
    fn play(&mut self) -> Result<(), CueBlocked>;
}

/// A cue that plays nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct Silent;

impl TickCue for Silent {
    fn play(&mut self) -> Result<(), CueBlocked> {
        Ok(())
    }
}

/// Countdown timer bound to a single question
///
/// Counts down from a fixed number of seconds, one decrement per tick.
/// Expiry is reported exactly once per instance; pausing suppresses both
/// decrementing and any pending expiry until resumed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Clock {
    remaining: u64,
    state: ClockState,
    expired: bool,
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock {
    /// Creates a running clock with the standard question duration
    pub fn new() -> Self {
        Self::with_seconds(clock::QUESTION_SECONDS)
    }

    /// Creates a running clock with a custom duration in seconds
    pub fn with_seconds(seconds: u64) -> Self {
        Self {
            remaining: seconds,
            state: ClockState::Running,
            expired: false,
        }
    }

    /// Drives the clock one interval forward
    ///
    /// While running, plays the tick cue (playback failures are
    /// swallowed) and decrements the remaining time. Returns
    /// [`Tick::Expired`] exactly once, when the countdown reaches zero;
    /// every later tick, and any tick while paused, returns
    /// [`Tick::Idle`].
    pub fn tick(&mut self, cue: &mut impl TickCue) -> Tick {
        if self.expired || self.state == ClockState::Paused {
            return Tick::Idle;
        }

        // Blocked playback must never surface as an error.
        let _ = cue.play();

        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.expired = true;
            Tick::Expired
        } else {
            Tick::Running {
                remaining: self.remaining,
            }
        }
    }

    /// Halts decrementing and suppresses any pending expiry
    pub fn pause(&mut self) {
        self.state = ClockState::Paused;
    }

    /// Resumes decrementing from the remaining time
    pub fn resume(&mut self) {
        self.state = ClockState::Running;
    }

    /// Seconds left on the countdown
    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    /// Whether the countdown has reached zero
    pub fn is_expired(&self) -> bool {
        self.expired
    }

    /// The current running/paused state
    pub fn state(&self) -> ClockState {
        self.state
    }
}
