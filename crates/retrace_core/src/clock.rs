//! Wall-clock sources for history timestamps.

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use std::fmt;

/// Source of `created_at` timestamps.
pub trait Clock: Send + Sync + fmt::Debug {
    /// Returns the current time.
    fn now(&self) -> DateTime<Utc>;
}

/// The system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A manually driven clock.
///
/// Each call to [`Clock::now`] returns the current reading and then moves it
/// forward by `step`. A zero step freezes the clock.
#[derive(Debug)]
pub struct ManualClock {
    state: Mutex<(DateTime<Utc>, Duration)>,
}

impl ManualClock {
    /// Creates a frozen clock.
    #[must_use]
    pub fn new(start: DateTime<Utc>) -> Self {
        Self::ticking(start, Duration::zero())
    }

    /// Creates a clock that advances by `step` on every reading.
    #[must_use]
    pub fn ticking(start: DateTime<Utc>, step: Duration) -> Self {
        Self {
            state: Mutex::new((start, step)),
        }
    }

    /// Sets the next reading.
    pub fn set(&self, at: DateTime<Utc>) {
        self.state.lock().0 = at;
    }

    /// Moves the next reading forward.
    pub fn advance(&self, by: Duration) {
        let mut state = self.state.lock();
        state.0 += by;
    }

    /// Returns the next reading without consuming it.
    #[must_use]
    pub fn peek(&self) -> DateTime<Utc> {
        self.state.lock().0
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        let mut state = self.state.lock();
        let now = state.0;
        state.0 = now + state.1;
        now
    }
}
