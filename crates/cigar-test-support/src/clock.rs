//! Test clocks — deterministic `Clock` implementations for tests.

use std::sync::Mutex;

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use cigar_core::clock::Clock;

/// Fixed timestamp shared by tests that do not care about the exact instant.
///
/// # Panics
///
/// Never in practice; the literal date is valid.
#[must_use]
pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap()
}

/// A clock that always returns a fixed point in time.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// A clock that only moves when a test advances it.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    /// Create a clock starting at `start`.
    #[must_use]
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Create a clock starting at [`epoch`].
    #[must_use]
    pub fn at_epoch() -> Self {
        Self::new(epoch())
    }

    /// Move the clock forward by `delta` and return the new time.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn advance(&self, delta: TimeDelta) -> DateTime<Utc> {
        let mut now = self.now.lock().unwrap();
        *now += delta;
        *now
    }

    /// Move the clock forward by `millis` milliseconds.
    pub fn advance_ms(&self, millis: i64) -> DateTime<Utc> {
        self.advance(TimeDelta::milliseconds(millis))
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}
