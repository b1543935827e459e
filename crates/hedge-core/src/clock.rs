//! Wall-clock abstraction.
//!
//! Every component that needs "age since" or "has a new day started"
//! arithmetic takes a `Clock` rather than calling `Utc::now()` directly, so
//! tests can drive it with a fixed or steppable clock. Mirrors the intent of
//! the monotonic `Instant` capture the feed layer uses for staleness math,
//! generalized to an injectable trait since this engine's reset/age logic
//! spans multiple crates rather than one `DashMap` entry.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

/// A source of wall-clock time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The real wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that returns a fixed, externally-advanced instant.
///
/// Used in tests that need deterministic control over "daily reset" and
/// "age since" computations.
#[derive(Debug)]
pub struct FixedClock {
    now: RwLock<DateTime<Utc>>,
}

impl FixedClock {
    #[must_use]
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: RwLock::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.write() = now;
    }

    pub fn advance(&self, delta: chrono::Duration) {
        let mut guard = self.now.write();
        *guard += delta;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.read()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_fixed_clock_advance() {
        let start = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let clock = FixedClock::new(start);
        clock.advance(chrono::Duration::minutes(30));
        assert_eq!(clock.now(), start + chrono::Duration::minutes(30));
    }
}
