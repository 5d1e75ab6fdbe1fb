//! Deterministic clocks for tests.

use chrono::{DateTime, Duration, Utc};
use std::sync::Mutex;

use cartstream_core::Clock;

/// Fixed clock for deterministic tests.
///
/// Always returns the same time, making tests reproducible.
#[derive(Debug, Clone)]
pub struct FixedClock {
    time: DateTime<Utc>,
}

impl FixedClock {
    /// Create a new fixed clock with the given time.
    #[must_use]
    pub const fn new(time: DateTime<Utc>) -> Self {
        Self { time }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.time
    }
}

/// Clock that advances by one nanosecond per call.
///
/// Useful when a test generates several events and needs their timestamps
/// distinct but predictable: the n-th call returns `base + n` nanoseconds.
#[derive(Debug)]
pub struct SequencedClock {
    base: DateTime<Utc>,
    calls: Mutex<i64>,
}

impl SequencedClock {
    /// Create a sequenced clock starting at `base`.
    #[must_use]
    pub const fn new(base: DateTime<Utc>) -> Self {
        Self {
            base,
            calls: Mutex::new(0),
        }
    }

    /// The timestamp the n-th `now()` call returns (0-based).
    #[must_use]
    pub fn at(&self, n: i64) -> DateTime<Utc> {
        self.base + Duration::nanoseconds(n)
    }
}

impl Clock for SequencedClock {
    fn now(&self) -> DateTime<Utc> {
        let mut calls = self.calls.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let time = self.base + Duration::nanoseconds(*calls);
        *calls += 1;
        time
    }
}

/// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC).
///
/// # Panics
///
/// Panics if the hardcoded timestamp fails to parse, which should never
/// happen in practice.
#[must_use]
#[allow(clippy::expect_used)]
pub fn test_clock() -> FixedClock {
    FixedClock::new(
        DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
            .expect("hardcoded timestamp should always parse")
            .with_timezone(&Utc),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_always_returns_same_time() {
        let clock = test_clock();
        assert_eq!(clock.now(), clock.now());
    }

    #[test]
    fn sequenced_clock_steps_one_nanosecond_per_call() {
        let clock = SequencedClock::new(test_clock().now());

        let first = clock.now();
        let second = clock.now();
        let third = clock.now();

        assert_eq!(first, clock.at(0));
        assert_eq!(second, clock.at(1));
        assert_eq!(third, clock.at(2));
    }
}
