//! Time handling for the aggregation pipeline
//!
//! All window arithmetic runs on monotonic milliseconds so that wall-clock
//! adjustments (NTP steps, manual changes) can never make samples appear to
//! travel backwards in time. Components take a [`Clock`] so tests can drive
//! the warm-up and publish timing deterministically.

use std::time::Instant;

/// Timestamp in milliseconds since an arbitrary monotonic origin.
pub type Timestamp = u64;

/// Source of monotonic time for the pipeline.
pub trait Clock: Send {
    /// Current timestamp in milliseconds.
    fn now(&self) -> Timestamp;
}

/// Monotonic clock backed by [`std::time::Instant`].
///
/// Starts at 0 when constructed, always increases.
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    /// Creates a clock whose origin is "now".
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Timestamp {
        self.origin.elapsed().as_millis() as Timestamp
    }
}

/// Fixed time source for testing.
#[derive(Debug, Clone)]
pub struct FixedClock {
    timestamp: Timestamp,
}

impl FixedClock {
    /// Creates a clock pinned at `timestamp`.
    pub fn new(timestamp: Timestamp) -> Self {
        Self { timestamp }
    }

    /// Pins the clock at a new timestamp.
    pub fn set(&mut self, timestamp: Timestamp) {
        self.timestamp = timestamp;
    }

    /// Moves the clock forward by `ms`.
    pub fn advance(&mut self, ms: u64) {
        self.timestamp += ms;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        self.timestamp
    }
}
