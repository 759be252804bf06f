//! Rolling Time-Windowed Sample Buffers
//!
//! ## Overview
//!
//! Each metric keeps its recent history in a [`SampleWindow`]: an ordered
//! sequence of `(timestamp, value)` pairs bounded by a fixed duration
//! rather than a fixed count. Samples arrive roughly once per second from
//! the publisher's snapshot of the latest sensor state and are pruned once
//! per publish tick, so a window never holds more than a handful of entries.
//!
//! ## Design Rationale
//!
//! A `VecDeque` fits the access pattern exactly:
//! - New samples always append at the back (arrival order is time order,
//!   because the single writer stamps them with a monotonic clock).
//! - Expired samples always leave from the front.
//! - Aggregation iterates the whole window once per 10 seconds.
//!
//! ## Invariants
//!
//! - Entries are append-ordered by timestamp.
//! - After `prune(now)`, no entry older than `now - window_ms` remains.
//! - Windows are owned exclusively by the publisher thread; there is no
//!   concurrent mutation and therefore no lock.

use std::collections::VecDeque;

use crate::metrics::{WINDOW_MS, ZONE_COUNT};
use crate::time::Timestamp;

/// Time-bounded sample history for one metric (or one zone of one metric).
#[derive(Debug, Clone, Default)]
pub struct SampleWindow {
    samples: VecDeque<(Timestamp, f64)>,
}

impl SampleWindow {
    /// Creates an empty window.
    pub fn new() -> Self {
        Self {
            samples: VecDeque::new(),
        }
    }

    /// Appends a sample.
    ///
    /// Callers must append in non-decreasing timestamp order; the publisher
    /// guarantees this by stamping every snapshot with its own monotonic
    /// clock before pushing.
    pub fn push(&mut self, timestamp: Timestamp, value: f64) {
        self.samples.push_back((timestamp, value));
    }

    /// Drops every sample with a timestamp older than `now - window_ms`.
    pub fn prune(&mut self, now: Timestamp, window_ms: u64) {
        let cutoff = now.saturating_sub(window_ms);
        while let Some(&(ts, _)) = self.samples.front() {
            if ts < cutoff {
                self.samples.pop_front();
            } else {
                break;
            }
        }
    }

    /// Number of samples currently in the window.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True when the window holds no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// The values in the window, in arrival order.
    pub fn values(&self) -> Vec<f64> {
        self.samples.iter().map(|&(_, v)| v).collect()
    }
}

/// All windows the publisher maintains, one per metric and zone.
///
/// Temperature and humidity are windowed per zone slot; CO₂, PM2.5 and
/// pressure are single-sensor metrics with one window each.
#[derive(Debug, Clone)]
pub struct WindowSet {
    window_ms: u64,
    temperature: [SampleWindow; ZONE_COUNT],
    humidity: [SampleWindow; ZONE_COUNT],
    co2: SampleWindow,
    pm25: SampleWindow,
    pressure: SampleWindow,
}

impl WindowSet {
    /// Creates an empty window set with the standard 10 s duration.
    pub fn new() -> Self {
        Self::with_window(WINDOW_MS)
    }

    /// Creates an empty window set with a custom duration (tests only need
    /// this to exercise pruning without simulating ten real seconds).
    pub fn with_window(window_ms: u64) -> Self {
        Self {
            window_ms,
            temperature: Default::default(),
            humidity: Default::default(),
            co2: SampleWindow::new(),
            pm25: SampleWindow::new(),
            pressure: SampleWindow::new(),
        }
    }

    /// Window duration in milliseconds.
    pub fn window_ms(&self) -> u64 {
        self.window_ms
    }

    /// Appends a zone temperature sample. Out-of-range zones are ignored.
    pub fn push_temperature(&mut self, zone: usize, ts: Timestamp, value: f64) {
        if let Some(w) = self.temperature.get_mut(zone) {
            w.push(ts, value);
        }
    }

    /// Appends a zone humidity sample. Out-of-range zones are ignored.
    pub fn push_humidity(&mut self, zone: usize, ts: Timestamp, value: f64) {
        if let Some(w) = self.humidity.get_mut(zone) {
            w.push(ts, value);
        }
    }

    /// Appends a CO₂ sample.
    pub fn push_co2(&mut self, ts: Timestamp, value: f64) {
        self.co2.push(ts, value);
    }

    /// Appends a PM2.5 sample.
    pub fn push_pm25(&mut self, ts: Timestamp, value: f64) {
        self.pm25.push(ts, value);
    }

    /// Appends a pressure sample.
    pub fn push_pressure(&mut self, ts: Timestamp, value: f64) {
        self.pressure.push(ts, value);
    }

    /// Prunes every window against `now`.
    pub fn prune(&mut self, now: Timestamp) {
        for w in &mut self.temperature {
            w.prune(now, self.window_ms);
        }
        for w in &mut self.humidity {
            w.prune(now, self.window_ms);
        }
        self.co2.prune(now, self.window_ms);
        self.pm25.prune(now, self.window_ms);
        self.pressure.prune(now, self.window_ms);
    }

    /// True once any metric has received at least one sample.
    ///
    /// The publisher uses this to anchor the warm-up timer at the first
    /// sample rather than at process start.
    pub fn has_any_sample(&self) -> bool {
        self.temperature.iter().any(|w| !w.is_empty())
            || self.humidity.iter().any(|w| !w.is_empty())
            || !self.co2.is_empty()
            || !self.pm25.is_empty()
            || !self.pressure.is_empty()
    }

    /// Temperature window for one zone.
    pub fn temperature_zone(&self, zone: usize) -> &SampleWindow {
        &self.temperature[zone]
    }

    /// Humidity window for one zone.
    pub fn humidity_zone(&self, zone: usize) -> &SampleWindow {
        &self.humidity[zone]
    }

    /// The CO₂ window.
    pub fn co2(&self) -> &SampleWindow {
        &self.co2
    }

    /// The PM2.5 window.
    pub fn pm25(&self) -> &SampleWindow {
        &self.pm25
    }

    /// The pressure window.
    pub fn pressure(&self) -> &SampleWindow {
        &self.pressure
    }
}

impl Default for WindowSet {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn empty_window() {
        let w = SampleWindow::new();
        assert!(w.is_empty());
        assert_eq!(w.len(), 0);
        assert!(w.values().is_empty());
    }

    #[test]
    fn prune_drops_only_expired_samples() {
        let mut w = SampleWindow::new();
        w.push(1_000, 1.0);
        w.push(5_000, 2.0);
        w.push(11_000, 3.0);

        // cutoff = 12_000 - 10_000 = 2_000; only the first sample expires
        w.prune(12_000, WINDOW_MS);
        assert_eq!(w.values(), vec![2.0, 3.0]);

        // exactly-at-cutoff samples are retained
        w.prune(15_000, WINDOW_MS);
        assert_eq!(w.values(), vec![2.0, 3.0]);

        w.prune(25_000, WINDOW_MS);
        assert!(w.is_empty());
    }

    #[test]
    fn prune_near_zero_does_not_underflow() {
        let mut w = SampleWindow::new();
        w.push(100, 1.0);
        w.prune(500, WINDOW_MS);
        assert_eq!(w.len(), 1);
    }

    #[test]
    fn window_set_prunes_all_metrics() {
        let mut set = WindowSet::new();
        set.push_temperature(0, 1_000, 20.0);
        set.push_humidity(3, 1_000, 45.0);
        set.push_co2(1_000, 400.0);
        set.push_pm25(1_000, 12.0);
        set.push_pressure(1_000, 1013.0);
        assert!(set.has_any_sample());

        set.prune(20_000);
        assert!(!set.has_any_sample());
    }

    #[test]
    fn out_of_range_zone_is_ignored() {
        let mut set = WindowSet::new();
        set.push_temperature(7, 1_000, 20.0);
        assert!(!set.has_any_sample());
    }

    proptest! {
        /// Pruning removes every sample older than `now - 10s` and retains
        /// all samples within the window, for arbitrary insertion times.
        #[test]
        fn prune_is_exact(mut times in proptest::collection::vec(0u64..60_000, 0..64), now in 10_000u64..70_000) {
            times.sort_unstable();
            let mut w = SampleWindow::new();
            for (i, ts) in times.iter().enumerate() {
                w.push(*ts, i as f64);
            }
            w.prune(now, WINDOW_MS);

            let cutoff = now - WINDOW_MS;
            let expected = times.iter().filter(|&&ts| ts >= cutoff).count();
            prop_assert_eq!(w.len(), expected);
        }
    }
}
