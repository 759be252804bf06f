//! Publish cycle
//!
//! The publisher ticks once per second: it snapshots the latest readings,
//! feeds them into the rolling windows, prunes expired samples, and decides
//! whether to publish. Two phases:
//!
//! - **warm-up**: starts at boot and ends one full window after the first
//!   sample landed, so the first summary is never computed from a
//!   half-filled window.
//! - **steady**: one summary per window duration, never more often than
//!   once per window even if ticks bunch up after a stall.
//!
//! Serialization happens once per cycle; the same bytes go to every
//! configured destination, and a failure on one topic never skips the
//! rest.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use aerosense_connectors::{Connector, DeliveryLevel};
use aerosense_core::{Clock, SummaryPayload, Timestamp, WindowSet};

use crate::state::{LatestReadings, SharedState};
use crate::workers::idle;

/// Tick interval of the publish loop.
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Warmup,
    Steady { last_publish: Timestamp },
}

/// Drives aggregation and publishing over one connector.
pub struct Publisher<C: Connector> {
    hvac_id: u32,
    destinations: Vec<(String, DeliveryLevel)>,
    connector: C,
    windows: WindowSet,
    phase: Phase,
    first_sample_at: Option<Timestamp>,
}

impl<C: Connector> Publisher<C> {
    /// Creates a publisher in the warm-up phase.
    pub fn new(
        hvac_id: u32,
        destinations: Vec<(String, DeliveryLevel)>,
        connector: C,
    ) -> Self {
        Self {
            hvac_id,
            destinations,
            connector,
            windows: WindowSet::new(),
            phase: Phase::Warmup,
            first_sample_at: None,
        }
    }

    fn ingest(&mut self, now: Timestamp, snap: &LatestReadings) {
        for (zone, reading) in snap.zones.iter().enumerate() {
            if let Some(r) = reading {
                self.windows.push_temperature(zone, now, r.temp_c);
                self.windows.push_humidity(zone, now, r.rh);
            }
        }
        if let Some(r) = snap.baro {
            self.windows.push_pressure(now, r.pressure_hpa);
        }
        if let Some(r) = snap.co2 {
            self.windows.push_co2(now, f64::from(r.co2_ppm));
        }
        if let Some(r) = snap.dust {
            self.windows.push_pm25(now, r.pm_ugm3);
        }
    }

    /// Advances the cycle by one tick. Returns the summary to publish when
    /// this tick crosses a publish boundary.
    pub fn tick(&mut self, now: Timestamp, snap: &LatestReadings) -> Option<SummaryPayload> {
        self.ingest(now, snap);
        self.windows.prune(now);

        if self.first_sample_at.is_none() && self.windows.has_any_sample() {
            self.first_sample_at = Some(now);
            log::info!("first sample received, warming up");
        }

        let window_ms = self.windows.window_ms();
        match self.phase {
            Phase::Warmup => {
                let first = self.first_sample_at?;
                if now.saturating_sub(first) < window_ms {
                    return None;
                }
                log::info!("warm-up complete, entering steady publishing");
                self.phase = Phase::Steady { last_publish: now };
                Some(SummaryPayload::from_windows(self.hvac_id, &self.windows))
            }
            Phase::Steady { last_publish } => {
                if now.saturating_sub(last_publish) < window_ms {
                    return None;
                }
                self.phase = Phase::Steady { last_publish: now };
                Some(SummaryPayload::from_windows(self.hvac_id, &self.windows))
            }
        }
    }

    /// Serializes `payload` once and hands it to every destination.
    /// Per-topic failures are logged and counted; the rest still go out.
    pub fn publish_all(&mut self, payload: &SummaryPayload) {
        let bytes = match serde_json::to_vec(payload) {
            Ok(bytes) => bytes,
            Err(e) => {
                log::error!("summary serialization failed: {e}");
                return;
            }
        };

        if !self.connector.is_connected() {
            if let Err(e) = self.connector.connect() {
                log::warn!("broker connection attempt failed: {e}");
            }
        }

        for (topic, level) in &self.destinations {
            match self.connector.publish(topic, *level, &bytes) {
                Ok(()) => log::debug!("published {} bytes to {topic}", bytes.len()),
                Err(e) => log::warn!("publish to {topic} failed: {e}"),
            }
        }
    }

    /// Runs the publish loop until `shutdown` is raised.
    pub fn run(mut self, clock: impl Clock, state: SharedState, shutdown: Arc<AtomicBool>) {
        if let Err(e) = self.connector.connect() {
            log::warn!("initial broker connection failed, will retry: {e}");
        }

        while !shutdown.load(Ordering::Relaxed) {
            let now = clock.now();
            let snap = state.snapshot();
            if let Some(payload) = self.tick(now, &snap) {
                self.publish_all(&payload);
            }
            idle(&shutdown, TICK_INTERVAL);
        }

        let stats = self.connector.stats();
        log::info!(
            "publisher stopping: {} sent, {} failed, {} bytes",
            stats.messages_sent,
            stats.messages_failed,
            stats.bytes_sent
        );
        // Give the transport a moment to flush anything in flight.
        thread::sleep(Duration::from_millis(100));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashSet;

    use aerosense_connectors::{ConnectionStats, ConnectorError};
    use aerosense_core::metrics::WINDOW_MS;
    use aerosense_core::time::FixedClock;
    use aerosense_drivers::{Co2Reading, DustReading, ThermoHygroReading};

    #[derive(Default)]
    struct ScriptedConnector {
        connected: bool,
        published: Vec<(String, DeliveryLevel, Vec<u8>)>,
        failing_topics: HashSet<String>,
    }

    impl Connector for ScriptedConnector {
        type Error = ConnectorError;

        fn connect(&mut self) -> Result<(), Self::Error> {
            self.connected = true;
            Ok(())
        }

        fn publish(
            &mut self,
            topic: &str,
            level: DeliveryLevel,
            payload: &[u8],
        ) -> Result<(), Self::Error> {
            if self.failing_topics.contains(topic) {
                return Err(ConnectorError::BufferFull);
            }
            self.published
                .push((topic.to_string(), level, payload.to_vec()));
            Ok(())
        }

        fn is_connected(&self) -> bool {
            self.connected
        }

        fn stats(&self) -> ConnectionStats {
            ConnectionStats::default()
        }
    }

    fn zone_reading(temp_c: f64) -> Option<ThermoHygroReading> {
        Some(ThermoHygroReading { temp_c, rh: 50.0 })
    }

    fn full_snapshot() -> LatestReadings {
        LatestReadings {
            zones: [
                zone_reading(20.0),
                zone_reading(21.0),
                zone_reading(22.0),
                zone_reading(23.0),
            ],
            reference: zone_reading(20.5),
            baro: None,
            co2: Some(Co2Reading {
                co2_ppm: 420,
                temp_c: 24,
            }),
            dust: Some(DustReading {
                vout_v: 0.1,
                pm_ugm3: 12.0,
            }),
        }
    }

    fn publisher() -> Publisher<ScriptedConnector> {
        Publisher::new(
            1,
            vec![("hvac/1/air".to_string(), DeliveryLevel::AtLeastOnce)],
            ScriptedConnector::default(),
        )
    }

    #[test]
    fn no_publish_before_warm_up_completes() {
        let mut publisher = publisher();
        let mut clock = FixedClock::new(0);
        let snap = full_snapshot();

        // First sample at t=0; the window has not elapsed yet at t=9999.
        while clock.now() < WINDOW_MS - 1000 {
            assert!(publisher.tick(clock.now(), &snap).is_none());
            clock.advance(1000);
        }
        clock.set(WINDOW_MS - 1);
        assert!(publisher.tick(clock.now(), &snap).is_none());
    }

    #[test]
    fn warm_up_ends_one_window_after_first_sample() {
        let mut publisher = publisher();
        let empty = LatestReadings::default();
        let snap = full_snapshot();

        // Nothing sampled for the first 5 s; warm-up must not count that.
        for t in (0..5000).step_by(1000) {
            assert!(publisher.tick(t, &empty).is_none());
        }
        // First sample lands at t=5000.
        assert!(publisher.tick(5000, &snap).is_none());
        assert!(publisher.tick(5000 + WINDOW_MS - 1000, &snap).is_none());

        let payload = publisher
            .tick(5000 + WINDOW_MS, &snap)
            .expect("warm-up should end a full window after the first sample");
        assert_eq!(payload.hvac_id, 1);
        assert_eq!(payload.data.temperature[0], 20.0);
        assert_eq!(payload.data.co2[0], 420);
    }

    #[test]
    fn steady_publishes_once_per_window() {
        let mut publisher = publisher();
        let mut clock = FixedClock::new(0);
        let snap = full_snapshot();

        let mut published_at = Vec::new();
        while clock.now() <= 4 * WINDOW_MS {
            if publisher.tick(clock.now(), &snap).is_some() {
                published_at.push(clock.now());
            }
            clock.advance(1000);
        }

        assert_eq!(published_at, vec![WINDOW_MS, 2 * WINDOW_MS, 3 * WINDOW_MS, 4 * WINDOW_MS]);
    }

    #[test]
    fn unavailable_metrics_publish_as_filler() {
        let mut publisher = publisher();
        let snap = LatestReadings {
            co2: Some(Co2Reading {
                co2_ppm: 500,
                temp_c: 20,
            }),
            ..LatestReadings::default()
        };

        let mut payload = None;
        for t in (0..=WINDOW_MS).step_by(1000) {
            payload = publisher.tick(t, &snap).or(payload);
        }
        let payload = payload.expect("should publish after warm-up");

        assert_eq!(payload.data.co2[0], 500);
        assert_eq!(payload.data.temperature, [0.0; 4]);
        assert_eq!(payload.data.pm25, [0; 4]);
    }

    #[test]
    fn one_failing_destination_does_not_block_the_others() {
        let mut connector = ScriptedConnector::default();
        connector.failing_topics.insert("bad/topic".to_string());
        let mut publisher = Publisher::new(
            1,
            vec![
                ("bad/topic".to_string(), DeliveryLevel::AtMostOnce),
                ("good/topic".to_string(), DeliveryLevel::AtLeastOnce),
            ],
            connector,
        );

        let payload = SummaryPayload::from_windows(1, &WindowSet::new());
        publisher.publish_all(&payload);

        let published = &publisher.connector.published;
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].0, "good/topic");
        assert_eq!(published[0].1, DeliveryLevel::AtLeastOnce);

        // The connector was (re)connected lazily on first publish.
        assert!(publisher.connector.connected);
    }

    #[test]
    fn published_bytes_are_the_wire_shape() {
        let mut publisher = publisher();
        let snap = full_snapshot();

        for t in (0..=WINDOW_MS).step_by(1000) {
            if let Some(payload) = publisher.tick(t, &snap) {
                publisher.publish_all(&payload);
            }
        }

        let (_, _, bytes) = publisher
            .connector
            .published
            .first()
            .expect("one summary published")
            .clone();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["hvac_id"], 1);
        assert_eq!(value["data"]["temperature"].as_array().unwrap().len(), 4);
        assert_eq!(value["data"]["co2"][0], 420);
    }
}
