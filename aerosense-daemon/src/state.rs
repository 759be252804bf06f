//! Shared latest-reading state
//!
//! One slot per sensor, each `Option`: `Some` after a successful sample,
//! `None` after a failure so stale values never linger into the next
//! aggregation window. Workers write, the publisher snapshots; every lock
//! hold is a single field update or one clone, never I/O.

use std::sync::{Arc, Mutex, MutexGuard};

use aerosense_core::metrics::ZONE_COUNT;
use aerosense_drivers::{BaroReading, Co2Reading, DustReading, ThermoHygroReading};

/// Most recent reading from every sensor, or `None` where the last attempt
/// failed.
#[derive(Debug, Clone, Copy, Default)]
pub struct LatestReadings {
    /// Zone temperature/humidity sensors behind the mux, indexed by zone.
    pub zones: [Option<ThermoHygroReading>; ZONE_COUNT],
    /// Reference temperature/humidity sensor (not published; kept for
    /// diagnostics and future calibration).
    pub reference: Option<ThermoHygroReading>,
    /// Barometer reading.
    pub baro: Option<BaroReading>,
    /// CO₂ reading.
    pub co2: Option<Co2Reading>,
    /// Dust reading.
    pub dust: Option<DustReading>,
}

/// Handle to the shared state. Cheap to clone; all clones see the same
/// underlying readings.
#[derive(Debug, Clone, Default)]
pub struct SharedState {
    inner: Arc<Mutex<LatestReadings>>,
}

impl SharedState {
    /// Creates empty shared state.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, LatestReadings> {
        // A worker panicking mid-update leaves at most one stale slot;
        // recover the data rather than poisoning the whole pipeline.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Stores the result of a zone sample. Out-of-range zones are ignored.
    pub fn set_zone(&self, zone: usize, reading: Option<ThermoHygroReading>) {
        if zone < ZONE_COUNT {
            self.lock().zones[zone] = reading;
        }
    }

    /// Stores the result of a reference sensor sample.
    pub fn set_reference(&self, reading: Option<ThermoHygroReading>) {
        self.lock().reference = reading;
    }

    /// Stores the result of a barometer sample.
    pub fn set_baro(&self, reading: Option<BaroReading>) {
        self.lock().baro = reading;
    }

    /// Stores the result of a CO₂ sample.
    pub fn set_co2(&self, reading: Option<Co2Reading>) {
        self.lock().co2 = reading;
    }

    /// Stores the result of a dust sample.
    pub fn set_dust(&self, reading: Option<DustReading>) {
        self.lock().dust = reading;
    }

    /// Copies the current readings out from under the lock.
    pub fn snapshot(&self) -> LatestReadings {
        *self.lock()
    }
}
