//! Metric identifiers and per-metric aggregation policy
//!
//! The pipeline publishes five metrics. Temperature and humidity come from
//! four multiplexed zone sensors and are aggregated per zone; CO₂, PM2.5
//! and pressure are single-sensor metrics that only ever occupy slot 0 of
//! their payload arrays.
//!
//! Every reduction is gated by a minimum sample count so a window that is
//! nearly empty (sensor flapping, warm-up, bus contention) produces
//! "unavailable" instead of a number computed from one or two readings.

/// Number of independently addressed zones per multi-zone metric.
pub const ZONE_COUNT: usize = 4;

/// Rolling window duration in milliseconds.
pub const WINDOW_MS: u64 = 10_000;

/// Fraction trimmed from each end of a sorted window by the trimmed mean.
pub const TRIM_FRACTION: f64 = 0.10;

/// Below this many samples the trimmed mean degrades to a plain mean.
pub const MIN_SAMPLES_FOR_TRIM: usize = 5;

/// Minimum samples for a per-zone temperature or humidity aggregate.
pub const MIN_SAMPLES_SLOT: usize = 2;

/// Minimum samples for the CO₂ median.
pub const MIN_SAMPLES_CO2: usize = 2;

/// Minimum samples for the PM2.5 trimmed mean.
pub const MIN_SAMPLES_PM25: usize = 5;

/// Minimum samples for the pressure mean.
pub const MIN_SAMPLES_PRESSURE: usize = 2;

/// The five published metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    /// Zone air temperature, °C.
    Temperature,
    /// Zone relative humidity, %.
    Humidity,
    /// CO₂ concentration, ppm.
    Co2,
    /// Particulate concentration, µg/m³.
    Pm25,
    /// Barometric pressure, hPa.
    Pressure,
}

impl Metric {
    /// Minimum samples a window must hold before this metric aggregates.
    pub fn min_samples(self) -> usize {
        match self {
            Metric::Temperature | Metric::Humidity => MIN_SAMPLES_SLOT,
            Metric::Co2 => MIN_SAMPLES_CO2,
            Metric::Pm25 => MIN_SAMPLES_PM25,
            Metric::Pressure => MIN_SAMPLES_PRESSURE,
        }
    }
}

/// Maps a PCA9548A multiplexer channel to its payload zone slot.
///
/// The zone sensors sit on mux channels 2..=5; channels 0 and 1 carry other
/// devices. Returns `None` for channels that are not zone sensors.
pub fn mux_channel_to_zone(channel: u8) -> Option<usize> {
    match channel {
        2..=5 => Some(channel as usize - 2),
        _ => None,
    }
}
