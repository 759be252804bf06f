//! Publish payload shaping
//!
//! The downstream HVAC controller consumes a fixed-shape record: five
//! metrics, each a 4-element array with one slot per zone. Single-sensor
//! metrics (CO₂, PM2.5, pressure) only ever populate index 0.
//!
//! ## Known limitation: filler value is zero, not null
//!
//! The wire format has no null representation, so an unavailable aggregate
//! serializes as `0` / `0.0` — indistinguishable from a measured zero.
//! This mirrors the deployed controller contract and is reproduced here
//! deliberately; consumers that need to tell the two apart must do so out
//! of band (e.g. by knowing that 0 ppm CO₂ cannot occur in room air).

use serde::{Deserialize, Serialize};

use crate::aggregate::{gated_mean, gated_median, gated_trimmed_mean};
use crate::metrics::{Metric, ZONE_COUNT};
use crate::window::WindowSet;

/// One publish cycle's summary, serialized as-is to JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryPayload {
    /// Identifier of the HVAC unit this summary feeds.
    pub hvac_id: u32,
    /// Per-metric zone arrays.
    pub data: MetricArrays,
}

/// The five fixed-shape metric arrays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricArrays {
    /// Zone temperatures, °C.
    pub temperature: [f64; ZONE_COUNT],
    /// Zone relative humidities, %.
    pub humidity: [f64; ZONE_COUNT],
    /// CO₂ ppm; only index 0 is ever populated.
    pub co2: [i32; ZONE_COUNT],
    /// PM2.5 µg/m³; only index 0 is ever populated.
    pub pm25: [i32; ZONE_COUNT],
    /// Pressure hPa; only index 0 is ever populated.
    pub pressure: [f64; ZONE_COUNT],
}

/// Unavailable float slots carry this filler.
const FILLER_F64: f64 = 0.0;
/// Unavailable integer slots carry this filler.
const FILLER_I32: i32 = 0;

fn zone_array(values: [Option<f64>; ZONE_COUNT]) -> [f64; ZONE_COUNT] {
    values.map(|v| v.unwrap_or(FILLER_F64))
}

fn single_slot_f64(value: Option<f64>) -> [f64; ZONE_COUNT] {
    let mut out = [FILLER_F64; ZONE_COUNT];
    out[0] = value.unwrap_or(FILLER_F64);
    out
}

fn single_slot_i32(value: Option<f64>) -> [i32; ZONE_COUNT] {
    let mut out = [FILLER_I32; ZONE_COUNT];
    out[0] = value.map(|v| v.round() as i32).unwrap_or(FILLER_I32);
    out
}

impl SummaryPayload {
    /// Aggregates every window and shapes the result for the wire.
    ///
    /// Windows must already be pruned; this computes fresh aggregates and
    /// never carries anything over from a previous cycle.
    pub fn from_windows(hvac_id: u32, windows: &WindowSet) -> Self {
        let mut temperature = [None; ZONE_COUNT];
        let mut humidity = [None; ZONE_COUNT];
        for zone in 0..ZONE_COUNT {
            temperature[zone] = gated_mean(
                &windows.temperature_zone(zone).values(),
                Metric::Temperature.min_samples(),
            );
            humidity[zone] = gated_mean(
                &windows.humidity_zone(zone).values(),
                Metric::Humidity.min_samples(),
            );
        }

        let co2 = gated_median(&windows.co2().values(), Metric::Co2.min_samples());
        let pm25 = gated_trimmed_mean(&windows.pm25().values(), Metric::Pm25.min_samples());
        let pressure = gated_mean(&windows.pressure().values(), Metric::Pressure.min_samples());

        Self {
            hvac_id,
            data: MetricArrays {
                temperature: zone_array(temperature),
                humidity: zone_array(humidity),
                co2: single_slot_i32(co2),
                pm25: single_slot_i32(pm25),
                pressure: single_slot_f64(pressure),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn windows_with(samples: &[(&str, usize, f64)]) -> WindowSet {
        let mut set = WindowSet::new();
        for (i, &(metric, zone, value)) in samples.iter().enumerate() {
            let ts = i as u64;
            match metric {
                "temp" => set.push_temperature(zone, ts, value),
                "rh" => set.push_humidity(zone, ts, value),
                "co2" => set.push_co2(ts, value),
                "pm25" => set.push_pm25(ts, value),
                "pres" => set.push_pressure(ts, value),
                _ => unreachable!(),
            }
        }
        set
    }

    #[test]
    fn zone_shaping_with_sparse_zones() {
        // Zones 1 and 3 have no samples; zone 2 averages to 19.6
        let set = windows_with(&[
            ("temp", 0, 20.0),
            ("temp", 0, 21.0),
            ("temp", 2, 19.5),
            ("temp", 2, 19.7),
        ]);
        let payload = SummaryPayload::from_windows(1, &set);
        assert_eq!(payload.data.temperature, [20.5, 0.0, 19.6, 0.0]);
    }

    #[test]
    fn single_sensor_metrics_use_slot_zero_only() {
        let set = windows_with(&[
            ("co2", 0, 400.0),
            ("co2", 0, 420.0),
            ("co2", 0, 440.0),
            ("pres", 0, 1013.2),
            ("pres", 0, 1013.4),
        ]);
        let payload = SummaryPayload::from_windows(1, &set);
        assert_eq!(payload.data.co2, [420, 0, 0, 0]);
        assert_eq!(payload.data.pressure, [1013.3, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn co2_rounds_to_nearest_integer() {
        // median of even count interpolates: (410 + 421) / 2 = 415.5 -> 416
        let set = windows_with(&[("co2", 0, 410.0), ("co2", 0, 421.0)]);
        let payload = SummaryPayload::from_windows(1, &set);
        assert_eq!(payload.data.co2[0], 416);
    }

    /// Unavailable aggregates serialize as 0, not null. This is the
    /// documented wire-format limitation: a reader cannot distinguish
    /// "measured zero" from "no data this cycle".
    #[test]
    fn unavailable_serializes_as_zero_not_null() {
        let payload = SummaryPayload::from_windows(1, &WindowSet::new());
        let json = serde_json::to_string(&payload).unwrap();
        assert!(!json.contains("null"));

        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["data"]["co2"][0], 0);
        assert_eq!(parsed["data"]["temperature"][0], 0.0);
    }

    #[test]
    fn wire_shape_matches_contract() {
        let set = windows_with(&[
            ("temp", 0, 21.0),
            ("temp", 0, 21.0),
            ("rh", 1, 40.0),
            ("rh", 1, 42.0),
            ("pm25", 0, 10.0),
            ("pm25", 0, 11.0),
            ("pm25", 0, 12.0),
            ("pm25", 0, 13.0),
            ("pm25", 0, 14.0),
        ]);
        let payload = SummaryPayload::from_windows(7, &set);
        let parsed: serde_json::Value =
            serde_json::from_str(&serde_json::to_string(&payload).unwrap()).unwrap();

        assert_eq!(parsed["hvac_id"], 7);
        for key in ["temperature", "humidity", "co2", "pm25", "pressure"] {
            assert_eq!(parsed["data"][key].as_array().unwrap().len(), 4);
        }
        assert_eq!(parsed["data"]["humidity"][1], 41.0);
        assert_eq!(parsed["data"]["pm25"][0], 12);
    }

    #[test]
    fn roundtrip_preserves_payload() {
        let set = windows_with(&[("co2", 0, 400.0), ("co2", 0, 410.0)]);
        let payload = SummaryPayload::from_windows(3, &set);
        let json = serde_json::to_string(&payload).unwrap();
        let back: SummaryPayload = serde_json::from_str(&json).unwrap();
        assert_eq!(back, payload);
    }
}
