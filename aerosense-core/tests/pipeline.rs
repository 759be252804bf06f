//! End-to-end aggregation: a simulated minute of sensor traffic through
//! the windows and out as shaped payloads.

use aerosense_core::metrics::WINDOW_MS;
use aerosense_core::{SummaryPayload, WindowSet};

/// Feeds one second's worth of readings for every metric.
fn feed_tick(windows: &mut WindowSet, ts: u64, co2: f64) {
    for zone in 0..4 {
        windows.push_temperature(zone, ts, 20.0 + zone as f64);
        windows.push_humidity(zone, ts, 40.0 + zone as f64);
    }
    windows.push_co2(ts, co2);
    windows.push_pm25(ts, 12.0);
    windows.push_pressure(ts, 1011.8);
}

#[test]
fn steady_traffic_produces_full_payloads() {
    let mut windows = WindowSet::new();

    for second in 0..60u64 {
        let ts = second * 1000;
        feed_tick(&mut windows, ts, 420.0);
        windows.prune(ts);
    }

    let payload = SummaryPayload::from_windows(3, &windows);
    assert_eq!(payload.hvac_id, 3);
    assert_eq!(payload.data.temperature, [20.0, 21.0, 22.0, 23.0]);
    assert_eq!(payload.data.humidity, [40.0, 41.0, 42.0, 43.0]);
    assert_eq!(payload.data.co2[0], 420);
    assert_eq!(payload.data.pm25[0], 12);
    assert_eq!(payload.data.pressure[0], 1011.8);
}

#[test]
fn stale_samples_age_out_of_the_aggregate() {
    let mut windows = WindowSet::new();

    // A CO₂ spike early on, then normal readings for a full window.
    windows.push_co2(0, 4000.0);
    for second in 1..=10u64 {
        windows.push_co2(second * 1000, 420.0);
    }

    // Half a window later the spike has aged out but its window-mates
    // from t=5s onward are still in range.
    windows.prune(5_000 + WINDOW_MS);
    let payload = SummaryPayload::from_windows(1, &windows);

    // Only the spike's window-mates survive; the spike itself is gone.
    assert_eq!(payload.data.co2[0], 420);
}

#[test]
fn sensor_dropout_degrades_to_filler_per_metric() {
    let mut windows = WindowSet::new();

    // Zone 1 stops reporting; everything else keeps flowing.
    for second in 0..10u64 {
        let ts = second * 1000;
        windows.push_temperature(0, ts, 21.5);
        windows.push_co2(ts, 600.0);
    }
    windows.prune(9_000);

    let payload = SummaryPayload::from_windows(1, &windows);
    assert_eq!(payload.data.temperature[0], 21.5);
    assert_eq!(payload.data.temperature[1], 0.0);
    assert_eq!(payload.data.co2[0], 600);
    // PM2.5 had no samples at all
    assert_eq!(payload.data.pm25, [0; 4]);
}
