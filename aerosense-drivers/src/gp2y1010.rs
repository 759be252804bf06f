//! Sharp GP2Y1010AU0F dust sensor (PM2.5)
//!
//! The sensor has no digital interface: an IR LED is pulsed low-active and
//! the photodiode output is sampled through the ADS1115 inside the pulse.
//! One logical sample is a burst of 10 pulse/read cycles, outlier-rejected
//! and averaged, then converted to µg/m³ against a no-dust baseline
//! voltage. Values above the plausibility ceiling are treated as optical
//! noise and reported as 0, matching the deployed calibration.
//!
//! Timing inside a burst is microsecond-scale (280 µs pulse, 40 µs
//! trailing, 10 ms cycle), so the entire burst runs inside one bus-guard
//! hold rather than re-acquiring per pulse.

use std::time::Duration;

use crate::ads1115::Ads1115;
use crate::port::{I2cBus, OutputPin};
use crate::{DustReading, SampleError};

/// ADC channel the sensor output is wired to.
pub const DUST_ADC_CHANNEL: u8 = 0;

/// Output voltage with no dust present, V. Field-calibrated per unit.
pub const DEFAULT_NO_DUST_VOLT: f64 = 0.0078;

/// Sensitivity from the datasheet: 0.005 V per µg/L (= mg/m³).
const VOLTS_PER_MG_M3: f64 = 0.005;

/// Concentrations above this are implausible indoors; treated as noise.
const MAX_VALID_UG_M3: f64 = 500.0;

/// Pulse/read cycles per logical sample.
const BURST_SIZE: usize = 10;

const LED_PULSE: Duration = Duration::from_micros(280);
const LED_TRAILING: Duration = Duration::from_micros(40);
/// Remainder of the 10 ms duty cycle after the 320 µs active window.
const CYCLE_REMAINDER: Duration = Duration::from_micros(10_000 - 320);

/// Discards values more than `m` sample standard deviations from the mean.
/// Fewer than two values pass through unchanged.
pub(crate) fn reject_outliers(values: &[f64], m: f64) -> Vec<f64> {
    if values.len() < 2 {
        return values.to_vec();
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let stdev = variance.sqrt();
    values
        .iter()
        .copied()
        .filter(|v| (v - mean).abs() <= m * stdev)
        .collect()
}

/// Converts an averaged output voltage to µg/m³.
pub(crate) fn volts_to_ug(avg_v: f64, no_dust_volt: f64) -> f64 {
    let density_mg = ((avg_v - no_dust_volt) / VOLTS_PER_MG_M3).max(0.0);
    let density_ug = density_mg * 1000.0;
    if density_ug > MAX_VALID_UG_M3 {
        0.0
    } else {
        density_ug
    }
}

/// GP2Y1010AU0F adapter. Owns the LED pin; borrows the bus per burst.
pub struct Gp2y1010<P: OutputPin> {
    adc: Ads1115,
    led: P,
    no_dust_volt: f64,
}

impl<P: OutputPin> Gp2y1010<P> {
    /// Adapter with the default no-dust baseline.
    pub fn new(led: P) -> Self {
        Self::with_baseline(led, DEFAULT_NO_DUST_VOLT)
    }

    /// Adapter with a field-calibrated no-dust baseline voltage.
    pub fn with_baseline(led: P, no_dust_volt: f64) -> Self {
        Self {
            adc: Ads1115::new(),
            led,
            no_dust_volt,
        }
    }

    /// Runs one pulse/read burst and reduces it to a dust reading.
    pub fn sample(&mut self, bus: &mut dyn I2cBus) -> Result<DustReading, SampleError> {
        let mut voltages = Vec::with_capacity(BURST_SIZE);

        for _ in 0..BURST_SIZE {
            self.led.set_low()?; // LED on (active low)
            bus.delay(LED_PULSE);

            // The LED must come back off even when the read fails; it is
            // rated for a 0.32 ms pulse per 10 ms cycle, not continuous
            // drive until the next burst.
            let v = match self.adc.read_single_ended(bus, DUST_ADC_CHANNEL) {
                Ok(v) => v,
                Err(e) => {
                    let _ = self.led.set_high();
                    return Err(e);
                }
            };
            voltages.push(v.max(0.0));

            bus.delay(LED_TRAILING);
            self.led.set_high()?;
            bus.delay(CYCLE_REMAINDER);
        }

        let kept = reject_outliers(&voltages, 2.0);
        let avg_v = if kept.is_empty() {
            0.0
        } else {
            kept.iter().sum::<f64>() / kept.len() as f64
        };

        Ok(DustReading {
            vout_v: avg_v,
            pm_ugm3: volts_to_ug(avg_v, self.no_dust_volt),
        })
    }
}
