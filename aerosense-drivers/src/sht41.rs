//! Sensirion SHT41 temperature/humidity sensor (mux channel 1)
//!
//! High-precision measurement command (0xFD), 6-byte response of
//! `T[2] + CRC + RH[2] + CRC`. Both CRCs must verify or the whole reading
//! is discarded; a half-valid reading never escapes the adapter.

use std::time::Duration;

use crate::crc;
use crate::port::I2cBus;
use crate::{SampleError, ThermoHygroReading};

/// Fixed SHT4x I2C address.
pub const SHT41_ADDR: u8 = 0x44;

/// Mux channel the SHT41 sits on.
pub const SHT41_CHANNEL: u8 = 1;

/// High-precision single-shot measurement.
const CMD_MEASURE_HIGH: u8 = 0xFD;

/// Measurement settle time before the result can be clocked out.
const MEASURE_SETTLE: Duration = Duration::from_millis(500);

fn convert_temp(raw: u16) -> f64 {
    -45.0 + 175.0 * (raw as f64 / 65535.0)
}

fn convert_rh(raw: u16) -> f64 {
    100.0 * (raw as f64 / 65535.0)
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

/// SHT41 adapter. Stateless; the mux selection is the caller's job so the
/// select and the read share one bus-guard hold.
#[derive(Debug, Default)]
pub struct Sht41;

impl Sht41 {
    /// New adapter handle.
    pub fn new() -> Self {
        Self
    }

    /// Takes one measurement.
    pub fn sample(&mut self, bus: &mut dyn I2cBus) -> Result<ThermoHygroReading, SampleError> {
        bus.write(SHT41_ADDR, &[CMD_MEASURE_HIGH])?;
        bus.delay(MEASURE_SETTLE);

        let mut data = [0u8; 6];
        bus.read(SHT41_ADDR, &mut data)?;

        crc::check(&data[0..2], data[2])?;
        crc::check(&data[3..5], data[5])?;

        let t_raw = u16::from_be_bytes([data[0], data[1]]);
        let h_raw = u16::from_be_bytes([data[3], data[4]]);

        Ok(ThermoHygroReading {
            temp_c: round1(convert_temp(t_raw)),
            rh: round1(convert_rh(h_raw)),
        })
    }
}
