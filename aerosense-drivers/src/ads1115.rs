//! TI ADS1115 16-bit ADC (single-shot, single-ended)
//!
//! Carries the GP2Y1010AU0F's analog output onto the I2C bus. Configured
//! per conversion for one single-ended channel at ±4.096 V full scale and
//! 860 SPS, the fastest rate, because the dust sensor's sampling point
//! must land inside a 280 µs LED pulse window.

use std::time::Duration;

use crate::port::I2cBus;
use crate::SampleError;

/// Default ADS1115 address (ADDR pin to GND).
pub const ADS1115_ADDR: u8 = 0x48;

const REG_CONVERSION: u8 = 0x00;
const REG_CONFIG: u8 = 0x01;

/// OS=1 (start), PGA=±4.096 V, MODE=single-shot, DR=860 SPS, comparator off.
const CONFIG_BASE: u16 = 0x8000 | (0b001 << 9) | 0x0100 | (0b111 << 5) | 0b11;

/// Full-scale voltage for the ±4.096 V PGA setting.
const FULL_SCALE_V: f64 = 4.096;

/// One conversion at 860 SPS takes ~1.2 ms; wait a hair longer.
const CONVERSION_WAIT: Duration = Duration::from_micros(1400);

/// ADS1115 adapter.
#[derive(Debug, Clone, Copy)]
pub struct Ads1115 {
    addr: u8,
}

impl Ads1115 {
    /// ADC at the default address.
    pub fn new() -> Self {
        Self { addr: ADS1115_ADDR }
    }

    /// Reads one single-ended conversion from `channel` (0..=3), in volts.
    pub fn read_single_ended(
        &self,
        bus: &mut dyn I2cBus,
        channel: u8,
    ) -> Result<f64, SampleError> {
        if channel > 3 {
            return Err(SampleError::BadFrame("ADC channel out of range"));
        }

        // MUX field 1xx selects single-ended AINx vs GND
        let config = CONFIG_BASE | (u16::from(0b100 | channel) << 12);
        let cfg = config.to_be_bytes();
        bus.write(self.addr, &[REG_CONFIG, cfg[0], cfg[1]])?;
        bus.delay(CONVERSION_WAIT);

        bus.write(self.addr, &[REG_CONVERSION])?;
        let mut raw = [0u8; 2];
        bus.read(self.addr, &mut raw)?;

        let counts = i16::from_be_bytes(raw);
        Ok(f64::from(counts) * FULL_SCALE_V / 32768.0)
    }
}

impl Default for Ads1115 {
    fn default() -> Self {
        Self::new()
    }
}
