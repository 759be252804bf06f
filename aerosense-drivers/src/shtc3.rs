//! Sensirion SHTC3 zone sensors (mux channels 2–5)
//!
//! Four SHTC3s share the fixed address 0x70, one per mux channel, so each
//! read is a full sequence behind one mux selection: reset, wake, optional
//! ID verification, measure, sleep. The sensor is put back to sleep even
//! when it will be read again a second later; it draws microamps asleep
//! and the wake cost is already dwarfed by the measurement settle time.

use std::time::Duration;

use crate::crc;
use crate::port::I2cBus;
use crate::{SampleError, ThermoHygroReading};

/// Fixed SHTC3 I2C address.
pub const SHTC3_ADDR: u8 = 0x70;

/// Mux channels carrying zone sensors, in zone-slot order.
pub const SHTC3_CHANNELS: [u8; 4] = [2, 3, 4, 5];

const CMD_WAKE: [u8; 2] = [0x35, 0x17];
const CMD_SLEEP: [u8; 2] = [0xB0, 0x98];
const CMD_RESET: [u8; 2] = [0x80, 0x5D];
const CMD_READ_ID: [u8; 2] = [0xEF, 0xC8];
/// Normal-mode, clock-stretching-disabled, temperature-first measurement.
const CMD_MEASURE: [u8; 2] = [0x7C, 0xA2];

const WAKE_SETTLE: Duration = Duration::from_millis(200);
const SLEEP_SETTLE: Duration = Duration::from_millis(10);
const RESET_SETTLE: Duration = Duration::from_millis(50);
const ID_SETTLE: Duration = Duration::from_millis(10);
const MEASURE_SETTLE: Duration = Duration::from_millis(200);

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

/// SHTC3 adapter.
#[derive(Debug)]
pub struct Shtc3 {
    verify_id: bool,
}

impl Shtc3 {
    /// Adapter that verifies the sensor ID after every wake.
    pub fn new() -> Self {
        Self { verify_id: true }
    }

    /// Adapter that skips the ID check (saves ~20 ms per read).
    pub fn without_id_check() -> Self {
        Self { verify_id: false }
    }

    /// Full single-sensor read sequence. The caller must already have
    /// routed the mux to the sensor's channel.
    pub fn sample(&mut self, bus: &mut dyn I2cBus) -> Result<ThermoHygroReading, SampleError> {
        self.reset(bus)?;
        self.wake(bus)?;

        if self.verify_id && !self.id_responds(bus) {
            // Leave the device asleep so a stuck sensor cannot hold the
            // shared-address line active for the other zones.
            let _ = self.sleep(bus);
            return Err(SampleError::NotReady("SHTC3 wake/ID check failed"));
        }

        let result = self.measure(bus);
        let _ = self.sleep(bus);
        result
    }

    fn reset(&self, bus: &mut dyn I2cBus) -> Result<(), SampleError> {
        bus.write(SHTC3_ADDR, &CMD_RESET)?;
        bus.delay(RESET_SETTLE);
        Ok(())
    }

    fn wake(&self, bus: &mut dyn I2cBus) -> Result<(), SampleError> {
        bus.write(SHTC3_ADDR, &CMD_WAKE)?;
        bus.delay(WAKE_SETTLE);
        Ok(())
    }

    fn sleep(&self, bus: &mut dyn I2cBus) -> Result<(), SampleError> {
        bus.write(SHTC3_ADDR, &CMD_SLEEP)?;
        bus.delay(SLEEP_SETTLE);
        Ok(())
    }

    /// True when the ID register answers with a CRC-valid word.
    fn id_responds(&self, bus: &mut dyn I2cBus) -> bool {
        self.read_id(bus).is_ok()
    }

    fn read_id(&self, bus: &mut dyn I2cBus) -> Result<(), SampleError> {
        bus.write(SHTC3_ADDR, &CMD_READ_ID)?;
        bus.delay(ID_SETTLE);
        let mut id = [0u8; 3];
        bus.read(SHTC3_ADDR, &mut id)?;
        crc::check(&id[0..2], id[2])
    }

    fn measure(&self, bus: &mut dyn I2cBus) -> Result<ThermoHygroReading, SampleError> {
        bus.write(SHTC3_ADDR, &CMD_MEASURE)?;
        bus.delay(MEASURE_SETTLE);

        let mut data = [0u8; 6];
        bus.read(SHTC3_ADDR, &mut data)?;

        crc::check(&data[0..2], data[2])?;
        crc::check(&data[3..5], data[5])?;

        let t_raw = u16::from_be_bytes([data[0], data[1]]);
        let h_raw = u16::from_be_bytes([data[3], data[4]]);

        Ok(ThermoHygroReading {
            temp_c: round1(-45.0 + 175.0 * (t_raw as f64 / 65535.0)),
            rh: round1(100.0 * (h_raw as f64 / 65535.0)),
        })
    }
}

impl Default for Shtc3 {
    fn default() -> Self {
        Self::new()
    }
}
