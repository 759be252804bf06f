//! Bosch BME280 temperature/humidity/pressure sensor (main bus, 0x76)
//!
//! ## Overview
//!
//! Probe (chip ID 0x60), calibration readout, single-oversampling normal
//! mode, then burst reads of the 8-byte data block. Compensation uses the
//! datasheet's double-precision formulas; the shared `t_fine` term couples
//! the pressure and humidity results to the temperature reading from the
//! same burst, which is why the three values must come from one read.
//!
//! Sea-level pressure is auto-calibrated at init from the installation's
//! known true altitude, mirroring how the unit is commissioned in the
//! field: mount, measure, back-compute the local sea-level reference.

use std::time::Duration;

use crate::port::I2cBus;
use crate::{BaroReading, SampleError};

/// BME280 address on this board (0x77 on some breakouts).
pub const BME280_ADDR: u8 = 0x76;

/// Expected chip ID.
pub const BME280_CHIP_ID: u8 = 0x60;

const REG_CHIP_ID: u8 = 0xD0;
const REG_CALIB_TP: u8 = 0x88; // 26 bytes through 0xA1 (T1..P9, pad, H1)
const REG_CALIB_H: u8 = 0xE1; // 7 bytes (H2..H6)
const REG_CTRL_HUM: u8 = 0xF2;
const REG_CTRL_MEAS: u8 = 0xF4;
const REG_CONFIG: u8 = 0xF5;
const REG_DATA: u8 = 0xF7; // 8 bytes: press[3] temp[3] hum[2]

/// Humidity oversampling x1.
const CTRL_HUM_X1: u8 = 0x01;
/// Temp x1, pressure x1, normal mode.
const CTRL_MEAS_X1_NORMAL: u8 = 0x27;
/// 0.5 ms standby, filter off.
const CONFIG_DEFAULT: u8 = 0x00;

/// First-measurement settle before the sea-level calibration read.
const CALIBRATION_SETTLE: Duration = Duration::from_millis(500);

/// Standard atmosphere, used until [`Bme280::calibrate_sea_level`] runs.
const STANDARD_SEA_LEVEL_HPA: f64 = 1013.25;

/// Trimming parameters read from the device's NVM.
#[derive(Debug, Clone, Copy)]
pub struct Calibration {
    t1: u16,
    t2: i16,
    t3: i16,
    p1: u16,
    p2: i16,
    p3: i16,
    p4: i16,
    p5: i16,
    p6: i16,
    p7: i16,
    p8: i16,
    p9: i16,
    h1: u8,
    h2: i16,
    h3: u8,
    h4: i16,
    h5: i16,
    h6: i8,
}

impl Calibration {
    /// Parses the two calibration blocks (0x88..=0xA1 and 0xE1..=0xE7).
    pub fn parse(tp: &[u8; 26], h: &[u8; 7]) -> Self {
        let le16 = |lo: u8, hi: u8| u16::from_le_bytes([lo, hi]);
        let le16i = |lo: u8, hi: u8| i16::from_le_bytes([lo, hi]);

        Self {
            t1: le16(tp[0], tp[1]),
            t2: le16i(tp[2], tp[3]),
            t3: le16i(tp[4], tp[5]),
            p1: le16(tp[6], tp[7]),
            p2: le16i(tp[8], tp[9]),
            p3: le16i(tp[10], tp[11]),
            p4: le16i(tp[12], tp[13]),
            p5: le16i(tp[14], tp[15]),
            p6: le16i(tp[16], tp[17]),
            p7: le16i(tp[18], tp[19]),
            p8: le16i(tp[20], tp[21]),
            p9: le16i(tp[22], tp[23]),
            h1: tp[25],
            h2: le16i(h[0], h[1]),
            h3: h[2],
            // H4/H5 are 12-bit values sharing the 0xE5 register
            h4: (i16::from(h[3] as i8) << 4) | i16::from(h[4] & 0x0F),
            h5: (i16::from(h[5] as i8) << 4) | i16::from(h[4] >> 4),
            h6: h[6] as i8,
        }
    }

    /// Compensated temperature in °C plus the shared `t_fine` term.
    pub fn temperature(&self, adc_t: i32) -> (f64, f64) {
        let adc_t = adc_t as f64;
        let var1 = (adc_t / 16384.0 - f64::from(self.t1) / 1024.0) * f64::from(self.t2);
        let var2 = (adc_t / 131072.0 - f64::from(self.t1) / 8192.0).powi(2) * f64::from(self.t3);
        let t_fine = var1 + var2;
        (t_fine / 5120.0, t_fine)
    }

    /// Compensated pressure in hPa. `None` when the divisor degenerates
    /// (all-zero calibration, i.e. a misread NVM block).
    pub fn pressure(&self, adc_p: i32, t_fine: f64) -> Option<f64> {
        let mut var1 = t_fine / 2.0 - 64000.0;
        let mut var2 = var1 * var1 * f64::from(self.p6) / 32768.0;
        var2 += var1 * f64::from(self.p5) * 2.0;
        var2 = var2 / 4.0 + f64::from(self.p4) * 65536.0;
        var1 = (f64::from(self.p3) * var1 * var1 / 524288.0 + f64::from(self.p2) * var1)
            / 524288.0;
        var1 = (1.0 + var1 / 32768.0) * f64::from(self.p1);
        if var1 == 0.0 {
            return None;
        }

        let mut p = 1048576.0 - adc_p as f64;
        p = (p - var2 / 4096.0) * 6250.0 / var1;
        var1 = f64::from(self.p9) * p * p / 2147483648.0;
        var2 = p * f64::from(self.p8) / 32768.0;
        p += (var1 + var2 + f64::from(self.p7)) / 16.0;
        Some(p / 100.0)
    }

    /// Compensated relative humidity in %, clamped to 0..=100.
    pub fn humidity(&self, adc_h: i32, t_fine: f64) -> f64 {
        let var_h = t_fine - 76800.0;
        let h = (adc_h as f64
            - (f64::from(self.h4) * 64.0 + f64::from(self.h5) / 16384.0 * var_h))
            * (f64::from(self.h2) / 65536.0
                * (1.0
                    + f64::from(self.h6) / 67108864.0
                        * var_h
                        * (1.0 + f64::from(self.h3) / 67108864.0 * var_h)));
        let h = h * (1.0 - f64::from(self.h1) * h / 524288.0);
        h.clamp(0.0, 100.0)
    }
}

/// Back-computes the local sea-level pressure from a measurement taken at
/// a known altitude (international barometric formula).
pub fn sea_level_from(measured_hpa: f64, true_altitude_m: f64) -> f64 {
    measured_hpa / (1.0 - true_altitude_m / 44330.0).powf(5.255)
}

/// Altitude estimate for a pressure given a sea-level reference.
pub fn altitude_from(measured_hpa: f64, sea_level_hpa: f64) -> f64 {
    44330.0 * (1.0 - (measured_hpa / sea_level_hpa).powf(1.0 / 5.255))
}

/// BME280 adapter. Holds the calibration read at init and the sea-level
/// reference; the bus handle is lent per transaction like every adapter.
#[derive(Debug)]
pub struct Bme280 {
    addr: u8,
    calibration: Option<Calibration>,
    sea_level_hpa: f64,
}

impl Bme280 {
    /// Adapter at the board's default address.
    pub fn new() -> Self {
        Self {
            addr: BME280_ADDR,
            calibration: None,
            sea_level_hpa: STANDARD_SEA_LEVEL_HPA,
        }
    }

    /// Confirms a BME280 answers at the address.
    pub fn probe(&self, bus: &mut dyn I2cBus) -> Result<(), SampleError> {
        bus.write(self.addr, &[REG_CHIP_ID])?;
        let mut id = [0u8; 1];
        bus.read(self.addr, &mut id)?;
        if id[0] != BME280_CHIP_ID {
            return Err(SampleError::WrongChip(id[0]));
        }
        Ok(())
    }

    /// Probes the chip, reads calibration, and configures normal mode.
    pub fn init(&mut self, bus: &mut dyn I2cBus) -> Result<(), SampleError> {
        self.probe(bus)?;

        let mut tp = [0u8; 26];
        bus.write(self.addr, &[REG_CALIB_TP])?;
        bus.read(self.addr, &mut tp)?;

        let mut h = [0u8; 7];
        bus.write(self.addr, &[REG_CALIB_H])?;
        bus.read(self.addr, &mut h)?;

        self.calibration = Some(Calibration::parse(&tp, &h));

        // ctrl_hum must be written before ctrl_meas to take effect
        bus.write(self.addr, &[REG_CTRL_HUM, CTRL_HUM_X1])?;
        bus.write(self.addr, &[REG_CTRL_MEAS, CTRL_MEAS_X1_NORMAL])?;
        bus.write(self.addr, &[REG_CONFIG, CONFIG_DEFAULT])?;
        Ok(())
    }

    /// Calibrates the sea-level reference from the installation's true
    /// altitude. Waits out the first-measurement settle, so the caller's
    /// bus-guard hold spans the settle; that is the one long hold in the
    /// system and it happens exactly once, at worker startup.
    pub fn calibrate_sea_level(
        &mut self,
        bus: &mut dyn I2cBus,
        true_altitude_m: f64,
    ) -> Result<f64, SampleError> {
        bus.delay(CALIBRATION_SETTLE);
        let reading = self.sample(bus)?;
        self.sea_level_hpa = sea_level_from(reading.pressure_hpa, true_altitude_m);
        Ok(self.sea_level_hpa)
    }

    /// Takes one compensated measurement.
    pub fn sample(&mut self, bus: &mut dyn I2cBus) -> Result<BaroReading, SampleError> {
        let calib = self
            .calibration
            .as_ref()
            .ok_or(SampleError::NotReady("BME280 not initialized"))?;

        let mut data = [0u8; 8];
        bus.write(self.addr, &[REG_DATA])?;
        bus.read(self.addr, &mut data)?;

        let adc_p =
            (i32::from(data[0]) << 12) | (i32::from(data[1]) << 4) | (i32::from(data[2]) >> 4);
        let adc_t =
            (i32::from(data[3]) << 12) | (i32::from(data[4]) << 4) | (i32::from(data[5]) >> 4);
        let adc_h = (i32::from(data[6]) << 8) | i32::from(data[7]);

        let (temp_c, t_fine) = calib.temperature(adc_t);
        let pressure_hpa = calib
            .pressure(adc_p, t_fine)
            .ok_or(SampleError::BadFrame("degenerate pressure calibration"))?;
        let rh = calib.humidity(adc_h, t_fine);

        Ok(BaroReading {
            temp_c,
            rh,
            pressure_hpa,
            altitude_m: altitude_from(pressure_hpa, self.sea_level_hpa),
        })
    }
}

impl Default for Bme280 {
    fn default() -> Self {
        Self::new()
    }
}
