//! Sensor adapters for the Aerosense sampling workers
//!
//! ## Overview
//!
//! One adapter per physical sensor family, each exposing a single blocking
//! sample operation that returns a typed reading or a [`SampleError`]. All
//! device-specific error handling (framing, CRC, settle timing, retries)
//! happens inside the adapter; nothing device-specific leaks past this
//! crate's boundary.
//!
//! Adapters talk to hardware through the narrow port traits in [`port`]
//! (`I2cBus`, `SerialLink`, `OutputPin`) rather than owning handles
//! directly. The sampling workers hold the one real I2C handle behind the
//! bus guard and lend it to an adapter for exactly one transaction, which
//! keeps the mutual-exclusion discipline in one place. It also means every
//! adapter is testable against a scripted port with no hardware attached.
//!
//! ## Device inventory
//!
//! | Adapter | Device | Bus | Measures |
//! |---------|--------|-----|----------|
//! | [`sht41::Sht41`] | Sensirion SHT41 | I2C via mux ch1 | temp/RH (reference) |
//! | [`shtc3::Shtc3`] | Sensirion SHTC3 ×4 | I2C via mux ch2–5 | zone temp/RH |
//! | [`bme280::Bme280`] | Bosch BME280 | I2C direct | temp/RH/pressure |
//! | [`gp2y1010::Gp2y1010`] | Sharp GP2Y1010AU0F | ADS1115 + LED pin | PM2.5 |
//! | [`mhz19b::Mhz19b`] | Winsen MH-Z19B | UART | CO₂ |
//!
//! Concrete port implementations for Raspberry Pi hardware live behind the
//! `raspberry-pi` feature in [`rpi`].

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod ads1115;
pub mod bme280;
pub mod crc;
pub mod gp2y1010;
pub mod mhz19b;
pub mod mux;
pub mod port;
pub mod sht41;
pub mod shtc3;

#[cfg(feature = "raspberry-pi")]
pub mod rpi;

pub use ads1115::{Ads1115, ADS1115_ADDR};
pub use bme280::{Bme280, BME280_ADDR};
pub use gp2y1010::{Gp2y1010, DUST_ADC_CHANNEL};
pub use mhz19b::{Mhz19b, CMD_READ_CO2};
pub use mux::{Pca9548a, PCA9548A_ADDR};
pub use sht41::{Sht41, SHT41_ADDR, SHT41_CHANNEL};
pub use shtc3::{Shtc3, SHTC3_ADDR, SHTC3_CHANNELS};

use thiserror::Error;

/// A failed sample. Adapters never panic and never retry indefinitely;
/// every wait is bounded and expiry surfaces as one of these.
#[derive(Debug, Error)]
pub enum SampleError {
    /// I2C transaction failed at the bus level.
    #[error("bus error: {0}")]
    Bus(String),

    /// Serial link read/write failed.
    #[error("serial error: {0}")]
    Serial(String),

    /// Device did not answer within the bounded read window.
    #[error("response timed out")]
    Timeout,

    /// Response arrived but did not match the expected frame.
    #[error("malformed frame: {0}")]
    BadFrame(&'static str),

    /// Frame integrity check failed.
    #[error("CRC mismatch (expected {expected:#04x}, got {actual:#04x})")]
    CrcMismatch {
        /// CRC computed over the received data bytes.
        expected: u8,
        /// CRC byte the device sent.
        actual: u8,
    },

    /// Device present but refused to enter a usable state.
    #[error("device not ready: {0}")]
    NotReady(&'static str),

    /// Probe found a different chip than expected at the address.
    #[error("unexpected chip id {0:#04x}")]
    WrongChip(u8),
}

/// Temperature/humidity pair from an SHT4x or SHTC3 sensor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThermoHygroReading {
    /// Temperature, °C.
    pub temp_c: f64,
    /// Relative humidity, %.
    pub rh: f64,
}

/// Full environmental reading from a BME280.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BaroReading {
    /// Temperature, °C.
    pub temp_c: f64,
    /// Relative humidity, %.
    pub rh: f64,
    /// Barometric pressure, hPa.
    pub pressure_hpa: f64,
    /// Altitude estimate from the calibrated sea-level pressure, m.
    pub altitude_m: f64,
}

/// CO₂ reading from an MH-Z19B.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Co2Reading {
    /// CO₂ concentration, ppm.
    pub co2_ppm: u16,
    /// Die temperature, °C (coarse, for diagnostics only).
    pub temp_c: i16,
}

/// Dust reading from a GP2Y1010AU0F.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DustReading {
    /// Averaged output voltage after outlier rejection, V.
    pub vout_v: f64,
    /// Particulate concentration, µg/m³.
    pub pm_ugm3: f64,
}
