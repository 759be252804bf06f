//! Hardware port acquisition
//!
//! Each port is acquired independently; a device that fails to open is
//! logged and left out, and the daemon runs with whatever it got. The
//! returned handles are owned and release their devices on drop.

use aerosense_drivers::port::{I2cBus, OutputPin, SerialLink};

use crate::config::Config;

/// Ports the daemon managed to open.
pub struct Hardware {
    /// The shared I2C bus, if it opened.
    pub i2c: Option<Box<dyn I2cBus>>,
    /// The CO₂ sensor's UART, if it opened.
    pub serial: Option<Box<dyn SerialLink>>,
    /// The dust sensor's LED drive pin, if it was claimed.
    pub dust_led: Option<Box<dyn OutputPin>>,
}

/// MH-Z19B fixed baud rate.
#[cfg(feature = "raspberry-pi")]
const CO2_BAUD: u32 = 9600;

#[cfg(feature = "raspberry-pi")]
pub fn acquire(config: &Config) -> Hardware {
    use aerosense_drivers::rpi::{RpiI2c, RpiPin, RpiUart};

    let i2c: Option<Box<dyn I2cBus>> = match RpiI2c::open() {
        Ok(bus) => Some(Box::new(bus)),
        Err(e) => {
            log::error!("I2C bus unavailable: {e}");
            None
        }
    };

    let serial: Option<Box<dyn SerialLink>> = match RpiUart::open(&config.serial_device, CO2_BAUD)
    {
        Ok(link) => Some(Box::new(link)),
        Err(e) => {
            log::error!("serial device {} unavailable: {e}", config.serial_device);
            None
        }
    };

    let dust_led: Option<Box<dyn OutputPin>> = match RpiPin::claim_output_high(config.dust_led_pin)
    {
        Ok(pin) => Some(Box::new(pin)),
        Err(e) => {
            log::error!("dust LED pin {} unavailable: {e}", config.dust_led_pin);
            None
        }
    };

    Hardware {
        i2c,
        serial,
        dust_led,
    }
}

#[cfg(not(feature = "raspberry-pi"))]
pub fn acquire(_config: &Config) -> Hardware {
    log::error!("built without the raspberry-pi feature; no sensors will be sampled");
    Hardware {
        i2c: None,
        serial: None,
        dust_led: None,
    }
}
