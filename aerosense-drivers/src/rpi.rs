//! Raspberry Pi port implementations backed by `rppal`
//!
//! Scoped resource acquisition: each open function returns an owned handle
//! that releases the underlying device when dropped, so worker shutdown
//! cleans up without any process-exit hooks.

use std::time::Duration;

use rppal::gpio::Gpio;
use rppal::i2c::I2c;
use rppal::uart::{Parity, Queue, Uart};

use crate::port::{I2cBus, OutputPin, SerialLink};
use crate::SampleError;

/// The Pi's main I2C bus (`/dev/i2c-1`).
pub struct RpiI2c {
    i2c: I2c,
}

impl RpiI2c {
    /// Opens the main bus.
    pub fn open() -> Result<Self, SampleError> {
        let i2c = I2c::new().map_err(|e| SampleError::Bus(e.to_string()))?;
        Ok(Self { i2c })
    }
}

impl I2cBus for RpiI2c {
    fn write(&mut self, addr: u8, bytes: &[u8]) -> Result<(), SampleError> {
        self.i2c
            .set_slave_address(u16::from(addr))
            .map_err(|e| SampleError::Bus(e.to_string()))?;
        self.i2c
            .write(bytes)
            .map_err(|e| SampleError::Bus(e.to_string()))?;
        Ok(())
    }

    fn read(&mut self, addr: u8, buf: &mut [u8]) -> Result<(), SampleError> {
        self.i2c
            .set_slave_address(u16::from(addr))
            .map_err(|e| SampleError::Bus(e.to_string()))?;
        self.i2c
            .read(buf)
            .map_err(|e| SampleError::Bus(e.to_string()))?;
        Ok(())
    }
}

/// UART link on `/dev/serial0` with a bounded blocking read.
pub struct RpiUart {
    uart: Uart,
}

impl RpiUart {
    /// Opens the serial device at the MH-Z19B's 9600 8N1 with a 1 s read
    /// timeout. An unbounded read mode is never configured.
    pub fn open(path: &str, baud: u32) -> Result<Self, SampleError> {
        let mut uart = Uart::with_path(path, baud, Parity::None, 8, 1)
            .map_err(|e| SampleError::Serial(e.to_string()))?;
        uart.set_read_mode(0, Duration::from_secs(1))
            .map_err(|e| SampleError::Serial(e.to_string()))?;
        Ok(Self { uart })
    }
}

impl SerialLink for RpiUart {
    fn clear_input(&mut self) -> Result<(), SampleError> {
        self.uart
            .flush(Queue::Input)
            .map_err(|e| SampleError::Serial(e.to_string()))
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<(), SampleError> {
        let written = self
            .uart
            .write(bytes)
            .map_err(|e| SampleError::Serial(e.to_string()))?;
        if written != bytes.len() {
            return Err(SampleError::Serial("short UART write".into()));
        }
        Ok(())
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), SampleError> {
        let mut filled = 0;
        while filled < buf.len() {
            let n = self
                .uart
                .read(&mut buf[filled..])
                .map_err(|e| SampleError::Serial(e.to_string()))?;
            if n == 0 {
                return Err(SampleError::Timeout);
            }
            filled += n;
        }
        Ok(())
    }
}

/// A claimed GPIO output pin.
pub struct RpiPin {
    pin: rppal::gpio::OutputPin,
}

impl RpiPin {
    /// Claims a BCM-numbered pin as an output, initially high (the dust
    /// sensor LED is active low, so high means off).
    pub fn claim_output_high(bcm_pin: u8) -> Result<Self, SampleError> {
        let gpio = Gpio::new().map_err(|e| SampleError::Bus(e.to_string()))?;
        let mut pin = gpio
            .get(bcm_pin)
            .map_err(|e| SampleError::Bus(e.to_string()))?
            .into_output();
        pin.set_high();
        Ok(Self { pin })
    }
}

impl OutputPin for RpiPin {
    fn set_high(&mut self) -> Result<(), SampleError> {
        self.pin.set_high();
        Ok(())
    }

    fn set_low(&mut self) -> Result<(), SampleError> {
        self.pin.set_low();
        Ok(())
    }
}
