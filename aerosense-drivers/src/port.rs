//! Bus port traits the adapters are written against
//!
//! These are deliberately minimal: just enough surface for the devices in
//! the inventory. Keeping `delay` on the trait lets scripted test ports
//! skip the real settle times, so driver tests run in microseconds while
//! hardware ports sleep for real.

use std::thread;
use std::time::Duration;

use crate::SampleError;

/// A shared I2C bus. One transaction = one or more calls made while the
/// caller holds the bus guard; the trait itself knows nothing about locks.
pub trait I2cBus: Send {
    /// Writes `bytes` to the device at `addr`.
    fn write(&mut self, addr: u8, bytes: &[u8]) -> Result<(), SampleError>;

    /// Reads `buf.len()` bytes from the device at `addr`.
    fn read(&mut self, addr: u8, buf: &mut [u8]) -> Result<(), SampleError>;

    /// Waits for a device settle time.
    fn delay(&mut self, duration: Duration) {
        thread::sleep(duration);
    }
}

/// A serial link with a bounded read timeout configured at open time.
/// An unbounded blocking read is a design error; implementations must
/// return [`SampleError::Timeout`] when the window expires.
pub trait SerialLink: Send {
    /// Discards anything buffered on the receive side.
    fn clear_input(&mut self) -> Result<(), SampleError>;

    /// Writes the full buffer.
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), SampleError>;

    /// Reads exactly `buf.len()` bytes or times out.
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), SampleError>;

    /// Waits between polls.
    fn delay(&mut self, duration: Duration) {
        thread::sleep(duration);
    }
}

/// A single GPIO output (the dust sensor's IR LED drive pin).
pub trait OutputPin: Send {
    /// Drives the pin high.
    fn set_high(&mut self) -> Result<(), SampleError>;

    /// Drives the pin low.
    fn set_low(&mut self) -> Result<(), SampleError>;
}

impl<T: I2cBus + ?Sized> I2cBus for Box<T> {
    fn write(&mut self, addr: u8, bytes: &[u8]) -> Result<(), SampleError> {
        (**self).write(addr, bytes)
    }

    fn read(&mut self, addr: u8, buf: &mut [u8]) -> Result<(), SampleError> {
        (**self).read(addr, buf)
    }

    fn delay(&mut self, duration: Duration) {
        (**self).delay(duration)
    }
}

impl<T: OutputPin + ?Sized> OutputPin for Box<T> {
    fn set_high(&mut self) -> Result<(), SampleError> {
        (**self).set_high()
    }

    fn set_low(&mut self) -> Result<(), SampleError> {
        (**self).set_low()
    }
}
