//! PCA9548A I2C multiplexer channel selection
//!
//! The mux fans the single Raspberry Pi bus out to eight downstream
//! channels. Selecting a channel writes a one-hot mask to the control
//! register; the selection persists until the next write, so it must
//! happen inside the same guarded transaction as the read that follows it.

use std::time::Duration;

use crate::port::I2cBus;
use crate::SampleError;

/// Default PCA9548A address on this board.
pub const PCA9548A_ADDR: u8 = 0x74;

/// Settle time after switching channels.
const SWITCH_SETTLE: Duration = Duration::from_millis(50);

/// Handle for one PCA9548A.
#[derive(Debug, Clone, Copy)]
pub struct Pca9548a {
    addr: u8,
}

impl Pca9548a {
    /// Mux at the board's default address.
    pub fn new() -> Self {
        Self {
            addr: PCA9548A_ADDR,
        }
    }

    /// Mux at a non-default address.
    pub fn at(addr: u8) -> Self {
        Self { addr }
    }

    /// Routes the bus to `channel` (0..=7) and waits for it to settle.
    pub fn select(&self, bus: &mut dyn I2cBus, channel: u8) -> Result<(), SampleError> {
        if channel > 7 {
            return Err(SampleError::BadFrame("mux channel out of range"));
        }
        bus.write(self.addr, &[1u8 << channel])?;
        bus.delay(SWITCH_SETTLE);
        Ok(())
    }
}

impl Default for Pca9548a {
    fn default() -> Self {
        Self::new()
    }
}
