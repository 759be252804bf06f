//! Sampling workers
//!
//! Three loops, one per bus attachment group:
//!
//! - **mux worker**: the reference SHT41 plus the four zone SHTC3s behind
//!   the PCA9548A, every second.
//! - **baro/dust worker**: BME280 and GP2Y1010AU0F, every second.
//! - **co2 worker**: MH-Z19B over UART, every 2.5 s.
//!
//! The two I2C workers share one bus behind a mutex. The guard is held for
//! exactly one device transaction (mux select plus the device exchange),
//! so a slow sensor delays the other worker by at most one transaction.
//! The UART worker never touches the bus at all.
//!
//! A failed sample logs and clears the sensor's slot in shared state; it
//! never stops the loop or touches any other sensor's slot.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use aerosense_core::metrics::mux_channel_to_zone;
use aerosense_drivers::port::{I2cBus, OutputPin, SerialLink};
use aerosense_drivers::{
    Bme280, Gp2y1010, Mhz19b, Pca9548a, Sht41, Shtc3, SHT41_CHANNEL, SHTC3_CHANNELS,
};

use crate::state::SharedState;

/// Zone and reference sampling period.
pub const MUX_WORKER_PERIOD: Duration = Duration::from_secs(1);

/// Barometer and dust sampling period.
pub const BARO_DUST_WORKER_PERIOD: Duration = Duration::from_secs(1);

/// CO₂ sampling period.
pub const CO2_WORKER_PERIOD: Duration = Duration::from_millis(2500);

/// The I2C bus shared between the mux worker and the baro/dust worker.
pub type SharedBus = Arc<Mutex<Box<dyn I2cBus>>>;

fn lock_bus(bus: &SharedBus) -> MutexGuard<'_, Box<dyn I2cBus>> {
    bus.lock().unwrap_or_else(|e| e.into_inner())
}

/// Sleeps for `period`, waking early when `shutdown` is raised.
pub(crate) fn idle(shutdown: &AtomicBool, period: Duration) {
    let step = Duration::from_millis(100);
    let mut remaining = period;
    while !shutdown.load(Ordering::Relaxed) && !remaining.is_zero() {
        let nap = remaining.min(step);
        thread::sleep(nap);
        remaining -= nap;
    }
}

/// Samples the reference SHT41 and the four zone SHTC3s behind the mux.
pub fn mux_worker(bus: SharedBus, state: SharedState, shutdown: Arc<AtomicBool>, period: Duration) {
    let mux = Pca9548a::new();
    let mut sht41 = Sht41::new();
    let mut shtc3 = Shtc3::new();

    while !shutdown.load(Ordering::Relaxed) {
        let result = {
            let mut bus = lock_bus(&bus);
            mux.select(bus.as_mut(), SHT41_CHANNEL)
                .and_then(|()| sht41.sample(bus.as_mut()))
        };
        match result {
            Ok(reading) => {
                log::debug!(
                    "reference: {:.1} °C, {:.1} %RH",
                    reading.temp_c,
                    reading.rh
                );
                state.set_reference(Some(reading));
            }
            Err(e) => {
                log::warn!("reference sensor sample failed: {e}");
                state.set_reference(None);
            }
        }

        for &channel in &SHTC3_CHANNELS {
            if shutdown.load(Ordering::Relaxed) {
                return;
            }
            let Some(zone) = mux_channel_to_zone(channel) else {
                continue;
            };
            let result = {
                let mut bus = lock_bus(&bus);
                mux.select(bus.as_mut(), channel)
                    .and_then(|()| shtc3.sample(bus.as_mut()))
            };
            match result {
                Ok(reading) => {
                    log::debug!(
                        "zone {zone}: {:.1} °C, {:.1} %RH",
                        reading.temp_c,
                        reading.rh
                    );
                    state.set_zone(zone, Some(reading));
                }
                Err(e) => {
                    log::warn!("zone {zone} sample failed: {e}");
                    state.set_zone(zone, None);
                }
            }
        }

        idle(&shutdown, period);
    }
}

/// Samples the BME280 and the dust sensor.
///
/// The barometer is initialized and sea-level calibrated once at startup;
/// if that fails the worker keeps running in degraded mode and publishes
/// dust only.
pub fn baro_dust_worker(
    bus: SharedBus,
    state: SharedState,
    shutdown: Arc<AtomicBool>,
    period: Duration,
    true_altitude_m: f64,
    led: Box<dyn OutputPin>,
) {
    let mut bme = Bme280::new();
    let mut dust = Gp2y1010::new(led);

    let baro_available = {
        let mut bus = lock_bus(&bus);
        bme.init(bus.as_mut())
            .and_then(|()| bme.calibrate_sea_level(bus.as_mut(), true_altitude_m))
    };
    let baro_available = match baro_available {
        Ok(sea_level) => {
            log::info!("barometer calibrated: sea-level reference {sea_level:.2} hPa");
            true
        }
        Err(e) => {
            log::error!("barometer init failed, continuing without pressure: {e}");
            false
        }
    };

    while !shutdown.load(Ordering::Relaxed) {
        if baro_available {
            let result = {
                let mut bus = lock_bus(&bus);
                bme.sample(bus.as_mut())
            };
            match result {
                Ok(reading) => {
                    log::debug!(
                        "baro: {:.2} hPa ({:.1} m), {:.1} °C, {:.1} %RH",
                        reading.pressure_hpa,
                        reading.altitude_m,
                        reading.temp_c,
                        reading.rh
                    );
                    state.set_baro(Some(reading));
                }
                Err(e) => {
                    log::warn!("barometer sample failed: {e}");
                    state.set_baro(None);
                }
            }
        }

        if shutdown.load(Ordering::Relaxed) {
            return;
        }

        let result = {
            let mut bus = lock_bus(&bus);
            dust.sample(bus.as_mut())
        };
        match result {
            Ok(reading) => {
                log::debug!(
                    "dust: {:.1} µg/m³ ({:.4} V)",
                    reading.pm_ugm3,
                    reading.vout_v
                );
                state.set_dust(Some(reading));
            }
            Err(e) => {
                log::warn!("dust sample failed: {e}");
                state.set_dust(None);
            }
        }

        idle(&shutdown, period);
    }
}

/// Samples the MH-Z19B over its dedicated UART.
pub fn co2_worker(
    mut link: Box<dyn SerialLink>,
    state: SharedState,
    shutdown: Arc<AtomicBool>,
    period: Duration,
) {
    let mut sensor = Mhz19b::new();
    if sensor.warm_up(link.as_mut()) {
        log::info!("CO₂ sensor warmed up");
    } else {
        log::warn!("CO₂ sensor did not answer during warm-up, sampling anyway");
    }

    while !shutdown.load(Ordering::Relaxed) {
        match sensor.sample(link.as_mut()) {
            Ok(reading) => {
                log::debug!("co2: {} ppm ({} °C)", reading.co2_ppm, reading.temp_c);
                state.set_co2(Some(reading));
            }
            Err(e) => {
                log::warn!("CO₂ sample failed: {e}");
                state.set_co2(None);
            }
        }
        idle(&shutdown, period);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use aerosense_drivers::{SampleError, CMD_READ_CO2};

    /// Bus where every device read fails.
    struct DeadBus;

    impl I2cBus for DeadBus {
        fn write(&mut self, _addr: u8, _bytes: &[u8]) -> Result<(), SampleError> {
            Ok(())
        }

        fn read(&mut self, _addr: u8, _buf: &mut [u8]) -> Result<(), SampleError> {
            Err(SampleError::Bus("no response".into()))
        }

        fn delay(&mut self, _duration: Duration) {}
    }

    /// Serial link that always answers with a valid 420 ppm frame.
    struct HealthySerial;

    impl SerialLink for HealthySerial {
        fn clear_input(&mut self) -> Result<(), SampleError> {
            Ok(())
        }

        fn write_all(&mut self, bytes: &[u8]) -> Result<(), SampleError> {
            assert_eq!(bytes, CMD_READ_CO2);
            Ok(())
        }

        fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), SampleError> {
            // 420 ppm, 24 °C
            let mut frame = [0xFF, 0x86, 0x01, 0xA4, 0x40, 0x00, 0x00, 0x00, 0x00];
            let sum: u8 = frame[1..8].iter().fold(0u8, |acc, &b| acc.wrapping_add(b));
            frame[8] = (!sum).wrapping_add(1);
            buf.copy_from_slice(&frame);
            Ok(())
        }

        fn delay(&mut self, _duration: Duration) {}
    }

    #[test]
    fn failed_bus_worker_does_not_block_the_serial_worker() {
        let bus: SharedBus = Arc::new(Mutex::new(Box::new(DeadBus)));
        let state = SharedState::new();
        let shutdown = Arc::new(AtomicBool::new(false));
        let period = Duration::from_millis(1);

        let mux_handle = {
            let (bus, state, shutdown) = (bus.clone(), state.clone(), shutdown.clone());
            thread::spawn(move || mux_worker(bus, state, shutdown, period))
        };
        let co2_handle = {
            let (state, shutdown) = (state.clone(), shutdown.clone());
            thread::spawn(move || co2_worker(Box::new(HealthySerial), state, shutdown, period))
        };

        // Let both loops run a few iterations.
        thread::sleep(Duration::from_millis(50));
        shutdown.store(true, Ordering::Relaxed);
        mux_handle.join().unwrap();
        co2_handle.join().unwrap();

        let snap = state.snapshot();
        assert!(snap.zones.iter().all(Option::is_none));
        assert!(snap.reference.is_none());
        let co2 = snap.co2.expect("serial worker should have sampled");
        assert_eq!(co2.co2_ppm, 420);
        assert_eq!(co2.temp_c, 24);
    }

    #[test]
    fn idle_returns_early_on_shutdown() {
        let shutdown = AtomicBool::new(true);
        let start = std::time::Instant::now();
        idle(&shutdown, Duration::from_secs(10));
        assert!(start.elapsed() < Duration::from_secs(1));
    }
}
