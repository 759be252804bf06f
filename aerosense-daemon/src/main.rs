//! Aerosense daemon entry point
//!
//! Wires the pieces together: resolves configuration, acquires hardware
//! ports, spawns the sampling workers and the publisher, then waits for a
//! termination signal. Shutdown raises one flag; every loop observes it
//! and exits within a bounded grace period.

mod config;
mod hardware;
mod publisher;
mod state;
mod workers;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};

use aerosense_connectors::{MqttConfig, MqttConnector};
use aerosense_core::MonotonicClock;

use crate::config::Config;
use crate::publisher::Publisher;
use crate::state::SharedState;
use crate::workers::{
    baro_dust_worker, co2_worker, mux_worker, SharedBus, BARO_DUST_WORKER_PERIOD,
    CO2_WORKER_PERIOD, MUX_WORKER_PERIOD,
};

/// How long shutdown waits for threads to finish their current iteration.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("aerosense {} starting", aerosense_core::VERSION);

    let config = Config::from_env().context("loading configuration")?;
    log::info!(
        "broker {}:{}, unit {}, {} destination(s)",
        config.broker_host,
        config.broker_port,
        config.hvac_id,
        config.topics.len()
    );

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = Arc::clone(&shutdown);
        ctrlc::set_handler(move || {
            log::info!("shutdown requested");
            shutdown.store(true, Ordering::Relaxed);
        })
        .context("installing signal handler")?;
    }

    let state = SharedState::new();
    let ports = hardware::acquire(&config);
    let mut handles: Vec<(&'static str, JoinHandle<()>)> = Vec::new();

    if let Some(i2c) = ports.i2c {
        let bus: SharedBus = Arc::new(Mutex::new(i2c));

        {
            let (bus, state, shutdown) = (Arc::clone(&bus), state.clone(), Arc::clone(&shutdown));
            let handle = thread::Builder::new()
                .name("worker-mux".into())
                .spawn(move || mux_worker(bus, state, shutdown, MUX_WORKER_PERIOD))
                .context("spawning mux worker")?;
            handles.push(("worker-mux", handle));
        }

        match ports.dust_led {
            Some(led) => {
                let (state, shutdown) = (state.clone(), Arc::clone(&shutdown));
                let altitude = config.true_altitude_m;
                let handle = thread::Builder::new()
                    .name("worker-baro-dust".into())
                    .spawn(move || {
                        baro_dust_worker(
                            bus,
                            state,
                            shutdown,
                            BARO_DUST_WORKER_PERIOD,
                            altitude,
                            led,
                        )
                    })
                    .context("spawning baro/dust worker")?;
                handles.push(("worker-baro-dust", handle));
            }
            None => log::warn!("dust LED pin missing, skipping barometer/dust worker"),
        }
    }

    if let Some(serial) = ports.serial {
        let (state, shutdown) = (state.clone(), Arc::clone(&shutdown));
        let handle = thread::Builder::new()
            .name("worker-co2".into())
            .spawn(move || co2_worker(serial, state, shutdown, CO2_WORKER_PERIOD))
            .context("spawning co2 worker")?;
        handles.push(("worker-co2", handle));
    }

    let connector = MqttConnector::new(
        MqttConfig::new(config.broker_host.clone(), config.broker_port)
            .client_id(format!("aerosense-{}", config.hvac_id)),
    )?;
    let publisher = Publisher::new(config.hvac_id, config.topics.clone(), connector);
    {
        let (state, shutdown) = (state.clone(), Arc::clone(&shutdown));
        let handle = thread::Builder::new()
            .name("publisher".into())
            .spawn(move || publisher.run(MonotonicClock::new(), state, shutdown))
            .context("spawning publisher")?;
        handles.push(("publisher", handle));
    }

    while !shutdown.load(Ordering::Relaxed) {
        thread::sleep(Duration::from_millis(100));
    }

    log::info!("stopping {} thread(s)", handles.len());
    let deadline = Instant::now() + SHUTDOWN_GRACE;
    for (name, handle) in handles {
        while !handle.is_finished() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }
        if handle.is_finished() {
            let _ = handle.join();
            log::debug!("{name} stopped");
        } else {
            log::warn!("{name} did not stop within the grace period");
        }
    }

    log::info!("aerosense stopped");
    Ok(())
}
