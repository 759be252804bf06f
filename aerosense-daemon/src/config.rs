//! Daemon configuration from the environment
//!
//! Every knob has a default that matches a single-unit deployment, so a
//! bare `aerosense` invocation against a local broker just works. Topic
//! destinations are a comma-separated `topic:qos` list, e.g.
//! `hvac/1/air:1,site/overview:0`.

use std::env;

use aerosense_connectors::DeliveryLevel;
use anyhow::{bail, Context, Result};

/// Runtime configuration resolved at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// MQTT broker hostname or IP.
    pub broker_host: String,
    /// MQTT broker port.
    pub broker_port: u16,
    /// Unit identifier embedded in every payload.
    pub hvac_id: u32,
    /// Publish destinations as (topic, delivery level) pairs.
    pub topics: Vec<(String, DeliveryLevel)>,
    /// True altitude of the installation, metres. Used once at startup to
    /// calibrate the barometer's sea-level reference.
    pub true_altitude_m: f64,
    /// Serial device for the CO₂ sensor.
    pub serial_device: String,
    /// BCM pin number driving the dust sensor's IR LED.
    pub dust_led_pin: u8,
}

impl Config {
    /// Reads configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        let broker_host =
            env::var("MQTT_BROKER_HOST").unwrap_or_else(|_| "localhost".to_string());
        let broker_port = parse_var("MQTT_BROKER_PORT", 1883_u16)?;
        let hvac_id = parse_var("AEROSENSE_HVAC_ID", 1_u32)?;
        let true_altitude_m = parse_var("AEROSENSE_TRUE_ALTITUDE_M", 26.0_f64)?;
        let serial_device =
            env::var("AEROSENSE_SERIAL_DEV").unwrap_or_else(|_| "/dev/serial0".to_string());
        let dust_led_pin = parse_var("AEROSENSE_DUST_LED_PIN", 17_u8)?;

        let topics = match env::var("AEROSENSE_TOPICS") {
            Ok(raw) => parse_topics(&raw)?,
            Err(_) => vec![(format!("hvac/{hvac_id}/air"), DeliveryLevel::AtLeastOnce)],
        };

        Ok(Self {
            broker_host,
            broker_port,
            hvac_id,
            topics,
            true_altitude_m,
            serial_device,
            dust_led_pin,
        })
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw.parse().with_context(|| format!("parsing {name}={raw}")),
        Err(_) => Ok(default),
    }
}

/// Parses a `topic:qos` comma-separated list.
pub fn parse_topics(raw: &str) -> Result<Vec<(String, DeliveryLevel)>> {
    let mut topics = Vec::new();
    for entry in raw.split(',') {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        let (topic, level) = match entry.rsplit_once(':') {
            Some((topic, qos)) => {
                let qos: u8 = qos
                    .parse()
                    .with_context(|| format!("bad QoS in topic entry {entry:?}"))?;
                let level = DeliveryLevel::from_qos(qos)
                    .with_context(|| format!("QoS out of range in topic entry {entry:?}"))?;
                (topic, level)
            }
            None => (entry, DeliveryLevel::AtLeastOnce),
        };
        if topic.is_empty() {
            bail!("empty topic in entry {entry:?}");
        }
        topics.push((topic.to_string(), level));
    }
    if topics.is_empty() {
        bail!("no publish topics configured");
    }
    Ok(topics)
}
