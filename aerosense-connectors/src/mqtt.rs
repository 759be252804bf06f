//! MQTT connector on `rumqttc`'s synchronous client
//!
//! ## Design
//!
//! `rumqttc` splits the client from the network event loop, so the
//! connector spawns one background thread to drive the loop (and with it
//! keep-alives, acknowledgements, and automatic reconnection). The
//! publisher-facing [`Connector::publish`] uses `try_publish`, which
//! enqueues without blocking: when the outbound queue is full the message
//! is dropped with [`ConnectorError::BufferFull`] instead of stalling the
//! publish cycle. Telemetry summaries supersede each other every ten
//! seconds, so dropping under backpressure is the right trade.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use rumqttc::{Client, Event, MqttOptions, Packet, QoS};

use crate::{ConnectionStats, Connector, ConnectorError, DeliveryLevel};

impl From<DeliveryLevel> for QoS {
    fn from(level: DeliveryLevel) -> Self {
        match level {
            DeliveryLevel::AtMostOnce => QoS::AtMostOnce,
            DeliveryLevel::AtLeastOnce => QoS::AtLeastOnce,
            DeliveryLevel::ExactlyOnce => QoS::ExactlyOnce,
        }
    }
}

/// MQTT connection settings.
#[derive(Debug, Clone)]
pub struct MqttConfig {
    /// Broker hostname or IP.
    pub host: String,
    /// Broker port.
    pub port: u16,
    /// Client identifier presented to the broker.
    pub client_id: String,
    /// Keep-alive interval.
    pub keep_alive: Duration,
    /// Outbound request queue capacity.
    pub queue_capacity: usize,
}

impl MqttConfig {
    /// Config for a broker with the usual defaults.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            client_id: "aerosense".into(),
            keep_alive: Duration::from_secs(60),
            queue_capacity: 10,
        }
    }

    /// Sets the client identifier.
    pub fn client_id(mut self, id: impl Into<String>) -> Self {
        self.client_id = id.into();
        self
    }

    /// Sets the keep-alive interval in seconds.
    pub fn keep_alive_secs(mut self, secs: u64) -> Self {
        self.keep_alive = Duration::from_secs(secs);
        self
    }
}

struct Session {
    client: Client,
    worker: Option<JoinHandle<()>>,
}

/// MQTT connector.
pub struct MqttConnector {
    config: MqttConfig,
    session: Option<Session>,
    connected: Arc<AtomicBool>,
    shutdown: Arc<AtomicBool>,
    stats: Arc<Mutex<ConnectionStats>>,
}

impl MqttConnector {
    /// Creates a connector; no network activity until [`Connector::connect`].
    pub fn new(config: MqttConfig) -> Result<Self, ConnectorError> {
        if config.host.is_empty() {
            return Err(ConnectorError::Config("empty broker host".into()));
        }
        Ok(Self {
            config,
            session: None,
            connected: Arc::new(AtomicBool::new(false)),
            shutdown: Arc::new(AtomicBool::new(false)),
            stats: Arc::new(Mutex::new(ConnectionStats::default())),
        })
    }

    /// Requests a clean disconnect and joins the event-loop thread.
    pub fn shutdown(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(mut session) = self.session.take() {
            let _ = session.client.disconnect();
            if let Some(worker) = session.worker.take() {
                let _ = worker.join();
            }
        }
        self.connected.store(false, Ordering::SeqCst);
    }

    fn record_success(&self, bytes: usize) {
        if let Ok(mut stats) = self.stats.lock() {
            stats.messages_sent += 1;
            stats.bytes_sent += bytes as u64;
        }
    }

    fn record_failure(&self) {
        if let Ok(mut stats) = self.stats.lock() {
            stats.messages_failed += 1;
        }
    }
}

impl Connector for MqttConnector {
    type Error = ConnectorError;

    fn connect(&mut self) -> Result<(), Self::Error> {
        if self.session.is_some() {
            return Ok(());
        }

        let mut options = MqttOptions::new(
            self.config.client_id.clone(),
            self.config.host.clone(),
            self.config.port,
        );
        options.set_keep_alive(self.config.keep_alive);

        let (client, mut connection) = Client::new(options, self.config.queue_capacity);

        let connected = Arc::clone(&self.connected);
        let shutdown = Arc::clone(&self.shutdown);
        let worker = thread::Builder::new()
            .name("mqtt-eventloop".into())
            .spawn(move || {
                for event in connection.iter() {
                    if shutdown.load(Ordering::SeqCst) {
                        break;
                    }
                    match event {
                        Ok(Event::Incoming(Packet::ConnAck(_))) => {
                            log::info!("MQTT session established");
                            connected.store(true, Ordering::SeqCst);
                        }
                        Ok(_) => {}
                        Err(e) => {
                            if connected.swap(false, Ordering::SeqCst) {
                                log::warn!("MQTT connection lost: {e}");
                            }
                            // rumqttc reconnects on the next iteration;
                            // pace the retries when the broker stays down
                            thread::sleep(Duration::from_secs(1));
                        }
                    }
                }
                connected.store(false, Ordering::SeqCst);
            })
            .map_err(|e| ConnectorError::Protocol(format!("spawn event loop: {e}")))?;

        self.session = Some(Session {
            client,
            worker: Some(worker),
        });
        Ok(())
    }

    fn publish(
        &mut self,
        topic: &str,
        level: DeliveryLevel,
        payload: &[u8],
    ) -> Result<(), Self::Error> {
        let session = self.session.as_ref().ok_or(ConnectorError::NotConnected)?;

        match session
            .client
            .try_publish(topic, level.into(), false, payload.to_vec())
        {
            Ok(()) => {
                self.record_success(payload.len());
                Ok(())
            }
            Err(rumqttc::ClientError::TryRequest(_)) => {
                self.record_failure();
                Err(ConnectorError::BufferFull)
            }
            Err(e) => {
                self.record_failure();
                Err(ConnectorError::Protocol(e.to_string()))
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn stats(&self) -> ConnectionStats {
        self.stats
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default()
    }
}

impl Drop for MqttConnector {
    fn drop(&mut self) {
        self.shutdown();
    }
}
