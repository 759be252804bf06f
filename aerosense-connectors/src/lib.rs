//! Messaging connectors for publishing aggregated summaries
//!
//! ## Overview
//!
//! The publisher hands each serialized summary to a [`Connector`]; the
//! connector owns the transport. Only MQTT is implemented today, but the
//! trait keeps the publisher transport-agnostic and lets tests substitute
//! a scripted connector.
//!
//! ## Contract
//!
//! - `connect` is idempotent and cheap to retry; a broker that is down at
//!   startup is a logged condition, not a fatal one.
//! - `publish` must not block the caller beyond a short bounded window.
//!   Delivery may complete asynchronously after the call returns.
//! - A connector failure is always returned to the caller; connectors
//!   never crash the process.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod mqtt;

pub use mqtt::{MqttConfig, MqttConnector};

use thiserror::Error;

/// Common connector errors.
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// No broker session is established.
    #[error("not connected")]
    NotConnected,

    /// The outbound queue is full; the message was dropped rather than
    /// blocking the publisher.
    #[error("outbound buffer full")]
    BufferFull,

    /// The operation did not complete within its bounded window.
    #[error("timeout")]
    Timeout,

    /// Transport-level failure.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Bad connector configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Delivery guarantee requested for one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryLevel {
    /// Fire and forget.
    AtMostOnce,
    /// Acknowledged at least once; duplicates possible.
    AtLeastOnce,
    /// Exactly once (four-way handshake; rarely worth it for telemetry).
    ExactlyOnce,
}

impl DeliveryLevel {
    /// Parses the numeric QoS used in topic configuration strings.
    pub fn from_qos(qos: u8) -> Option<Self> {
        match qos {
            0 => Some(Self::AtMostOnce),
            1 => Some(Self::AtLeastOnce),
            2 => Some(Self::ExactlyOnce),
            _ => None,
        }
    }
}

/// Trait for all protocol connectors.
pub trait Connector: Send {
    /// Connector-specific error type.
    type Error: std::error::Error;

    /// Establishes (or re-establishes) the transport session.
    fn connect(&mut self) -> Result<(), Self::Error>;

    /// Hands one message to the transport without blocking beyond a short
    /// bounded window.
    fn publish(
        &mut self,
        topic: &str,
        level: DeliveryLevel,
        payload: &[u8],
    ) -> Result<(), Self::Error>;

    /// Whether the transport session is currently up.
    fn is_connected(&self) -> bool;

    /// Cumulative connection statistics.
    fn stats(&self) -> ConnectionStats;
}

/// Connection statistics common to all connectors.
#[derive(Debug, Default, Clone)]
pub struct ConnectionStats {
    /// Messages handed to the transport successfully.
    pub messages_sent: u64,
    /// Messages that failed or were dropped.
    pub messages_failed: u64,
    /// Payload bytes handed to the transport.
    pub bytes_sent: u64,
}
