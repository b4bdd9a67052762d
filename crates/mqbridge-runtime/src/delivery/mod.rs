//! MQTT delivery
//!
//! - [`state`]: the pure connection state machine
//! - [`backoff`]: reconnect timing
//! - [`link`]: transport seams the client is written against
//! - [`mqtt`]: the rumqttc-backed transport
//! - [`tls`]: rustls client configuration
//! - [`client`]: the [`DeliveryClient`] that ties them together

pub mod backoff;
pub mod client;
pub mod link;
pub mod mqtt;
pub mod settings;
pub mod state;
pub mod tls;

pub use backoff::{Backoff, ReconnectPolicy};
pub use client::{DeliveryClient, PUBLISH_TIMEOUT};
pub use link::{BrokerConnector, BrokerLink, BrokerOutbox, BrokerSession, LinkError, LinkEvent};
pub use mqtt::MqttConnector;
pub use settings::{BrokerAddress, DeliverySettings, TlsFiles};
pub use state::{ConnectionEvent, ConnectionState};

use crate::error::DeliveryError;

/// MQTT quality of service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Qos {
    /// 0: fire and forget
    AtMostOnce,
    /// 1: acknowledged with PUBACK
    AtLeastOnce,
    /// 2: acknowledged with PUBCOMP
    ExactlyOnce,
}

impl TryFrom<i32> for Qos {
    type Error = DeliveryError;

    fn try_from(level: i32) -> Result<Self, Self::Error> {
        match level {
            0 => Ok(Self::AtMostOnce),
            1 => Ok(Self::AtLeastOnce),
            2 => Ok(Self::ExactlyOnce),
            other => Err(DeliveryError::InvalidQos(other)),
        }
    }
}

impl Qos {
    /// Whether the broker acknowledges this level
    pub fn is_acknowledged(self) -> bool {
        self != Self::AtMostOnce
    }
}
