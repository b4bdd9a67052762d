//! Broker transport seams
//!
//! The client never talks to an MQTT library directly. A [`BrokerConnector`]
//! opens a [`BrokerSession`]: an outbox for requests and a link that yields
//! the events the client cares about. Every connect attempt opens a fresh
//! session, so nothing queued on a dead connection is replayed on a new one.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use super::Qos;

/// Transport events relevant to delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEvent {
    /// The broker accepted the connection
    ConnAck,
    /// A publish left the client, in request order
    Sent {
        /// Packet id (0 for QoS 0)
        pkid: u16,
    },
    /// The broker completed a QoS 1 or 2 publish
    Acked {
        /// Packet id
        pkid: u16,
    },
    /// Anything else (pings, outgoing acks)
    Other,
}

/// A transport or protocol failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct LinkError(pub String);

/// Event side of a session
#[async_trait]
pub trait BrokerLink: Send {
    /// Drive the connection and return the next event. An error means the
    /// session is dead.
    async fn poll(&mut self) -> Result<LinkEvent, LinkError>;
}

/// Request side of a session
#[async_trait]
pub trait BrokerOutbox: Send + Sync {
    /// Hand a publish to the transport, waiting while its request queue is
    /// full. Returns once the request is queued, not when it is sent.
    async fn publish(
        &self,
        topic: &str,
        qos: Qos,
        retain: bool,
        payload: Vec<u8>,
    ) -> Result<(), LinkError>;

    /// Queue a DISCONNECT without waiting
    fn try_disconnect(&self) -> Result<(), LinkError>;
}

/// One connection's outbox and link
pub struct BrokerSession {
    /// Request side
    pub outbox: Arc<dyn BrokerOutbox>,
    /// Event side
    pub link: Box<dyn BrokerLink>,
}

/// Opens sessions to a broker
pub trait BrokerConnector: Send + Sync + 'static {
    /// Start a new session. Connecting happens as the link is polled.
    fn open(&self) -> Result<BrokerSession, LinkError>;
}
