//! rumqttc-backed broker sessions

use async_trait::async_trait;
use rumqttc::{
    AsyncClient, Event, EventLoop, MqttOptions, Outgoing, Packet, QoS, TlsConfiguration,
    Transport,
};
use std::sync::Arc;

use super::link::{BrokerConnector, BrokerLink, BrokerOutbox, BrokerSession, LinkError, LinkEvent};
use super::{DeliverySettings, Qos, tls};
use crate::error::DeliveryError;

/// Request channel capacity between the client handle and the event loop
const REQUEST_CAPACITY: usize = 64;

impl From<Qos> for QoS {
    fn from(qos: Qos) -> Self {
        match qos {
            Qos::AtMostOnce => QoS::AtMostOnce,
            Qos::AtLeastOnce => QoS::AtLeastOnce,
            Qos::ExactlyOnce => QoS::ExactlyOnce,
        }
    }
}

/// Opens rumqttc sessions with fixed options
pub struct MqttConnector {
    options: MqttOptions,
}

impl MqttConnector {
    /// Prepare options from settings; loads TLS material up front
    pub fn new(settings: &DeliverySettings) -> Result<Self, DeliveryError> {
        let mut options = MqttOptions::new(
            settings.client_id.clone(),
            settings.address.host.clone(),
            settings.address.port,
        );
        options.set_keep_alive(settings.keep_alive);
        options.set_clean_session(true);
        if let Some((username, password)) = &settings.credentials {
            options.set_credentials(username.clone(), password.clone());
        }
        if let Some(files) = &settings.tls {
            let config = tls::client_config(files)?;
            options.set_transport(Transport::tls_with_config(TlsConfiguration::Rustls(config)));
        }
        Ok(Self { options })
    }
}

impl BrokerConnector for MqttConnector {
    fn open(&self) -> Result<BrokerSession, LinkError> {
        let (client, eventloop) = AsyncClient::new(self.options.clone(), REQUEST_CAPACITY);
        Ok(BrokerSession {
            outbox: Arc::new(MqttOutbox { client }),
            link: Box::new(MqttLink { eventloop }),
        })
    }
}

struct MqttOutbox {
    client: AsyncClient,
}

#[async_trait]
impl BrokerOutbox for MqttOutbox {
    async fn publish(
        &self,
        topic: &str,
        qos: Qos,
        retain: bool,
        payload: Vec<u8>,
    ) -> Result<(), LinkError> {
        self.client
            .publish(topic, qos.into(), retain, payload)
            .await
            .map_err(|e| LinkError(e.to_string()))
    }

    fn try_disconnect(&self) -> Result<(), LinkError> {
        self.client
            .try_disconnect()
            .map_err(|e| LinkError(e.to_string()))
    }
}

struct MqttLink {
    eventloop: EventLoop,
}

#[async_trait]
impl BrokerLink for MqttLink {
    async fn poll(&mut self) -> Result<LinkEvent, LinkError> {
        let event = self
            .eventloop
            .poll()
            .await
            .map_err(|e| LinkError(e.to_string()))?;
        Ok(match event {
            Event::Incoming(Packet::ConnAck(_)) => LinkEvent::ConnAck,
            Event::Incoming(Packet::PubAck(ack)) => LinkEvent::Acked { pkid: ack.pkid },
            Event::Incoming(Packet::PubComp(comp)) => LinkEvent::Acked { pkid: comp.pkid },
            Event::Outgoing(Outgoing::Publish(pkid)) => LinkEvent::Sent { pkid },
            _ => LinkEvent::Other,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delivery::{BrokerAddress, ReconnectPolicy};
    use std::time::Duration;

    fn settings() -> DeliverySettings {
        DeliverySettings {
            address: BrokerAddress {
                host: "localhost".into(),
                port: 1883,
                tls: false,
            },
            client_id: "bridge-test".into(),
            credentials: Some(("user".into(), "secret".into())),
            tls: None,
            reconnect: ReconnectPolicy::default(),
            keep_alive: Duration::from_secs(30),
        }
    }

    #[test]
    fn test_connector_options() {
        let connector = MqttConnector::new(&settings()).unwrap();
        assert_eq!(connector.options.client_id(), "bridge-test");
        assert_eq!(connector.options.broker_address(), ("localhost".to_string(), 1883));
        assert_eq!(connector.options.keep_alive(), Duration::from_secs(30));
        assert!(connector.options.clean_session());
    }

    #[test]
    fn test_connector_rejects_missing_tls_files() {
        let mut settings = settings();
        settings.tls = Some(super::super::TlsFiles {
            ca_cert: "/nonexistent/ca.pem".into(),
            client: None,
        });
        assert!(matches!(
            MqttConnector::new(&settings),
            Err(DeliveryError::Tls(_))
        ));
    }

    #[test]
    fn test_qos_mapping() {
        assert_eq!(QoS::from(Qos::AtLeastOnce), QoS::AtLeastOnce);
        assert_eq!(QoS::from(Qos::ExactlyOnce), QoS::ExactlyOnce);
    }
}
