//! Delivery settings derived from the `mqtt` config section

use std::path::PathBuf;
use std::time::Duration;

use mqbridge_core::config::MqttConfig;
use url::Url;

use super::ReconnectPolicy;
use crate::error::DeliveryError;

/// MQTT keep-alive interval
pub const KEEP_ALIVE: Duration = Duration::from_secs(30);

const PLAIN_SCHEMES: [&str; 2] = ["tcp", "mqtt"];
const TLS_SCHEMES: [&str; 3] = ["ssl", "tls", "mqtts"];

/// Broker host, port and transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerAddress {
    /// Host name or IP
    pub host: String,
    /// TCP port
    pub port: u16,
    /// Whether the scheme asks for TLS
    pub tls: bool,
}

impl BrokerAddress {
    /// Parse `scheme://host[:port]`. Plain schemes default to port 1883,
    /// TLS schemes to 8883.
    pub fn parse(broker: &str) -> Result<Self, DeliveryError> {
        let url = Url::parse(broker)
            .map_err(|e| DeliveryError::Setup(format!("invalid broker URL '{broker}': {e}")))?;
        let scheme = url.scheme();
        let tls = if TLS_SCHEMES.contains(&scheme) {
            true
        } else if PLAIN_SCHEMES.contains(&scheme) {
            false
        } else {
            return Err(DeliveryError::Setup(format!(
                "unsupported broker scheme '{scheme}' (expected tcp, mqtt, ssl, tls or mqtts)"
            )));
        };
        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| DeliveryError::Setup(format!("broker URL '{broker}' has no host")))?
            .trim_start_matches('[')
            .trim_end_matches(']')
            .to_string();
        let port = url.port().unwrap_or(if tls { 8883 } else { 1883 });
        Ok(Self { host, port, tls })
    }
}

/// Certificate files for a TLS connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsFiles {
    /// CA bundle (PEM)
    pub ca_cert: PathBuf,
    /// Client certificate and key (PEM)
    pub client: Option<(PathBuf, PathBuf)>,
}

/// Everything the delivery client needs to connect
#[derive(Debug, Clone)]
pub struct DeliverySettings {
    /// Where to connect
    pub address: BrokerAddress,
    /// MQTT client id
    pub client_id: String,
    /// Username and password, when a username is configured
    pub credentials: Option<(String, String)>,
    /// TLS material; `Some` means the connection uses TLS
    pub tls: Option<TlsFiles>,
    /// Connect and reconnect timing
    pub reconnect: ReconnectPolicy,
    /// Keep-alive interval
    pub keep_alive: Duration,
}

impl DeliverySettings {
    /// Build settings from configuration.
    ///
    /// TLS is used when `tls.enabled` is set or the broker scheme asks for it;
    /// either way a CA certificate is required.
    pub fn from_config(config: &MqttConfig) -> Result<Self, DeliveryError> {
        let address = BrokerAddress::parse(&config.broker)?;
        if config.client_id.is_empty() {
            return Err(DeliveryError::Setup("MQTT client ID is required".to_string()));
        }

        let tls = if config.tls.enabled || address.tls {
            if config.tls.ca_cert.is_empty() {
                return Err(DeliveryError::Setup(
                    "CA certificate is required when TLS is enabled".to_string(),
                ));
            }
            let client = match (config.tls.cert.is_empty(), config.tls.key.is_empty()) {
                (true, true) => None,
                (false, false) => Some((
                    PathBuf::from(&config.tls.cert),
                    PathBuf::from(&config.tls.key),
                )),
                _ => {
                    return Err(DeliveryError::Setup(
                        "TLS client cert and key must be given together".to_string(),
                    ));
                }
            };
            Some(TlsFiles {
                ca_cert: PathBuf::from(&config.tls.ca_cert),
                client,
            })
        } else {
            None
        };

        let credentials = (!config.username.is_empty())
            .then(|| (config.username.clone(), config.password.clone()));

        Ok(Self {
            address,
            client_id: config.client_id.clone(),
            credentials,
            tls,
            reconnect: ReconnectPolicy::from(&config.reconnect),
            keep_alive: KEEP_ALIVE,
        })
    }
}
