//! Application configuration
//!
//! Configuration is a single JSON file (YAML is accepted for `.yaml`/`.yml`
//! paths) with camelCase keys:
//!
//! ```json
//! {
//!   "mqtt": {
//!     "broker": "tcp://localhost:1883",
//!     "clientId": "mqbridge",
//!     "tls": { "enabled": false, "caCert": "", "cert": "", "key": "" },
//!     "reconnect": { "initial": 1, "maxDelay": 60, "maxRetries": 5 }
//!   },
//!   "api": { "host": "0.0.0.0", "port": 8080 },
//!   "rules": { "directory": "rules" },
//!   "logger": { "level": "info", "outputPath": "stdout", "encoding": "console" }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Root application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Broker connection
    pub mqtt: MqttConfig,

    /// Inbound API listener
    pub api: ApiConfig,

    /// Rule source
    pub rules: RulesConfig,

    /// Logging
    pub logger: LoggerConfig,
}

/// MQTT connection configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MqttConfig {
    /// Broker URL, e.g. `tcp://localhost:1883` or `ssl://broker:8883`
    pub broker: String,

    /// MQTT client id
    pub client_id: String,

    /// Username (empty for anonymous)
    pub username: String,

    /// Password
    pub password: String,

    /// TLS settings
    pub tls: TlsConfig,

    /// Connect and reconnect timing
    pub reconnect: ReconnectConfig,
}

/// TLS settings for the broker connection
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TlsConfig {
    /// Whether TLS is used
    pub enabled: bool,

    /// CA bundle (PEM); required when enabled
    pub ca_cert: String,

    /// Client certificate (PEM)
    pub cert: String,

    /// Client private key (PEM)
    pub key: String,
}

/// Reconnect timing, in seconds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReconnectConfig {
    /// Delay between initial connect attempts, and the first reconnect backoff
    pub initial: u64,

    /// Upper bound for the reconnect backoff
    pub max_delay: u64,

    /// Failed initial connect attempts tolerated before giving up
    pub max_retries: u32,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial: 1,
            max_delay: 60,
            max_retries: 5,
        }
    }
}

/// Inbound API listener
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Bind host
    pub host: String,

    /// Bind port
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// Rule source
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    /// Directory of `*.json` rule files; relative paths are resolved against
    /// the configuration file's directory
    pub directory: PathBuf,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("rules"),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LoggerConfig {
    /// Level filter (`trace`, `debug`, `info`, `warn`, `error`)
    pub level: String,

    /// `stdout`, `stderr`, or a file path (appended)
    pub output_path: String,

    /// Encoding
    pub encoding: LogEncoding,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            output_path: "stdout".to_string(),
            encoding: LogEncoding::Console,
        }
    }
}

/// Log line encoding
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogEncoding {
    /// Human readable
    #[default]
    Console,
    /// One JSON object per line
    Json,
}

impl AppConfig {
    /// Load, validate and resolve a configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(Error::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let contents = std::fs::read_to_string(path)?;
        let yaml = path
            .extension()
            .is_some_and(|ext| ext == "yaml" || ext == "yml");
        let parsed = if yaml {
            serde_yaml::from_str::<AppConfig>(&contents).map_err(|e| e.to_string())
        } else {
            serde_json::from_str::<AppConfig>(&contents).map_err(|e| e.to_string())
        };
        let mut config = parsed.map_err(|message| Error::ConfigParse {
            path: path.display().to_string(),
            message,
        })?;

        config.validate()?;

        if config.rules.directory.is_relative() {
            let base = path.parent().unwrap_or(Path::new("."));
            config.rules.directory = base.join(&config.rules.directory);
        }

        tracing::debug!(
            config = %path.display(),
            rules = %config.rules.directory.display(),
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Check required fields and value ranges.
    pub fn validate(&self) -> Result<()> {
        if self.mqtt.broker.is_empty() {
            return Err(invalid("MQTT broker URL is required"));
        }
        if self.mqtt.client_id.is_empty() {
            return Err(invalid("MQTT client ID is required"));
        }
        if self.api.port == 0 {
            return Err(invalid("invalid API port number"));
        }
        if self.mqtt.tls.enabled && self.mqtt.tls.ca_cert.is_empty() {
            return Err(invalid("CA certificate is required when TLS is enabled"));
        }
        if self.mqtt.tls.cert.is_empty() != self.mqtt.tls.key.is_empty() {
            return Err(invalid("TLS client cert and key must be given together"));
        }
        let reconnect = &self.mqtt.reconnect;
        if reconnect.initial == 0 {
            return Err(invalid("reconnect.initial must be at least 1 second"));
        }
        if reconnect.max_delay < reconnect.initial {
            return Err(invalid("reconnect.maxDelay must not be less than reconnect.initial"));
        }
        Ok(())
    }
}

fn invalid(message: &str) -> Error {
    Error::ConfigInvalid {
        message: message.to_string(),
    }
}
