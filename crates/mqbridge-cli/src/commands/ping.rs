//! Broker connectivity check

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use mqbridge_core::{AppConfig, Recorder};
use mqbridge_runtime::{DeliveryClient, DeliverySettings};

/// Run the ping command
pub async fn run(config: &AppConfig, recorder: Arc<dyn Recorder>) -> Result<()> {
    let settings =
        DeliverySettings::from_config(&config.mqtt).context("Invalid MQTT configuration")?;
    let client = DeliveryClient::connect(&settings, recorder)
        .await
        .with_context(|| format!("Failed to connect to {}", config.mqtt.broker))?;

    let connected = client.is_connected();
    client.close().await;

    if !connected {
        bail!("Broker {} is not reachable", config.mqtt.broker);
    }
    println!("Connected to {} as {}", config.mqtt.broker, settings.client_id);
    Ok(())
}
