//! Validate configuration command

use std::sync::Arc;

use anyhow::{Context, Result};
use mqbridge_core::{AppConfig, Recorder};
use mqbridge_runtime::{DeliverySettings, Transformer};

/// Run the validate command
pub async fn run(config: &AppConfig, recorder: Arc<dyn Recorder>) -> Result<()> {
    let settings =
        DeliverySettings::from_config(&config.mqtt).context("Invalid MQTT configuration")?;
    tracing::info!(
        host = %settings.address.host,
        port = settings.address.port,
        tls = settings.tls.is_some(),
        "MQTT settings are valid"
    );

    let rules = super::load_rules(config)?;
    let transformer = Transformer::new(&rules, recorder).context("Failed to compile templates")?;

    println!(
        "Configuration is valid: {} rule(s) loaded from {}",
        transformer.active_rules(),
        config.rules.directory.display()
    );
    Ok(())
}
