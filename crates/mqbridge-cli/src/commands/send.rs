//! Transform a document and publish it

use std::sync::Arc;

use anyhow::{Context, Result};
use mqbridge_core::{AppConfig, Recorder};
use mqbridge_runtime::{DeliveryClient, DeliverySettings, Pipeline, Transformer};

/// Run the send command
pub async fn run(
    config: &AppConfig,
    rule_id: &str,
    input: &str,
    recorder: Arc<dyn Recorder>,
) -> Result<()> {
    let rules = super::load_rules(config)?;
    let rule = super::find_rule(&rules, rule_id)?;
    let body = super::read_input(input)?;
    let rules = std::slice::from_ref(rule);

    let transformer =
        Transformer::new(rules, Arc::clone(&recorder)).context("Failed to compile template")?;
    let settings =
        DeliverySettings::from_config(&config.mqtt).context("Invalid MQTT configuration")?;
    let client = DeliveryClient::connect(&settings, recorder)
        .await
        .context("Failed to connect to MQTT broker")?;

    let pipeline = Pipeline::new(transformer, client, rules);
    let result = pipeline.process(rule_id, &body).await;
    pipeline.publisher().close().await;

    let payload = result.with_context(|| format!("Failed to process rule '{rule_id}'"))?;
    println!(
        "Published {} bytes to {} (qos {})",
        payload.len(),
        rule.target.topic,
        rule.target.qos
    );
    Ok(())
}
