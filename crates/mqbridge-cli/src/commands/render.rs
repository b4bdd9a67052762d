//! Render a rule's transform offline

use std::sync::Arc;

use anyhow::{Context, Result};
use mqbridge_core::{AppConfig, Recorder};
use mqbridge_runtime::Transformer;

/// Run the render command
pub async fn run(
    config: &AppConfig,
    rule_id: &str,
    input: &str,
    recorder: Arc<dyn Recorder>,
) -> Result<()> {
    let rules = super::load_rules(config)?;
    let rule = super::find_rule(&rules, rule_id)?;
    let body = super::read_input(input)?;

    let transformer = Transformer::new(std::slice::from_ref(rule), recorder)
        .context("Failed to compile template")?;
    let output = transformer
        .transform(rule_id, &body)
        .with_context(|| format!("Failed to render rule '{rule_id}'"))?;

    println!("{}", String::from_utf8_lossy(&output));
    Ok(())
}
