//! List rules command

use anyhow::Result;
use mqbridge_core::AppConfig;

/// Run the rules command
pub async fn run(config: &AppConfig) -> Result<()> {
    let rules = super::load_rules(config)?;

    if rules.is_empty() {
        println!("No rules in {}", config.rules.directory.display());
        return Ok(());
    }

    for rule in &rules {
        println!(
            "{}  {} -> {} (qos {}, retain {})",
            rule.id,
            rule.route(),
            rule.target.topic,
            rule.target.qos,
            rule.target.retain
        );
        if !rule.description.is_empty() {
            println!("    {}", rule.description);
        }
    }
    Ok(())
}
