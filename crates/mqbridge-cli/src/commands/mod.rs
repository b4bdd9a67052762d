//! CLI command implementations

use std::io::Read;

use anyhow::{Context, Result, bail};
use mqbridge_core::{AppConfig, Rule, rule};

pub mod ping;
pub mod render;
pub mod rules;
pub mod send;
pub mod validate;

/// Load and validate every rule in the configured directory
fn load_rules(config: &AppConfig) -> Result<Vec<Rule>> {
    rule::load_rules(&config.rules.directory).with_context(|| {
        format!(
            "Failed to load rules from {}",
            config.rules.directory.display()
        )
    })
}

/// Pick one rule by id
fn find_rule<'a>(rules: &'a [Rule], rule_id: &str) -> Result<&'a Rule> {
    match rules.iter().find(|r| r.id == rule_id) {
        Some(rule) => Ok(rule),
        None => bail!("Rule '{rule_id}' not found"),
    }
}

/// Read a request body from a file, or stdin for `-`
fn read_input(input: &str) -> Result<Vec<u8>> {
    if input == "-" {
        let mut body = Vec::new();
        std::io::stdin()
            .read_to_end(&mut body)
            .context("Failed to read input from stdin")?;
        Ok(body)
    } else {
        std::fs::read(input).with_context(|| format!("Failed to read input file {input}"))
    }
}
