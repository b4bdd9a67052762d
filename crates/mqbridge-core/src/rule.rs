//! Rule model, validation and loading
//!
//! A rule maps an inbound API route to a template and an MQTT target:
//!
//! ```json
//! {
//!   "id": "orders",
//!   "description": "Forward orders",
//!   "api": { "method": "POST", "path": "/orders" },
//!   "transform": { "template": "{\"id\":\"{{.x}}\"}" },
//!   "target": { "topic": "shop/orders", "qos": 1, "retain": false }
//! }
//! ```
//!
//! Rules live one per `.json` file in the rules directory. Loading is
//! fail-fast: the first unreadable, malformed or invalid file aborts the load.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use mqbridge_template::CompiledTemplate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result, RuleField};

/// HTTP methods a rule may bind to (case-sensitive)
pub const METHODS: [&str; 5] = ["GET", "POST", "PUT", "PATCH", "DELETE"];

/// Highest MQTT QoS level
pub const MAX_QOS: i32 = 2;

/// Topics must be non-empty levels without the `#`/`+` wildcards
static TOPIC_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^#+]+(/[^#+]+)*$").expect("valid regex"));

/// A transformation rule
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Rule {
    /// Unique rule id
    pub id: String,

    /// Free text description
    pub description: String,

    /// Inbound route
    pub api: RuleApi,

    /// Payload transformation
    pub transform: Transform,

    /// Publish target
    pub target: Target,
}

/// Inbound API binding
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleApi {
    /// HTTP method, one of [`METHODS`]
    pub method: String,

    /// Absolute request path
    pub path: String,
}

/// Transformation settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Transform {
    /// Template text
    pub template: String,
}

/// MQTT publish target
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Target {
    /// Topic name (no wildcards)
    pub topic: String,

    /// QoS level 0-2
    pub qos: i32,

    /// Retain flag
    pub retain: bool,
}

impl Rule {
    /// Check the rule, returning the first failure.
    ///
    /// Checks run in order: id, method, path, template, topic, qos.
    pub fn validate(&self) -> Result<()> {
        self.validate_and_compile().map(|_| ())
    }

    /// Validate and return the compiled template.
    pub fn validate_and_compile(&self) -> Result<CompiledTemplate> {
        if self.id.is_empty() {
            return Err(self.invalid(RuleField::Id, "rule ID is required"));
        }
        validate_method(&self.api.method).map_err(|m| self.invalid(RuleField::Method, m))?;
        if !self.api.path.starts_with('/') {
            return Err(self.invalid(RuleField::Path, "API path must start with /"));
        }
        if self.transform.template.is_empty() {
            return Err(self.invalid(
                RuleField::Template,
                "transformation template is required",
            ));
        }
        let compiled = mqbridge_template::compile(&self.id, &self.transform.template)
            .map_err(|e| self.invalid(RuleField::Template, e.to_string()))?;
        validate_topic(&self.target.topic).map_err(|m| self.invalid(RuleField::Topic, m))?;
        validate_qos(self.target.qos).map_err(|m| self.invalid(RuleField::Qos, m))?;
        Ok(compiled)
    }

    /// Route in `METHOD /path` form
    pub fn route(&self) -> String {
        format!("{} {}", self.api.method, self.api.path)
    }

    fn invalid(&self, field: RuleField, message: impl Into<String>) -> Error {
        Error::RuleValidation {
            rule_id: self.id.clone(),
            field,
            message: message.into(),
        }
    }
}

/// Validate an HTTP method name.
pub fn validate_method(method: &str) -> std::result::Result<(), String> {
    if METHODS.contains(&method) {
        Ok(())
    } else {
        Err(format!("invalid HTTP method: {method}"))
    }
}

/// Validate an MQTT topic name.
pub fn validate_topic(topic: &str) -> std::result::Result<(), String> {
    if topic.is_empty() {
        return Err("topic cannot be empty".to_string());
    }
    if !TOPIC_REGEX.is_match(topic) {
        return Err(format!("invalid topic format: {topic}"));
    }
    Ok(())
}

/// Validate a QoS level.
pub fn validate_qos(qos: i32) -> std::result::Result<(), String> {
    if !(0..=MAX_QOS).contains(&qos) {
        return Err(format!(
            "invalid QoS level: {qos}, must be between 0 and {MAX_QOS}"
        ));
    }
    Ok(())
}

/// Parse and validate a single rule file.
pub fn load_rule_file(path: impl AsRef<Path>) -> Result<Rule> {
    let path = path.as_ref();
    let wrap = |source: Error| Error::RuleFile {
        file: path.to_path_buf(),
        source: Box::new(source),
    };
    let contents = std::fs::read_to_string(path).map_err(|e| wrap(e.into()))?;
    let rule: Rule = serde_json::from_str(&contents).map_err(|e| wrap(e.into()))?;
    rule.validate().map_err(wrap)?;
    Ok(rule)
}

/// Load every `*.json` rule in `dir` (non-recursive, sorted by file name).
pub fn load_rules(dir: impl AsRef<Path>) -> Result<Vec<Rule>> {
    let dir = dir.as_ref();
    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)
        .map_err(|source| Error::RulesDirectory {
            path: dir.to_path_buf(),
            source,
        })?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    entries.sort();

    let mut rules = Vec::with_capacity(entries.len());
    let mut seen: HashMap<String, PathBuf> = HashMap::new();
    for path in entries {
        let rule = load_rule_file(&path)?;
        if let Some(first) = seen.get(&rule.id) {
            return Err(Error::DuplicateRule {
                rule_id: rule.id,
                first: first.clone(),
                file: path,
            });
        }
        tracing::info!(rule_id = %rule.id, file = %path.display(), "Loaded rule");
        seen.insert(rule.id.clone(), path);
        rules.push(rule);
    }

    Ok(rules)
}
