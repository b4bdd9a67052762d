//! Integration tests for loading a deployment from disk
//!
//! Tests use temporary directories with real file fixtures to verify:
//! - Config loading with a relative rules directory
//! - Rule loading from the resolved directory
//! - Fail-fast behaviour for a single bad rule

use mqbridge_core::rule::load_rules;
use mqbridge_core::{AppConfig, Error, RuleField};
use tempfile::TempDir;

/// Helper to create a deployment directory with `config/app.json` and
/// `config/rules/`.
fn setup_deployment() -> TempDir {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join("config/rules")).unwrap();
    std::fs::write(
        dir.path().join("config/app.json"),
        r#"{
  "mqtt": {"broker": "tcp://localhost:1883", "clientId": "bridge-test"},
  "rules": {"directory": "rules"}
}"#,
    )
    .unwrap();
    dir
}

fn write_rule(dir: &TempDir, file: &str, body: &str) {
    std::fs::write(dir.path().join("config/rules").join(file), body).unwrap();
}

const ORDERS: &str = r#"{
  "id": "orders",
  "description": "Forward orders to the shop topic",
  "api": {"method": "POST", "path": "/orders"},
  "transform": {"template": "{\"id\":\"{{.x}}\",\"v\":{{num .y}}}"},
  "target": {"topic": "shop/orders", "qos": 1, "retain": false}
}"#;

const TELEMETRY: &str = r#"{
  "id": "telemetry",
  "api": {"method": "PUT", "path": "/devices/telemetry"},
  "transform": {"template": "{\"at\":\"{{now}}\",\"data\":{{toJSON .}}}"},
  "target": {"topic": "devices/telemetry", "qos": 0, "retain": true}
}"#;

#[test]
fn test_load_deployment() {
    let dir = setup_deployment();
    write_rule(&dir, "orders.json", ORDERS);
    write_rule(&dir, "telemetry.json", TELEMETRY);
    write_rule(&dir, "README.md", "# rules");

    let config = AppConfig::load(dir.path().join("config/app.json")).unwrap();
    let rules = load_rules(&config.rules.directory).unwrap();

    assert_eq!(rules.len(), 2);
    assert_eq!(rules[0].id, "orders");
    assert_eq!(rules[0].target.qos, 1);
    assert_eq!(rules[1].id, "telemetry");
    assert!(rules[1].target.retain);
}

#[test]
fn test_one_bad_rule_blocks_the_set() {
    let dir = setup_deployment();
    write_rule(&dir, "orders.json", ORDERS);
    write_rule(
        &dir,
        "zz-broken.json",
        &TELEMETRY.replace(r#""qos": 0"#, r#""qos": 5"#),
    );

    let config = AppConfig::load(dir.path().join("config/app.json")).unwrap();
    let err = load_rules(&config.rules.directory).unwrap_err();

    assert!(matches!(err, Error::RuleFile { .. }));
    let (rule_id, field, _) = err.rule_validation().unwrap();
    assert_eq!(rule_id, "telemetry");
    assert_eq!(field, RuleField::Qos);
    assert!(err.to_string().contains("zz-broken.json"));
}
