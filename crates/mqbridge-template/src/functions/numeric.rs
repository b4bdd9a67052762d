//! `num`: render a value as a numeric literal

use serde_json::Value;

/// Numeric literal text for `value`.
///
/// Numbers come back as their source literal, so large integers and
/// decimal fractions survive unchanged. A string is returned verbatim when it
/// parses as a float. Anything else, including a missing value, yields `"0"`.
pub fn num(value: Option<&Value>) -> String {
    match value {
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::String(s)) if s.parse::<f64>().is_ok() => s.clone(),
        _ => "0".to_string(),
    }
}
