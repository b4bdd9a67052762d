//! `bool`: render a value as a boolean literal

use serde_json::Value;

/// Boolean literal for `value`.
///
/// Booleans pass through and the strings `"true"`/`"false"` are kept as is.
/// Every number is `true`, zero included; rule authors rely on this, so it
/// stays until the rule format is versioned. Everything else is `false`.
pub fn bool(value: Option<&Value>) -> &'static str {
    match value {
        Some(Value::Bool(true)) => "true",
        Some(Value::String(s)) if s == "true" => "true",
        Some(Value::Number(_)) => "true",
        _ => "false",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("true", "true")]
    #[case("false", "false")]
    #[case("\"true\"", "true")]
    #[case("\"false\"", "false")]
    #[case("\"yes\"", "false")]
    #[case("\"TRUE\"", "false")]
    #[case("1", "true")]
    #[case("0", "true")]
    #[case("0.0", "true")]
    #[case("-3.5", "true")]
    #[case("null", "false")]
    #[case("[]", "false")]
    #[case("{}", "false")]
    fn test_bool(#[case] input: &str, #[case] expected: &str) {
        let value: Value = serde_json::from_str(input).unwrap();
        assert_eq!(bool(Some(&value)), expected);
    }

    #[test]
    fn test_bool_missing() {
        assert_eq!(bool(None), "false");
    }
}
