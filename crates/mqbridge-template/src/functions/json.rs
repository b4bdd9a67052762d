//! `toJSON` and `fromJSON`

use serde_json::Value;

/// Compact JSON text for `value`; a missing value is `null`.
pub fn to_json(value: Option<&Value>) -> String {
    match value {
        Some(v) => serde_json::to_string(v).unwrap_or_else(|_| "null".to_string()),
        None => "null".to_string(),
    }
}

/// Parse a JSON string argument.
///
/// Returns `None` (a missing value) for non-string arguments, malformed
/// text and a literal `null`.
pub fn from_json(value: Option<&Value>) -> Option<Value> {
    let Some(Value::String(text)) = value else {
        return None;
    };
    serde_json::from_str::<Value>(text)
        .ok()
        .filter(|parsed| !parsed.is_null())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_to_json() {
        assert_eq!(to_json(Some(&json!("a\"b"))), r#""a\"b""#);
        assert_eq!(to_json(Some(&json!({"b": 1, "a": [true, null]}))), r#"{"a":[true,null],"b":1}"#);
        assert_eq!(to_json(Some(&Value::Null)), "null");
        assert_eq!(to_json(None), "null");
    }

    #[test]
    fn test_to_json_keeps_number_literal() {
        let value: Value = serde_json::from_str("[1.50, 123456789012345678901]").unwrap();
        assert_eq!(to_json(Some(&value)), "[1.50,123456789012345678901]");
    }

    #[test]
    fn test_from_json() {
        assert_eq!(from_json(Some(&json!(r#"{"id":7}"#))), Some(json!({"id": 7})));
        assert_eq!(from_json(Some(&json!("\"s\""))), Some(json!("s")));
        assert_eq!(from_json(Some(&json!("not json"))), None);
        assert_eq!(from_json(Some(&json!("null"))), None);
        assert_eq!(from_json(Some(&json!("[1] trailing"))), None);
        assert_eq!(from_json(Some(&json!(42))), None);
        assert_eq!(from_json(None), None);
    }

    fn arb_json() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(|n| Value::from(n)),
            "[a-zA-Z0-9 \"\\\\]{0,12}".prop_map(Value::String),
        ];
        leaf.prop_recursive(3, 24, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
                prop::collection::btree_map("[a-z]{1,6}", inner, 0..4)
                    .prop_map(|m| Value::Object(m.into_iter().collect())),
            ]
        })
    }

    proptest! {
        #[test]
        fn prop_from_json_inverts_to_json(value in arb_json()) {
            let encoded = Value::String(to_json(Some(&value)));
            prop_assert_eq!(from_json(Some(&encoded)), Some(value));
        }
    }
}
