//! Total accessors over untyped JSON.
//!
//! Every helper here maps "whatever the server sent" to an `Option` or a
//! default. None of them fail, which is what lets the response model parse
//! partial or malformed envelopes without raising.

use serde_json::{Map, Value};

pub type Object = Map<String, Value>;

/// Returns the nested object under `key` when it is a non-empty JSON object.
///
/// Empty objects, `null`, and non-object values all count as absent.
pub(crate) fn object<'a>(map: &'a Object, key: &str) -> Option<&'a Object> {
    match map.get(key) {
        Some(Value::Object(inner)) if !inner.is_empty() => Some(inner),
        _ => None,
    }
}

pub(crate) fn string(map: &Object, key: &str) -> Option<String> {
    map.get(key).and_then(Value::as_str).map(str::to_owned)
}

/// Like [`string`], falling back to `default` when the key is absent or not a string.
pub(crate) fn string_or(map: &Object, key: &str, default: &str) -> String {
    string(map, key).unwrap_or_else(|| default.to_owned())
}

/// Reads a float from a number or a numeric string.
pub(crate) fn float(map: &Object, key: &str) -> Option<f64> {
    map.get(key).and_then(to_float)
}

pub(crate) fn to_float(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

/// Best-effort integer coercion.
///
/// Integers pass through, finite floats truncate toward zero, strings must
/// hold an integer literal, and booleans map to 0/1. Anything else is `None`.
pub(crate) fn to_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_u64().map(|u| i64::try_from(u).unwrap_or(i64::MAX)))
            .or_else(|| {
                n.as_f64()
                    .filter(|f| f.is_finite())
                    .map(|f| f.trunc() as i64)
            }),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        Value::Bool(b) => Some(i64::from(*b)),
        _ => None,
    }
}

pub(crate) fn int(map: &Object, key: &str) -> Option<i64> {
    map.get(key).and_then(to_int)
}

/// JSON truthiness: `null`, `false`, `0`, `""`, `[]` and `{}` are false.
pub(crate) fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

pub(crate) fn flag(map: &Object, key: &str) -> bool {
    map.get(key).is_some_and(truthy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(value: Value) -> Object {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_int_coercion() {
        assert_eq!(to_int(&json!(7)), Some(7));
        assert_eq!(to_int(&json!("12")), Some(12));
        assert_eq!(to_int(&json!(" -3 ")), Some(-3));
        assert_eq!(to_int(&json!(4.9)), Some(4));
        assert_eq!(to_int(&json!(true)), Some(1));
        assert_eq!(to_int(&json!("4.5")), None);
        assert_eq!(to_int(&json!("many")), None);
        assert_eq!(to_int(&json!(null)), None);
        assert_eq!(to_int(&json!([1])), None);
    }

    #[test]
    fn test_float_accepts_numeric_strings() {
        let map = obj(json!({"a": 0.25, "b": "1.5", "c": "fast", "d": null}));
        assert_eq!(float(&map, "a"), Some(0.25));
        assert_eq!(float(&map, "b"), Some(1.5));
        assert_eq!(float(&map, "c"), None);
        assert_eq!(float(&map, "d"), None);
        assert_eq!(float(&map, "missing"), None);
    }

    #[test]
    fn test_truthiness() {
        assert!(!truthy(&json!(null)));
        assert!(!truthy(&json!(0)));
        assert!(!truthy(&json!("")));
        assert!(!truthy(&json!({})));
        assert!(truthy(&json!(1)));
        assert!(truthy(&json!("yes")));
        assert!(truthy(&json!([0])));
    }

    #[test]
    fn test_object_treats_empty_as_absent() {
        let map = obj(json!({"empty": {}, "full": {"k": 1}, "scalar": 3}));
        assert!(object(&map, "empty").is_none());
        assert!(object(&map, "scalar").is_none());
        assert!(object(&map, "missing").is_none());
        assert_eq!(object(&map, "full").map(|m| m.len()), Some(1));
    }

    #[test]
    fn test_string_ignores_non_strings() {
        let map = obj(json!({"s": "text", "n": 5}));
        assert_eq!(string(&map, "s").as_deref(), Some("text"));
        assert_eq!(string(&map, "n"), None);
        assert_eq!(string_or(&map, "n", "UNKNOWN"), "UNKNOWN");
    }
}
