//! Permissive coercion of loosely-typed JSON input
//!
//! Every function here is pure and total: null, missing or wrongly-typed
//! input falls back to the supplied default instead of failing.

use serde_json::{Map, Value};

/// String form of a scalar, or `default` for null
pub fn coerce_str(value: Option<&Value>, default: &str) -> String {
    match value {
        None | Some(Value::Null) => default.to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Optional text content: null stays absent, non-strings become their string form
pub fn coerce_content(value: Option<&Value>) -> Option<String> {
    match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => Some(other.to_string()),
    }
}

/// Signed integer, accepting integral numbers, truncated floats,
/// integer-looking strings and booleans
pub fn coerce_optional_i64(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && *f >= i64::MIN as f64 && *f <= i64::MAX as f64)
                .map(|f| f.trunc() as i64)
        }),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        Value::Bool(b) => Some(i64::from(*b)),
        _ => None,
    }
}

/// Signed integer with a default
pub fn coerce_i64(value: Option<&Value>, default: i64) -> i64 {
    coerce_optional_i64(value).unwrap_or(default)
}

/// Non-negative count with a default; negative input falls back
pub fn coerce_u64(value: Option<&Value>, default: u64) -> u64 {
    coerce_optional_i64(value)
        .and_then(|n| u64::try_from(n).ok())
        .unwrap_or(default)
}

/// Non-negative size/index with a default
pub fn coerce_usize(value: Option<&Value>, default: usize) -> usize {
    coerce_optional_i64(value)
        .and_then(|n| usize::try_from(n).ok())
        .unwrap_or(default)
}

/// Finite float, accepting numbers, numeric-looking strings and booleans
pub fn coerce_optional_f64(value: Option<&Value>) -> Option<f64> {
    let parsed = match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    };
    parsed.filter(|f| f.is_finite())
}

/// Finite float with a default
pub fn coerce_f64(value: Option<&Value>, default: f64) -> f64 {
    coerce_optional_f64(value).unwrap_or(default)
}

/// Object section; anything that is not a mapping becomes empty
pub fn coerce_object(value: Option<&Value>) -> Map<String, Value> {
    match value {
        Some(Value::Object(map)) => map.clone(),
        _ => Map::new(),
    }
}

/// Array section; anything that is not a sequence becomes empty
pub fn coerce_list(value: Option<&Value>) -> Vec<Value> {
    match value {
        Some(Value::Array(items)) => items.clone(),
        _ => Vec::new(),
    }
}

/// List of strings; null entries are skipped, other scalars keep their string form
pub fn coerce_string_list(value: Option<&Value>) -> Vec<String> {
    coerce_list(value)
        .iter()
        .filter(|item| !item.is_null())
        .map(|item| coerce_str(Some(item), ""))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_coerce_str() {
        assert_eq!(coerce_str(None, "d"), "d");
        assert_eq!(coerce_str(Some(&Value::Null), "d"), "d");
        assert_eq!(coerce_str(Some(&json!("x")), "d"), "x");
        assert_eq!(coerce_str(Some(&json!(42)), "d"), "42");
        assert_eq!(coerce_str(Some(&json!(true)), "d"), "true");
    }

    #[test]
    fn test_coerce_numbers_from_strings() {
        assert_eq!(coerce_i64(Some(&json!("12")), 0), 12);
        assert_eq!(coerce_i64(Some(&json!(" 7 ")), 0), 7);
        assert_eq!(coerce_i64(Some(&json!(3.9)), 0), 3);
        assert_eq!(coerce_i64(Some(&json!("abc")), 5), 5);
        assert_eq!(coerce_f64(Some(&json!("0.25")), 1.0), 0.25);
        assert_eq!(coerce_f64(Some(&json!({"a": 1})), 1.0), 1.0);
        assert_eq!(coerce_f64(Some(&json!("NaN")), 1.0), 1.0);
        assert_eq!(coerce_optional_f64(Some(&Value::Null)), None);
    }

    #[test]
    fn test_coerce_unsigned_rejects_negative() {
        assert_eq!(coerce_u64(Some(&json!(-3)), 9), 9);
        assert_eq!(coerce_usize(Some(&json!("4")), 0), 4);
    }

    #[test]
    fn test_coerce_containers() {
        assert!(coerce_object(Some(&json!(["bad"]))).is_empty());
        assert_eq!(coerce_object(Some(&json!({"k": 1}))).len(), 1);
        assert!(coerce_list(Some(&json!("nope"))).is_empty());
        assert_eq!(
            coerce_string_list(Some(&json!(["a", null, 2]))),
            vec!["a".to_string(), "2".to_string()]
        );
    }

    #[test]
    fn test_coerce_content() {
        assert_eq!(coerce_content(None), None);
        assert_eq!(coerce_content(Some(&json!("hi"))), Some("hi".to_string()));
        assert_eq!(coerce_content(Some(&json!(12))), Some("12".to_string()));
    }
}
