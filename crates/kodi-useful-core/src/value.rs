//! Conversions between bound [`Value`]s and query-string text.

pub use serde_json::Value;

/// A flattened query parameter: one value or several.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryValue {
    /// The key appeared once.
    Single(String),
    /// The key appeared several times, in query-string order.
    Multi(Vec<String>),
}

impl QueryValue {
    /// Returns every raw value.
    pub fn as_slice(&self) -> &[String] {
        match self {
            Self::Single(v) => std::slice::from_ref(v),
            Self::Multi(v) => v,
        }
    }

    /// Converts into a JSON string or array of strings.
    pub fn into_value(self) -> Value {
        match self {
            Self::Single(v) => Value::String(v),
            Self::Multi(v) => Value::Array(v.into_iter().map(Value::String).collect()),
        }
    }
}

/// Renders a value as the raw strings it occupies in a query string.
///
/// Lists become one entry per element (repeated keys), `Null` produces no
/// entry at all, strings are kept verbatim, numbers and booleans use their
/// JSON spelling so the default JSON coercion reads them back unchanged, and
/// objects are written as JSON text.
pub fn query_strings(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().filter_map(scalar_string).collect(),
        other => scalar_string(other).into_iter().collect(),
    }
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(_) | Value::Object(_) => Some(value.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_query_strings() {
        assert_eq!(query_strings(&json!("a b")), vec!["a b"]);
        assert_eq!(query_strings(&json!(25)), vec!["25"]);
        assert_eq!(query_strings(&json!(false)), vec!["false"]);
        assert!(query_strings(&Value::Null).is_empty());
        assert_eq!(query_strings(&json!([1, "x", null])), vec!["1", "x"]);
        assert_eq!(query_strings(&json!({"k": 1})), vec![r#"{"k":1}"#]);
    }

    #[test]
    fn test_query_value_into_value() {
        assert_eq!(QueryValue::Single("1".into()).into_value(), json!("1"));
        assert_eq!(
            QueryValue::Multi(vec!["1".into(), "2".into()]).into_value(),
            json!(["1", "2"])
        );
    }
}
