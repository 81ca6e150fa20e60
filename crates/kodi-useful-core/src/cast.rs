//! Type coercion from raw query strings.
//!
//! A [`TypeCast`] turns one raw string into a [`Value`]. The built-in casts
//! cover the scalar types a route parameter can declare; custom getters are
//! ordinary closures wrapped with [`TypeCast::new`].

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::CastError;

type CastFn = dyn Fn(&str) -> Result<Value, CastError> + Send + Sync;

/// String forms recognised as `true` by [`parse_bool`].
const TRUE_STATES: [&str; 4] = ["1", "yes", "true", "on"];
/// String forms recognised as `false` by [`parse_bool`].
const FALSE_STATES: [&str; 5] = ["0", "no", "false", "off", ""];

/// A named, shareable coercion function from `&str` to [`Value`].
#[derive(Clone)]
pub struct TypeCast {
    name: &'static str,
    f: Arc<CastFn>,
}

impl TypeCast {
    /// Wraps a custom getter.
    ///
    /// ```rust,ignore
    /// let owner = TypeCast::new("owner", |raw| {
    ///     raw.strip_prefix("id")
    ///         .and_then(|id| id.parse::<i64>().ok())
    ///         .map(Value::from)
    ///         .ok_or_else(|| CastError::invalid(raw, "owner id"))
    /// });
    /// ```
    pub fn new<F>(name: &'static str, f: F) -> Self
    where
        F: Fn(&str) -> Result<Value, CastError> + Send + Sync + 'static,
    {
        Self {
            name,
            f: Arc::new(f),
        }
    }

    /// Returns the name of this cast (used in diagnostics).
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Applies the cast to a raw string.
    pub fn cast(&self, raw: &str) -> Result<Value, CastError> {
        (self.f)(raw)
    }

    /// JSON literal auto-detection; falls back to the raw string.
    pub fn json() -> Self {
        Self::new("json", |raw| Ok(parse_json(raw)))
    }

    /// Boolean coercion, see [`parse_bool`].
    pub fn boolean() -> Self {
        Self::new("bool", |raw| Ok(Value::Bool(parse_bool(raw))))
    }

    /// Signed 64-bit integer coercion.
    pub fn integer() -> Self {
        Self::new("int", |raw| {
            raw.trim()
                .parse::<i64>()
                .map(Value::from)
                .map_err(|_| CastError::invalid(raw, "int"))
        })
    }

    /// Floating point coercion. Non-finite results are rejected since JSON
    /// cannot represent them.
    pub fn float() -> Self {
        Self::new("float", |raw| {
            raw.trim()
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number)
                .ok_or_else(|| CastError::invalid(raw, "float"))
        })
    }

    /// Identity: keeps the raw string.
    pub fn string() -> Self {
        Self::new("str", |raw| Ok(Value::String(raw.to_owned())))
    }
}

impl fmt::Debug for TypeCast {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TypeCast").field(&self.name).finish()
    }
}

/// Parses a JSON literal, returning the raw string when it is not valid JSON.
pub fn parse_json(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_owned()))
}

/// Boolean coercion with the usual configuration-file spellings.
///
/// `1 yes true on` are true and `0 no false off` plus the empty string are
/// false, compared case-insensitively. Anything else falls back to string
/// truthiness, which for a non-empty string is `true`.
pub fn parse_bool(raw: &str) -> bool {
    let lowered = raw.to_ascii_lowercase();
    if TRUE_STATES.contains(&lowered.as_str()) {
        return true;
    }
    if FALSE_STATES.contains(&lowered.as_str()) {
        return false;
    }
    !raw.is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bool_states() {
        assert!(parse_bool("true"));
        assert!(parse_bool("YES"));
        assert!(parse_bool("On"));
        assert!(parse_bool("1"));
        assert!(!parse_bool("0"));
        assert!(!parse_bool("off"));
        assert!(!parse_bool("False"));
        assert!(!parse_bool(""));
        // unrecognised non-empty strings are truthy
        assert!(parse_bool("maybe"));
    }

    #[test]
    fn test_json_auto_detect() {
        assert_eq!(parse_json("3"), json!(3));
        assert_eq!(parse_json("true"), json!(true));
        assert_eq!(parse_json("[1,2]"), json!([1, 2]));
        assert_eq!(parse_json("hello"), json!("hello"));
        assert_eq!(parse_json(""), json!(""));
    }

    #[test]
    fn test_integer_cast() {
        let cast = TypeCast::integer();
        assert_eq!(cast.cast("42").unwrap(), json!(42));
        assert_eq!(cast.cast(" -7 ").unwrap(), json!(-7));
        assert_eq!(
            cast.cast("abc").unwrap_err(),
            CastError::invalid("abc", "int")
        );
    }

    #[test]
    fn test_float_cast_rejects_nan() {
        let cast = TypeCast::float();
        assert_eq!(cast.cast("1.5").unwrap(), json!(1.5));
        assert!(cast.cast("NaN").is_err());
    }

    #[test]
    fn test_custom_getter() {
        let cast = TypeCast::new("upper", |raw| Ok(Value::String(raw.to_uppercase())));
        assert_eq!(cast.name(), "upper");
        assert_eq!(cast.cast("vk").unwrap(), json!("VK"));
    }
}
