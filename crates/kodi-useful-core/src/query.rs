//! The query-string codec.
//!
//! [`QueryParams`] parses the query portion of a plugin invocation URL into
//! an ordered multi-map and hands out typed values on demand. When a key
//! occurs several times, scalar lookups return the **last** occurrence and
//! list lookups return every occurrence in order.

use std::fmt;
use std::str::FromStr;

use serde_json::Value;
use tracing::trace;
use url::form_urlencoded;

use crate::cast::TypeCast;
use crate::error::QueryError;
use crate::value::{QueryValue, query_strings};

/// Parsed query string of a single invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    /// Keys in first-appearance order, each with its values in query order.
    params: Vec<(String, Vec<String>)>,
}

impl QueryParams {
    /// Creates an empty query.
    pub fn new() -> Self {
        Self { params: Vec::new() }
    }

    /// Parses a query string.
    ///
    /// Accepts a bare query (`a=1&b=2`), a `?`-prefixed one, or a complete
    /// invocation URL (`plugin://plugin.video.vk/?a=1`), in which case only the
    /// part after the first `?` is read. Blank values are kept.
    pub fn parse(input: &str) -> Self {
        let query = extract_query(input);
        let mut params = Self::new();
        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            params.append(key.into_owned(), value.into_owned());
        }
        trace!(keys = params.len(), "Parsed query string");
        params
    }

    fn append(&mut self, key: String, value: String) {
        match self.params.iter_mut().find(|(k, _)| *k == key) {
            Some((_, values)) => values.push(value),
            None => self.params.push((key, vec![value])),
        }
    }

    fn values(&self, name: &str) -> Option<&[String]> {
        self.params
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_slice())
    }

    /// Returns the number of distinct keys.
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Returns `true` if the query has no parameters.
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Returns `true` if `name` occurs at least once.
    pub fn contains(&self, name: &str) -> bool {
        self.values(name).is_some()
    }

    /// Iterates over the distinct keys in first-appearance order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.params.iter().map(|(k, _)| k.as_str())
    }

    /// Returns the last raw value of `name`.
    pub fn get_raw(&self, name: &str) -> Option<&str> {
        self.values(name)
            .and_then(|v| v.last())
            .map(String::as_str)
    }

    /// Returns every raw value of `name` (empty if absent).
    pub fn get_all(&self, name: &str) -> &[String] {
        self.values(name).unwrap_or(&[])
    }

    /// Reads one value.
    ///
    /// The last occurrence wins. The value goes through `type_cast`, or JSON
    /// auto-detection when no cast is given. An absent key yields `default`,
    /// or [`QueryError::MissingParameter`] when `required` is set.
    pub fn get(
        &self,
        name: &str,
        required: bool,
        default: Option<Value>,
        type_cast: Option<&TypeCast>,
    ) -> Result<Option<Value>, QueryError> {
        match self.values(name).and_then(|v| v.last()) {
            Some(raw) => cast_one(name, raw, type_cast).map(Some),
            None if required => Err(QueryError::missing(name)),
            None => Ok(default),
        }
    }

    /// Reads every value of `name`, in order, each through `type_cast`.
    ///
    /// An absent key yields `default` (or an empty list), or
    /// [`QueryError::MissingParameter`] when `required` is set.
    pub fn get_list(
        &self,
        name: &str,
        required: bool,
        default: Option<Vec<Value>>,
        type_cast: Option<&TypeCast>,
    ) -> Result<Vec<Value>, QueryError> {
        match self.values(name) {
            Some(values) => values
                .iter()
                .map(|raw| cast_one(name, raw, type_cast))
                .collect(),
            None if required => Err(QueryError::missing(name)),
            None => Ok(default.unwrap_or_default()),
        }
    }

    /// Reads a boolean.
    pub fn get_bool(&self, name: &str, default: Option<bool>) -> Result<Option<bool>, QueryError> {
        let value = self.get(name, false, None, Some(&TypeCast::boolean()))?;
        Ok(value.and_then(|v| v.as_bool()).or(default))
    }

    /// Reads a signed integer.
    pub fn get_int(&self, name: &str, default: Option<i64>) -> Result<Option<i64>, QueryError> {
        let value = self.get(name, false, None, Some(&TypeCast::integer()))?;
        Ok(value.and_then(|v| v.as_i64()).or(default))
    }

    /// Reads every value of `name` as a signed integer.
    pub fn get_int_list(&self, name: &str) -> Result<Vec<i64>, QueryError> {
        let values = self.get_list(name, false, None, Some(&TypeCast::integer()))?;
        Ok(values.iter().filter_map(Value::as_i64).collect())
    }

    /// Reads the last raw value as an owned string.
    pub fn get_string(&self, name: &str) -> Option<String> {
        self.get_raw(name).map(str::to_owned)
    }

    /// Replaces every value of `name`.
    ///
    /// Lists become repeated keys and `Null` removes the key. A key that is
    /// already present keeps its position.
    pub fn set(&mut self, name: &str, value: &Value) {
        let values = query_strings(value);
        if values.is_empty() {
            self.remove(name);
            return;
        }
        match self.params.iter_mut().find(|(k, _)| k == name) {
            Some((_, existing)) => *existing = values,
            None => self.params.push((name.to_owned(), values)),
        }
    }

    /// Removes `name` entirely.
    pub fn remove(&mut self, name: &str) {
        self.params.retain(|(k, _)| k != name);
    }

    /// Flattens into `(name, value-or-list)` pairs for URL reconstruction.
    pub fn to_dict(&self) -> Vec<(String, QueryValue)> {
        self.params
            .iter()
            .map(|(k, v)| {
                let value = match v.as_slice() {
                    [single] => QueryValue::Single(single.clone()),
                    _ => QueryValue::Multi(v.clone()),
                };
                (k.clone(), value)
            })
            .collect()
    }

    /// Serialises back into percent-encoded form with repeated keys.
    pub fn to_query_string(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (key, values) in &self.params {
            for value in values {
                serializer.append_pair(key, value);
            }
        }
        serializer.finish()
    }
}

impl FromStr for QueryParams {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl fmt::Display for QueryParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_query_string())
    }
}

impl<K, V> FromIterator<(K, V)> for QueryParams
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (k, v) in iter {
            params.append(k.into(), v.into());
        }
        params
    }
}

fn cast_one(name: &str, raw: &str, type_cast: Option<&TypeCast>) -> Result<Value, QueryError> {
    match type_cast {
        Some(cast) => cast.cast(raw).map_err(|source| QueryError::Cast {
            name: name.to_owned(),
            source,
        }),
        None => Ok(crate::cast::parse_json(raw)),
    }
}

/// Returns the query portion of `input`.
fn extract_query(input: &str) -> &str {
    let query = match input.split_once('?') {
        Some((_, query)) => query,
        // A URL without a query string carries no parameters.
        None if looks_like_url(input) => "",
        None => input,
    };
    query.split_once('#').map_or(query, |(q, _)| q)
}

fn looks_like_url(input: &str) -> bool {
    match input.find("://") {
        Some(pos) => !input[..pos].contains(['=', '&']),
        None => false,
    }
}
