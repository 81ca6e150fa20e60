//! Plugin URL generation.
//!
//! A generated URL is `base?<route_key>=<route name>&<args...>`: the route key
//! always comes first, the remaining pairs keep insertion order, lists become
//! repeated keys and `Null` values are left out.

use std::fmt;
use std::sync::Arc;

use kodi_useful_core::{QueryParams, Value, query_strings};
use tracing::debug;
use url::form_urlencoded;

use crate::error::{RouterError, RouterResult};
use crate::param::Scope;
use crate::route::{RouteTable, Target};

/// Ordered arguments for a generated URL.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UrlArgs {
    args: Vec<(String, Value)>,
}

impl UrlArgs {
    /// Creates an empty argument list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an argument (builder pattern).
    pub fn arg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Sets an argument; an existing one keeps its position.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        match self.args.iter_mut().find(|(k, _)| *k == name) {
            Some((_, existing)) => *existing = value,
            None => self.args.push((name, value)),
        }
    }

    /// Returns the value of `name`.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.args.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    /// Returns `true` if `name` puts at least one pair in the URL: `Null`, an
    /// empty list and a list of nulls do not.
    pub fn has_value(&self, name: &str) -> bool {
        self.get(name).is_some_and(|v| !query_strings(v).is_empty())
    }

    /// Iterates over the arguments in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.args.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of arguments.
    pub fn len(&self) -> usize {
        self.args.len()
    }

    /// Returns `true` if there are no arguments.
    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for UrlArgs
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut args = Self::new();
        for (k, v) in iter {
            args.insert(k, v);
        }
        args
    }
}

/// Generates URLs for the routes of a table.
pub struct UrlBuilder<A> {
    table: Arc<RouteTable<A>>,
    route_key: Arc<str>,
    base_url: Arc<str>,
}

impl<A> Clone for UrlBuilder<A> {
    fn clone(&self) -> Self {
        Self {
            table: Arc::clone(&self.table),
            route_key: Arc::clone(&self.route_key),
            base_url: Arc::clone(&self.base_url),
        }
    }
}

impl<A> UrlBuilder<A> {
    pub(crate) fn new(table: Arc<RouteTable<A>>, route_key: Arc<str>, base_url: Arc<str>) -> Self {
        Self {
            table,
            route_key,
            base_url,
        }
    }

    /// Replaces the base URL.
    pub fn with_base_url(mut self, base_url: impl Into<Arc<str>>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Returns the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the query key carrying the route name.
    pub fn route_key(&self) -> &str {
        &self.route_key
    }

    /// Builds the URL invoking `target` with `args`.
    ///
    /// Every required query parameter of the route must have a value in
    /// `args` (by lookup name) that survives encoding; otherwise nothing is
    /// built.
    pub fn url_for<'t>(&self, target: impl Into<Target<'t>>, args: &UrlArgs) -> RouterResult<String> {
        let route = self.table.find(&target.into())?;

        if let Some(missing) = route
            .arguments()
            .iter()
            .filter(|d| d.scope() == Scope::Query && d.required())
            .find(|d| !args.has_value(d.lookup_name()))
        {
            return Err(RouterError::MissingRouteParameter {
                route: route.name().to_owned(),
                param: missing.lookup_name().to_owned(),
            });
        }

        let mut serializer = form_urlencoded::Serializer::new(String::new());
        serializer.append_pair(&self.route_key, route.name());
        for (name, value) in args.iter() {
            if name == &*self.route_key {
                debug!(key = name, "Ignoring URL argument that shadows the route key");
                continue;
            }
            for raw in query_strings(value) {
                serializer.append_pair(name, &raw);
            }
        }
        Ok(format!("{}?{}", self.base_url, serializer.finish()))
    }
}

impl<A> fmt::Debug for UrlBuilder<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UrlBuilder")
            .field("route_key", &self.route_key)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

/// URL generation bound to the request being handled.
///
/// Links built through a navigator keep the carry parameter (by default
/// `content_type`, which Kodi passes to tell video and picture sources
/// apart) unless the caller sets it explicitly.
pub struct Navigator<A> {
    urls: UrlBuilder<A>,
    current: QueryParams,
    carry_param: Option<Arc<str>>,
}

impl<A> Navigator<A> {
    pub(crate) fn new(urls: UrlBuilder<A>, current: QueryParams, carry_param: Option<Arc<str>>) -> Self {
        Self {
            urls,
            current,
            carry_param,
        }
    }

    /// Returns the query of the current request.
    pub fn current(&self) -> &QueryParams {
        &self.current
    }

    /// Returns the underlying URL builder.
    pub fn urls(&self) -> &UrlBuilder<A> {
        &self.urls
    }

    /// Builds the URL invoking `target`, carrying the carry parameter over.
    pub fn url_for<'t>(&self, target: impl Into<Target<'t>>, args: &UrlArgs) -> RouterResult<String> {
        let carried = self.carried_value().filter(|(key, _)| args.get(key).is_none());
        match carried {
            Some((key, value)) => {
                let mut args = args.clone();
                args.insert(key, value);
                self.urls.url_for(target, &args)
            }
            None => self.urls.url_for(target, args),
        }
    }

    /// Rebuilds the current URL with some values replaced.
    ///
    /// Overridden keys keep their position; `Null` removes a key.
    pub fn url_from_current(&self, overrides: &UrlArgs) -> String {
        let mut query = self.current.clone();
        for (name, value) in overrides.iter() {
            query.set(name, value);
        }
        format!("{}?{}", self.urls.base_url(), query.to_query_string())
    }

    fn carried_value(&self) -> Option<(&str, Value)> {
        let key = self.carry_param.as_deref()?;
        let values = self.current.get_all(key);
        let value = match values {
            [] => return None,
            [single] => Value::String(single.clone()),
            many => many.iter().cloned().map(Value::String).collect(),
        };
        Some((key, value))
    }
}

impl<A> fmt::Debug for Navigator<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Navigator")
            .field("urls", &self.urls)
            .field("current", &self.current)
            .field("carry_param", &self.carry_param)
            .finish()
    }
}
