//! Plugin invocations.
//!
//! Kodi starts a plugin with `argv = [base_url, handle, "?query", ...]`,
//! e.g. `["plugin://plugin.video.vk/", "7", "?r=albums&owner_id=1", "resume:false"]`.
//! Trailing arguments are ignored.

use std::sync::Arc;

use kodi_useful_core::{QueryParams, SettingsStore};
use kodi_useful_router::Request;

use crate::error::{RuntimeError, RuntimeResult};

/// One plugin invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    base_url: String,
    handle: Option<i32>,
    query: String,
}

impl Invocation {
    /// Parses a full plugin URL; the invocation has no handle.
    pub fn from_url(url: &str) -> Self {
        let (base_url, query) = match url.split_once('?') {
            Some((base, query)) => (base, query),
            None => (url, ""),
        };
        Self {
            base_url: base_url.to_owned(),
            handle: None,
            query: query.to_owned(),
        }
    }

    /// Parses Kodi's plugin arguments, without the program name.
    pub fn from_args<I, S>(args: I) -> RuntimeResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut args = args.into_iter();

        let base_url = args
            .next()
            .map(|s| s.as_ref().to_owned())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| RuntimeError::InvalidInvocation("missing base URL".into()))?;
        if base_url.contains('?') {
            return Err(RuntimeError::InvalidInvocation(format!(
                "base URL carries a query: {base_url}"
            )));
        }

        let handle = match args.next() {
            Some(raw) => {
                let raw = raw.as_ref().trim();
                Some(
                    raw.parse::<i32>()
                        .map_err(|_| RuntimeError::InvalidHandle(raw.to_owned()))?,
                )
            }
            None => None,
        };

        let query = args
            .next()
            .map(|s| s.as_ref().trim_start_matches('?').to_owned())
            .unwrap_or_default();

        Ok(Self {
            base_url,
            handle,
            query,
        })
    }

    /// Parses the arguments of the current process.
    pub fn from_env() -> RuntimeResult<Self> {
        Self::from_args(std::env::args().skip(1))
    }

    /// Returns the base URL, e.g. `plugin://plugin.video.vk/`.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the plugin handle, if Kodi passed one.
    pub fn handle(&self) -> Option<i32> {
        self.handle
    }

    /// Returns the query string without the leading `?`.
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Returns the invocation as a URL.
    pub fn url(&self) -> String {
        if self.query.is_empty() {
            self.base_url.clone()
        } else {
            format!("{}?{}", self.base_url, self.query)
        }
    }

    /// Builds the request handed to the dispatcher.
    pub fn to_request<A>(&self, context: Arc<A>, settings: Arc<dyn SettingsStore>) -> Request<A> {
        let query = QueryParams::parse(&format!("?{}", self.query));
        let request = Request::new(context, settings, query);
        if self.base_url.is_empty() {
            request
        } else {
            request.with_base_url(self.base_url.clone())
        }
    }
}
