//! The inbound invocation and the per-call view handed to extractors.

use std::fmt;
use std::sync::Arc;

use kodi_useful_core::{QueryParams, SettingsStore};

use crate::dispatcher::Dispatcher;
use crate::route::Route;
use crate::url::Navigator;

/// One invocation of the add-on: the ambient context, the settings store and
/// the parsed query string.
pub struct Request<A> {
    context: Arc<A>,
    settings: Arc<dyn SettingsStore>,
    query: QueryParams,
    base_url: Option<String>,
}

impl<A> Request<A> {
    /// Creates a request from an already parsed query.
    pub fn new(context: Arc<A>, settings: Arc<dyn SettingsStore>, query: QueryParams) -> Self {
        Self {
            context,
            settings,
            query,
            base_url: None,
        }
    }

    /// Creates a request from a full plugin URL or a bare query string.
    ///
    /// When `url` contains a `?`, the part before it becomes the base URL used
    /// for links generated during this call.
    pub fn parse(context: Arc<A>, settings: Arc<dyn SettingsStore>, url: &str) -> Self {
        let base_url = url
            .split_once('?')
            .map(|(base, _)| base)
            .filter(|base| !base.is_empty())
            .map(str::to_owned);
        Self {
            base_url,
            ..Self::new(context, settings, QueryParams::parse(url))
        }
    }

    /// Overrides the base URL for links generated during this call.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Returns the ambient context.
    pub fn context(&self) -> &A {
        &self.context
    }

    /// Returns a shared handle on the ambient context.
    pub fn context_arc(&self) -> Arc<A> {
        Arc::clone(&self.context)
    }

    /// Returns the settings store.
    pub fn settings(&self) -> &dyn SettingsStore {
        self.settings.as_ref()
    }

    /// Returns the parsed query string.
    pub fn query(&self) -> &QueryParams {
        &self.query
    }

    /// Returns the base URL of this invocation, if known.
    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }
}

impl<A> fmt::Debug for Request<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("query", &self.query)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

/// Everything an extractor can see while a route is being called.
pub struct RouteContext<'a, A> {
    request: &'a Request<A>,
    dispatcher: &'a Dispatcher<A>,
    route: &'a Route<A>,
}

impl<'a, A> RouteContext<'a, A> {
    pub(crate) fn new(
        request: &'a Request<A>,
        dispatcher: &'a Dispatcher<A>,
        route: &'a Route<A>,
    ) -> Self {
        Self {
            request,
            dispatcher,
            route,
        }
    }

    /// Returns the request being dispatched.
    pub fn request(&self) -> &'a Request<A> {
        self.request
    }

    /// Returns the dispatcher serving the request.
    pub fn dispatcher(&self) -> &'a Dispatcher<A> {
        self.dispatcher
    }

    /// Returns the name of the route being called.
    pub fn route_name(&self) -> &'a str {
        self.route.name()
    }

    /// Builds a navigator bound to the current request.
    pub fn navigator(&self) -> Navigator<A> {
        self.dispatcher.navigator(self.request)
    }
}
