//! Request dispatcher.
//!
//! The [`Dispatcher`] owns the route table and the error handlers. For every
//! invocation it:
//!
//! 1. Reads the route name from the route key of the query (`r` by default);
//!    an absent key selects the root route
//! 2. Binds each declared parameter from the query string, the settings store
//!    or the ambient context
//! 3. Calls the handler, and routes a failure to the error handler of the
//!    nearest matching error kind
//!
//! ```rust,ignore
//! let dispatcher = Dispatcher::new()
//!     .with_base_url("plugin://plugin.video.vk/")
//!     .root(index, [Param::context("addon")])?
//!     .route(list_friends, [
//!         Param::context("addon"),
//!         Param::query("offset").ty(ParamType::Int).default(0),
//!         Param::settings("per_page").ty(ParamType::Int).lookup("items_per_page"),
//!     ])?
//!     .error_handler(AUTH_FAILED, |err, dispatcher, request| { ... });
//!
//! dispatcher.dispatch(&Request::parse(addon, settings, &url))?;
//! ```

use std::fmt;
use std::sync::Arc;

use kodi_useful_core::{
    ErrorKind, HandlerError, HandlerResult, QueryParams, SettingKind, SettingsError,
    SettingsStore, Value,
};
use tracing::{Level, debug, error, span, trace, warn};

use crate::error::{DispatchError, RouterError, RouterResult};
use crate::error_handler::ErrorHandlers;
use crate::extractor::{Argument, Binding};
use crate::handler::Handler;
use crate::param::{ArgumentDescriptor, Param, ParamType, Scope};
use crate::request::{Request, RouteContext};
use crate::route::{ROOT, Route, RouteTable, Target};
use crate::url::{Navigator, UrlArgs, UrlBuilder};

/// Default query key carrying the route name.
pub const DEFAULT_ROUTE_KEY: &str = "r";

/// Default query key carried over into generated links.
pub const DEFAULT_CARRY_PARAM: &str = "content_type";

/// How a dispatch ended, when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The handler ran to completion.
    Handled { route: String },
    /// The handler failed and an error handler dealt with it.
    Recovered {
        route: String,
        kind: ErrorKind,
        handled_as: ErrorKind,
    },
    /// No route matched; nothing was called.
    RouteNotFound { route: String },
}

/// Routes plugin invocations to their handlers.
pub struct Dispatcher<A> {
    table: Arc<RouteTable<A>>,
    errors: ErrorHandlers<A>,
    route_key: Arc<str>,
    carry_param: Option<Arc<str>>,
    base_url: Arc<str>,
}

impl<A> Default for Dispatcher<A> {
    fn default() -> Self {
        Self {
            table: Arc::new(RouteTable::new()),
            errors: ErrorHandlers::new(),
            route_key: Arc::from(DEFAULT_ROUTE_KEY),
            carry_param: Some(Arc::from(DEFAULT_CARRY_PARAM)),
            base_url: Arc::from(""),
        }
    }
}

impl<A: 'static> Dispatcher<A> {
    /// Creates a dispatcher with no routes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the query key carrying the route name.
    pub fn with_route_key(mut self, key: impl Into<Arc<str>>) -> Self {
        self.route_key = key.into();
        self
    }

    /// Sets (or disables) the parameter carried into generated links.
    pub fn with_carry_param(mut self, key: Option<&str>) -> Self {
        self.carry_param = key.map(Arc::from);
        self
    }

    /// Sets the base URL of generated links, e.g. `plugin://plugin.video.vk/`.
    pub fn with_base_url(mut self, base_url: impl Into<Arc<str>>) -> Self {
        self.base_url = base_url.into();
        self
    }

    // ========================================================================
    // Registration
    // ========================================================================

    fn table_mut(&mut self) -> RouterResult<&mut RouteTable<A>> {
        Arc::get_mut(&mut self.table).ok_or(RouterError::RegistrySealed)
    }

    /// Adds a prepared route.
    ///
    /// Fails with [`RouterError::RegistrySealed`] while a [`UrlBuilder`] or
    /// [`Navigator`] obtained from this dispatcher is alive.
    pub fn register(&mut self, route: Route<A>) -> RouterResult<Arc<Route<A>>> {
        self.table_mut()?.register(route, false)
    }

    /// Adds a prepared route and makes it the root route.
    pub fn register_root(&mut self, route: Route<A>) -> RouterResult<Arc<Route<A>>> {
        self.table_mut()?.register(route, true)
    }

    /// Adds a route named after its handler.
    pub fn add_route<F, T>(
        &mut self,
        handler: F,
        params: impl IntoIterator<Item = Param>,
    ) -> RouterResult<Arc<Route<A>>>
    where
        F: Handler<A, T>,
        T: 'static,
    {
        self.register(Route::new(handler, params)?)
    }

    /// Adds a route named after its handler (builder pattern).
    pub fn route<F, T>(mut self, handler: F, params: impl IntoIterator<Item = Param>) -> RouterResult<Self>
    where
        F: Handler<A, T>,
        T: 'static,
    {
        self.add_route(handler, params)?;
        Ok(self)
    }

    /// Adds a route with an explicit name (builder pattern).
    pub fn route_named<F, T>(
        mut self,
        name: &str,
        handler: F,
        params: impl IntoIterator<Item = Param>,
    ) -> RouterResult<Self>
    where
        F: Handler<A, T>,
        T: 'static,
    {
        self.register(Route::named(name, handler, params)?)?;
        Ok(self)
    }

    /// Adds the root route (builder pattern).
    pub fn root<F, T>(mut self, handler: F, params: impl IntoIterator<Item = Param>) -> RouterResult<Self>
    where
        F: Handler<A, T>,
        T: 'static,
    {
        self.register_root(Route::new(handler, params)?)?;
        Ok(self)
    }

    /// Declares a custom error kind under `parent`.
    pub fn declare_error_kind(&mut self, kind: ErrorKind, parent: ErrorKind) -> RouterResult<()> {
        self.errors.declare(kind, parent)
    }

    /// Declares a custom error kind under `parent` (builder pattern).
    pub fn error_kind(mut self, kind: ErrorKind, parent: ErrorKind) -> RouterResult<Self> {
        self.declare_error_kind(kind, parent)?;
        Ok(self)
    }

    /// Registers the handler for errors of `kind` and its descendants.
    pub fn on_error<F>(&mut self, kind: ErrorKind, handler: F)
    where
        F: Fn(&HandlerError, &Dispatcher<A>, &Request<A>) -> HandlerResult + Send + Sync + 'static,
    {
        self.errors.register(kind, handler);
    }

    /// Registers an error handler (builder pattern).
    pub fn error_handler<F>(mut self, kind: ErrorKind, handler: F) -> Self
    where
        F: Fn(&HandlerError, &Dispatcher<A>, &Request<A>) -> HandlerResult + Send + Sync + 'static,
    {
        self.on_error(kind, handler);
        self
    }
}

impl<A> Dispatcher<A> {
    /// Returns the route table.
    pub fn routes(&self) -> &RouteTable<A> {
        &self.table
    }

    /// Returns the error handler registry.
    pub fn error_handlers(&self) -> &ErrorHandlers<A> {
        &self.errors
    }

    /// Returns the query key carrying the route name.
    pub fn route_key(&self) -> &str {
        &self.route_key
    }

    /// Returns the parameter carried into generated links.
    pub fn carry_param(&self) -> Option<&str> {
        self.carry_param.as_deref()
    }

    /// Returns the base URL of generated links.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Resolves a target to its route.
    pub fn find<'t>(&self, target: impl Into<Target<'t>>) -> RouterResult<&Arc<Route<A>>> {
        self.table.find(&target.into())
    }

    // ========================================================================
    // URL generation
    // ========================================================================

    /// Returns a URL builder sharing this dispatcher's routes.
    pub fn url_builder(&self) -> UrlBuilder<A> {
        UrlBuilder::new(
            Arc::clone(&self.table),
            Arc::clone(&self.route_key),
            Arc::clone(&self.base_url),
        )
    }

    /// Builds the URL invoking `target` with `args`.
    pub fn url_for<'t>(&self, target: impl Into<Target<'t>>, args: &UrlArgs) -> RouterResult<String> {
        self.url_builder().url_for(target, args)
    }

    /// Returns a navigator bound to `request`.
    ///
    /// The request's own base URL, when known, replaces the configured one.
    pub fn navigator(&self, request: &Request<A>) -> Navigator<A> {
        let urls = match request.base_url() {
            Some(base) => self.url_builder().with_base_url(base),
            None => self.url_builder(),
        };
        Navigator::new(urls, request.query().clone(), self.carry_param.clone())
    }

    // ========================================================================
    // Dispatch
    // ========================================================================

    /// Routes `request` to its handler.
    ///
    /// An unknown route is logged and reported as [`Outcome::RouteNotFound`].
    /// Binding and handler failures go to the nearest error handler; only an
    /// error no handler dealt with is returned as [`DispatchError`].
    pub fn dispatch(&self, request: &Request<A>) -> Result<Outcome, DispatchError> {
        let route_name = self.route_name(request.query());
        let Some(route) = self.table.get(route_name) else {
            error!(route = route_name, "Route not found");
            return Ok(Outcome::RouteNotFound {
                route: route_name.to_owned(),
            });
        };

        let span = span!(Level::DEBUG, "dispatch", route = %route.name());
        let _enter = span.enter();
        debug!("Dispatching request");

        let ctx = RouteContext::new(request, self, route);
        let result = self
            .bind(route, request)
            .and_then(|args| route.call(args, &ctx));

        match result {
            Ok(()) => Ok(Outcome::Handled {
                route: route.name().to_owned(),
            }),
            Err(err) => self.recover(route, err, request),
        }
    }

    fn route_name<'q>(&self, query: &'q QueryParams) -> &'q str {
        match query.get_all(&self.route_key) {
            [] => ROOT,
            [single] => single.as_str(),
            many => {
                warn!(
                    key = %self.route_key,
                    count = many.len(),
                    "Several route identifiers in the query string, using the root route"
                );
                ROOT
            }
        }
    }

    fn bind(&self, route: &Route<A>, request: &Request<A>) -> HandlerResult<Vec<Argument>> {
        route
            .arguments()
            .iter()
            .map(|descriptor| {
                let binding = if descriptor.is_context() {
                    Binding::Context
                } else {
                    match descriptor.scope() {
                        Scope::Query => Binding::Value(bind_query(descriptor, request.query())?),
                        Scope::Settings => {
                            Binding::Value(bind_setting(descriptor, request.settings())?)
                        }
                        Scope::NotSet => Binding::Unbound,
                    }
                };
                trace!(param = descriptor.name(), ?binding, "Bound argument");
                Ok(Argument::new(descriptor.name_arc(), binding))
            })
            .collect()
    }

    fn recover(
        &self,
        route: &Route<A>,
        err: HandlerError,
        request: &Request<A>,
    ) -> Result<Outcome, DispatchError> {
        let Some((handled_as, handler)) = self.errors.resolve(err.kind()) else {
            error!(error = %err, "Unhandled error in route");
            return Err(DispatchError::Unhandled {
                route: route.name().to_owned(),
                error: err,
            });
        };

        debug!(kind = %err.kind(), handled_as = %handled_as, "Calling error handler");
        match handler(&err, self, request) {
            Ok(()) => Ok(Outcome::Recovered {
                route: route.name().to_owned(),
                kind: err.kind(),
                handled_as,
            }),
            Err(failure) => {
                error!(error = %failure, original = %err, "Error handler failed");
                Err(DispatchError::Unhandled {
                    route: route.name().to_owned(),
                    error: failure,
                })
            }
        }
    }
}

fn bind_query(descriptor: &ArgumentDescriptor, query: &QueryParams) -> HandlerResult<Value> {
    let name = descriptor.lookup_name();
    let required = descriptor.required();

    if descriptor.is_sequence() {
        let default = match descriptor.default_value() {
            Value::Array(items) => Some(items.clone()),
            _ => None,
        };
        let cast = descriptor.type_cast().or(descriptor.element_cast());
        return query
            .get_list(name, required, default, cast)
            .map(Value::Array)
            .map_err(HandlerError::classified);
    }

    query
        .get(
            name,
            required,
            Some(descriptor.default_value().clone()),
            descriptor.type_cast(),
        )
        .map(Option::unwrap_or_default)
        .map_err(HandlerError::classified)
}

fn bind_setting(descriptor: &ArgumentDescriptor, settings: &dyn SettingsStore) -> HandlerResult<Value> {
    let key = descriptor.lookup_name();
    let kind = match descriptor.getter() {
        Some(_) => SettingKind::Str,
        None => descriptor
            .declared_type()
            .map(ParamType::setting_kind)
            .unwrap_or(SettingKind::Str),
    };

    let value = match settings.get_setting(key, kind) {
        Ok(value) => value,
        Err(SettingsError::NotFound { .. }) if !descriptor.required() => {
            return Ok(descriptor.default_value().clone());
        }
        Err(err) => return Err(HandlerError::classified(err)),
    };

    let cast = descriptor
        .getter()
        .cloned()
        .or_else(|| descriptor.declared_type().and_then(ParamType::setting_cast));
    match (cast, value) {
        (Some(cast), Value::String(raw)) => cast.cast(&raw).map_err(|source| {
            HandlerError::classified(SettingsError::Cast {
                key: key.to_owned(),
                source,
            })
        }),
        (_, value) => Ok(value),
    }
}

impl<A> fmt::Debug for Dispatcher<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("routes", &self.table)
            .field("errors", &self.errors)
            .field("route_key", &self.route_key)
            .field("carry_param", &self.carry_param)
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kodi_useful_core::{MemorySettings, QueryError, TypeCast, WithKind};
    use parking_lot::Mutex;
    use serde_json::json;
    use tracing_test::traced_test;

    use crate::extractor::Json;

    const BASE: &str = "plugin://plugin.video.vk/";
    const API: ErrorKind = ErrorKind::new("api");
    const AUTH_FAILED: ErrorKind = ErrorKind::new("api.auth_failed");

    #[derive(Default)]
    struct Addon {
        calls: Mutex<Vec<String>>,
        links: Mutex<Vec<String>>,
    }

    impl Addon {
        fn record(&self, call: impl Into<String>) {
            self.calls.lock().push(call.into());
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().clone()
        }
    }

    #[derive(Debug, thiserror::Error)]
    #[error("access token expired")]
    struct TokenExpired;

    fn index(addon: Arc<Addon>) {
        addon.record("index");
    }

    fn list_friends(addon: Arc<Addon>, offset: i64, per_page: i64, nav: Navigator<Addon>) -> HandlerResult {
        addon.record(format!("friends offset={offset} per_page={per_page}"));
        let next = nav.url_from_current(&UrlArgs::new().arg("offset", offset + per_page));
        addon.links.lock().push(next);
        Ok(())
    }

    fn list_albums(addon: Arc<Addon>, owner_id: Option<i64>, ids: Vec<i64>) {
        addon.record(format!("albums owner={owner_id:?} ids={ids:?}"));
    }

    fn search(addon: Arc<Addon>, q: Value, Json(filter): Json<Vec<String>>) {
        addon.record(format!("search q={q} filter={filter:?}"));
    }

    fn expired(_addon: Arc<Addon>) -> HandlerResult {
        let res: Result<(), TokenExpired> = Err(TokenExpired);
        res.with_kind(AUTH_FAILED)
    }

    fn untyped_failure(_addon: Arc<Addon>) -> Result<(), TokenExpired> {
        Err(TokenExpired)
    }

    fn dispatcher() -> Dispatcher<Addon> {
        Dispatcher::new()
            .with_base_url(BASE)
            .root(index, [Param::context("addon")])
            .unwrap()
            .route_named(
                "friends",
                list_friends,
                [
                    Param::context("addon"),
                    Param::query("offset").ty(ParamType::Int).default(0),
                    Param::settings("per_page")
                        .ty(ParamType::Int)
                        .lookup("items_per_page"),
                    Param::context("nav"),
                ],
            )
            .unwrap()
            .route_named(
                "albums",
                list_albums,
                [
                    Param::context("addon"),
                    Param::query("owner_id")
                        .ty(ParamType::optional(ParamType::Int))
                        .optional(),
                    Param::query("ids")
                        .ty(ParamType::sequence(ParamType::Int))
                        .default(json!([])),
                ],
            )
            .unwrap()
            .route_named(
                "search",
                search,
                [
                    Param::context("addon"),
                    Param::query("q"),
                    Param::query("filter").ty(ParamType::Json).default(json!([])),
                ],
            )
            .unwrap()
            .route_named("expired", expired, [Param::context("addon")])
            .unwrap()
            .route_named("untyped", untyped_failure, [Param::context("addon")])
            .unwrap()
            .error_kind(API, ErrorKind::ANY)
            .unwrap()
            .error_kind(AUTH_FAILED, API)
            .unwrap()
    }

    fn request(addon: &Arc<Addon>, url: &str) -> Request<Addon> {
        let settings = MemorySettings::new().with("items_per_page", "25");
        Request::parse(Arc::clone(addon), Arc::new(settings), url)
    }

    #[test]
    fn test_binds_query_settings_and_context() {
        let addon = Arc::new(Addon::default());
        let outcome = dispatcher()
            .dispatch(&request(&addon, "plugin://plugin.video.vk/?r=friends&offset=50"))
            .unwrap();

        assert_eq!(
            outcome,
            Outcome::Handled {
                route: "friends".into()
            }
        );
        assert_eq!(addon.calls(), vec!["friends offset=50 per_page=25"]);
        assert_eq!(
            addon.links.lock().as_slice(),
            ["plugin://plugin.video.vk/?r=friends&offset=75"]
        );
    }

    #[test]
    fn test_defaults_apply_when_absent() {
        let addon = Arc::new(Addon::default());
        let dispatcher = dispatcher();
        dispatcher
            .dispatch(&request(&addon, "?r=friends"))
            .unwrap();
        dispatcher.dispatch(&request(&addon, "?r=albums")).unwrap();

        assert_eq!(
            addon.calls(),
            vec!["friends offset=0 per_page=25", "albums owner=None ids=[]"]
        );
    }

    #[test]
    fn test_sequence_and_optional_values() {
        let addon = Arc::new(Addon::default());
        dispatcher()
            .dispatch(&request(&addon, "?r=albums&owner_id=7&ids=1&ids=2&ids=3"))
            .unwrap();
        assert_eq!(addon.calls(), vec!["albums owner=Some(7) ids=[1, 2, 3]"]);
    }

    #[test]
    fn test_untyped_values_are_json_decoded() {
        let addon = Arc::new(Addon::default());
        let dispatcher = dispatcher();
        dispatcher
            .dispatch(&request(&addon, r#"?r=search&q=25&filter=["a","b"]"#))
            .unwrap();
        dispatcher
            .dispatch(&request(&addon, "?r=search&q=cats"))
            .unwrap();
        assert_eq!(
            addon.calls(),
            vec![
                r#"search q=25 filter=["a", "b"]"#,
                r#"search q="cats" filter=[]"#
            ]
        );
    }

    #[test]
    fn test_absent_route_key_calls_root() {
        let addon = Arc::new(Addon::default());
        let outcome = dispatcher().dispatch(&request(&addon, BASE)).unwrap();
        assert!(matches!(outcome, Outcome::Handled { route } if route.ends_with("index")));
        assert_eq!(addon.calls(), vec!["index"]);
    }

    #[test]
    #[traced_test]
    fn test_several_route_keys_fall_back_to_root() {
        let addon = Arc::new(Addon::default());
        dispatcher()
            .dispatch(&request(&addon, "?r=friends&r=albums"))
            .unwrap();
        assert_eq!(addon.calls(), vec!["index"]);
        assert!(logs_contain("Several route identifiers"));
    }

    #[test]
    #[traced_test]
    fn test_unknown_route_is_logged_not_raised() {
        let addon = Arc::new(Addon::default());
        let outcome = dispatcher()
            .dispatch(&request(&addon, "?r=bogus"))
            .unwrap();
        assert_eq!(
            outcome,
            Outcome::RouteNotFound {
                route: "bogus".into()
            }
        );
        assert!(addon.calls().is_empty());
        assert!(logs_contain("Route not found"));
    }

    #[test]
    fn test_missing_required_parameter_reaches_router_handler() {
        let addon = Arc::new(Addon::default());
        let seen = Arc::new(Mutex::new(None));
        let seen_in_handler = Arc::clone(&seen);

        let mut dispatcher = Dispatcher::new()
            .route_named(
                "friends",
                |_addon: Arc<Addon>, _user_id: i64| {},
                [Param::context("addon"), Param::query("user_id").ty(ParamType::Int)],
            )
            .unwrap();
        dispatcher.on_error(ErrorKind::ROUTER, move |err, _, _| {
            *seen_in_handler.lock() = Some((err.kind(), err.downcast_ref::<QueryError>().is_some()));
            Ok(())
        });

        let outcome = dispatcher
            .dispatch(&request(&addon, "?r=friends"))
            .unwrap();
        assert_eq!(
            outcome,
            Outcome::Recovered {
                route: "friends".into(),
                kind: ErrorKind::MISSING_PARAMETER,
                handled_as: ErrorKind::ROUTER,
            }
        );
        assert_eq!(*seen.lock(), Some((ErrorKind::MISSING_PARAMETER, true)));
    }

    #[test]
    fn test_cast_failure_is_classified() {
        let addon = Arc::new(Addon::default());
        let err = dispatcher()
            .dispatch(&request(&addon, "?r=friends&offset=ten"))
            .unwrap_err();
        assert_eq!(err.handler_error().kind(), ErrorKind::CAST);
    }

    #[test]
    fn test_nearest_error_handler_wins() {
        let addon = Arc::new(Addon::default());
        let dispatcher = dispatcher()
            .error_handler(API, |_, _, request| {
                request.context().record("api handler");
                Ok(())
            })
            .error_handler(AUTH_FAILED, |err, _, request| {
                request.context().record(format!("auth handler: {}", err.message()));
                Ok(())
            });

        let outcome = dispatcher
            .dispatch(&request(&addon, "?r=expired"))
            .unwrap();
        assert_eq!(
            outcome,
            Outcome::Recovered {
                route: "expired".into(),
                kind: AUTH_FAILED,
                handled_as: AUTH_FAILED,
            }
        );
        assert_eq!(addon.calls(), vec!["auth handler: access token expired"]);
    }

    #[test]
    #[traced_test]
    fn test_unhandled_error_propagates() {
        let addon = Arc::new(Addon::default());
        let dispatcher = dispatcher().error_handler(AUTH_FAILED, |_, _, _| Ok(()));

        // `?` conversion gives the root kind, which has no handler here
        let err = dispatcher
            .dispatch(&request(&addon, "?r=untyped"))
            .unwrap_err();
        let DispatchError::Unhandled { route, error } = err;
        assert_eq!(route, "untyped");
        assert_eq!(error.kind(), ErrorKind::ANY);
        assert!(error.downcast_ref::<TokenExpired>().is_some());
        assert!(logs_contain("Unhandled error in route"));
    }

    #[test]
    fn test_failing_error_handler_propagates() {
        let addon = Arc::new(Addon::default());
        let dispatcher = dispatcher().error_handler(ErrorKind::ANY, |err, _, _| {
            Err(HandlerError::new(API, format!("while handling {err}")))
        });
        let err = dispatcher
            .dispatch(&request(&addon, "?r=untyped"))
            .unwrap_err();
        assert_eq!(err.handler_error().kind(), API);
    }

    #[test]
    fn test_error_handler_can_redispatch() {
        let addon = Arc::new(Addon::default());
        let dispatcher = dispatcher().error_handler(AUTH_FAILED, |_, dispatcher, request| {
            let home = Request::new(
                request.context_arc(),
                Arc::new(MemorySettings::new()),
                QueryParams::new(),
            );
            dispatcher.dispatch(&home).map(|_| ()).map_err(|e| {
                HandlerError::new(ErrorKind::ANY, e.to_string())
            })
        });
        dispatcher
            .dispatch(&request(&addon, "?r=expired"))
            .unwrap();
        assert_eq!(addon.calls(), vec!["index"]);
    }

    #[test]
    fn test_settings_getter_and_missing_setting() {
        let addon = Arc::new(Addon::default());
        let quality = TypeCast::new("quality", |raw| {
            Ok(Value::from(raw.trim_end_matches('p').parse::<i64>().unwrap_or(360)))
        });
        let dispatcher = Dispatcher::new()
            .route_named(
                "play",
                |addon: Arc<Addon>, quality: i64, hide: bool| {
                    addon.record(format!("play {quality} {hide}"));
                },
                [
                    Param::context("addon"),
                    Param::settings("quality").getter(quality),
                    Param::settings("hide_deactivated").ty(ParamType::Bool).default(false),
                ],
            )
            .unwrap()
            .route_named(
                "strict",
                |_token: String| {},
                [Param::settings("token")],
            )
            .unwrap();

        let settings = MemorySettings::new().with("quality", "720p");
        let req = Request::parse(Arc::clone(&addon), Arc::new(settings), "?r=play");
        dispatcher.dispatch(&req).unwrap();
        assert_eq!(addon.calls(), vec!["play 720 false"]);

        let req = Request::parse(Arc::clone(&addon), Arc::new(MemorySettings::new()), "?r=strict");
        let err = dispatcher.dispatch(&req).unwrap_err();
        assert_eq!(err.handler_error().kind(), ErrorKind::SETTINGS);
    }

    #[test]
    fn test_unset_scope_uses_rust_default() {
        let addon = Arc::new(Addon::default());
        let dispatcher = Dispatcher::new()
            .route_named(
                "page",
                |addon: Arc<Addon>, limit: Option<i64>| {
                    addon.record(format!("limit={}", limit.unwrap_or(10)));
                },
                [Param::context("addon"), Param::new("limit")],
            )
            .unwrap();
        dispatcher
            .dispatch(&request(&addon, "?r=page&limit=3"))
            .unwrap();
        assert_eq!(addon.calls(), vec!["limit=10"]);
    }

    #[test]
    fn test_registration_is_sealed_while_urls_are_shared() {
        let mut dispatcher = dispatcher();
        let urls = dispatcher.url_builder();
        let err = dispatcher.add_route(index, [Param::context("addon")]).unwrap_err();
        assert_eq!(err, RouterError::RegistrySealed);
        drop(urls);
        // same handler, same derived name: idempotent once unshared
        assert!(dispatcher.add_route(index, [Param::context("addon")]).is_ok());
    }

    #[test]
    fn test_url_for_handler_and_name() {
        let dispatcher = dispatcher();
        let url = dispatcher
            .url_for(Target::handler(&list_albums), &UrlArgs::new().arg("ids", json!([4, 5])))
            .unwrap();
        assert_eq!(url, "plugin://plugin.video.vk/?r=albums&ids=4&ids=5");

        let root = dispatcher.find(ROOT).unwrap();
        assert!(root.name().ends_with("index"));
    }

    fn browse(addon: Arc<Addon>, owner: i64, hd: bool, title: String, tags: Vec<String>) {
        let bound = json!({ "owner_id": owner, "hd": hd, "title": title, "tags": tags });
        addon.record(bound.to_string());
    }

    #[test]
    fn test_generated_url_dispatches_to_same_values() {
        let addon = Arc::new(Addon::default());
        let dispatcher = Dispatcher::new()
            .with_base_url(BASE)
            .route_named(
                "browse",
                browse,
                [
                    Param::context("addon"),
                    Param::query("owner").ty(ParamType::Int).lookup("owner_id"),
                    Param::query("hd").ty(ParamType::Bool),
                    Param::query("title").ty(ParamType::Str),
                    Param::query("tags").ty(ParamType::sequence(ParamType::Str)),
                ],
            )
            .unwrap();

        let args = UrlArgs::new()
            .arg("owner_id", -42)
            .arg("hd", true)
            .arg("title", "25 & more?")
            .arg("tags", json!(["rock", "live=1"]));
        let url = dispatcher.url_for(Target::handler(&browse), &args).unwrap();
        dispatcher.dispatch(&request(&addon, &url)).unwrap();

        let expected: serde_json::Map<String, Value> = args
            .iter()
            .map(|(name, value)| (name.to_owned(), value.clone()))
            .collect();
        let calls = addon.calls();
        assert_eq!(calls.len(), 1);
        let bound: Value = serde_json::from_str(&calls[0]).unwrap();
        assert_eq!(bound, Value::Object(expected));

        // a required list with no elements cannot be encoded
        let err = dispatcher
            .url_for(Target::handler(&browse), &args.clone().arg("tags", json!([])))
            .unwrap_err();
        assert_eq!(
            err,
            RouterError::MissingRouteParameter {
                route: "browse".into(),
                param: "tags".into(),
            }
        );
    }

    #[test]
    fn test_structured_settings_are_json_decoded() {
        let addon = Arc::new(Addon::default());
        let dispatcher = Dispatcher::new()
            .route_named(
                "filters",
                |addon: Arc<Addon>, filters: Value, Json(ids): Json<Vec<i64>>| {
                    addon.record(format!("filters={filters} ids={ids:?}"));
                },
                [
                    Param::context("addon"),
                    Param::settings("filters").ty(ParamType::Mapping),
                    Param::settings("ids").ty(ParamType::Json).default(json!([])),
                ],
            )
            .unwrap();

        let settings = MemorySettings::new()
            .with("filters", r#"{"genre":"rock"}"#)
            .with("ids", "[1,2]");
        let req = Request::parse(Arc::clone(&addon), Arc::new(settings), "?r=filters");
        dispatcher.dispatch(&req).unwrap();

        let settings = MemorySettings::new().with("filters", "{}");
        let req = Request::parse(Arc::clone(&addon), Arc::new(settings), "?r=filters");
        dispatcher.dispatch(&req).unwrap();

        assert_eq!(
            addon.calls(),
            vec![r#"filters={"genre":"rock"} ids=[1, 2]"#, "filters={} ids=[]"]
        );
    }
}
