//! Add-on runtime.
//!
//! [`AddonRuntime`] ties a configured [`Dispatcher`] to the add-on context
//! and its settings store, and runs one plugin invocation per process.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use kodi_useful_runtime::{Invocation, RuntimeBuilder};
//!
//! let runtime = RuntimeBuilder::new()
//!     .config_file("resources/kodi-useful.toml")
//!     .build(dispatcher, addon)?;
//!
//! runtime.run(&Invocation::from_env()?)?;
//! ```

use std::path::Path;
use std::sync::Arc;

use kodi_useful_core::{MemorySettings, SettingsStore};
use kodi_useful_router::{Dispatcher, Outcome};
use tracing::{Level, debug, info, span, warn};

use crate::config::{AddonConfig, ConfigLoader, validate_config};
use crate::error::RuntimeResult;
use crate::invocation::Invocation;
use crate::logging;

/// A configured add-on, ready to serve invocations.
pub struct AddonRuntime<A> {
    config: AddonConfig,
    dispatcher: Arc<Dispatcher<A>>,
    context: Arc<A>,
    settings: Arc<dyn SettingsStore>,
}

impl<A: 'static> AddonRuntime<A> {
    /// Creates a runtime from an already loaded configuration.
    ///
    /// This initializes logging from the configuration.
    pub fn from_config(
        config: &AddonConfig,
        dispatcher: Dispatcher<A>,
        context: impl Into<Arc<A>>,
    ) -> RuntimeResult<Self> {
        validate_config(config)?;
        logging::init_from_config(&config.logging, &config.addon.id);
        Ok(Self::assemble(config.clone(), dispatcher, context.into()))
    }

    fn assemble(config: AddonConfig, dispatcher: Dispatcher<A>, context: Arc<A>) -> Self {
        let mut dispatcher = dispatcher
            .with_route_key(config.router.route_param.as_str())
            .with_carry_param(config.router.carry_param());
        if let Some(base_url) = config.addon.resolved_base_url() {
            dispatcher = dispatcher.with_base_url(base_url);
        }

        let settings: MemorySettings = config.settings_strings().collect();

        info!(
            addon = %config.addon.id,
            routes = dispatcher.routes().len(),
            route_key = %config.router.route_param,
            log_level = %config.logging.level,
            "Add-on runtime initialized"
        );

        Self {
            config,
            dispatcher: Arc::new(dispatcher),
            context,
            settings: Arc::new(settings),
        }
    }

    /// Replaces the settings store seeded from the configuration.
    pub fn with_settings(mut self, settings: impl SettingsStore + 'static) -> Self {
        self.settings = Arc::new(settings);
        self
    }
}

impl<A> AddonRuntime<A> {
    /// Returns the configuration.
    pub fn config(&self) -> &AddonConfig {
        &self.config
    }

    /// Returns the dispatcher.
    pub fn dispatcher(&self) -> &Arc<Dispatcher<A>> {
        &self.dispatcher
    }

    /// Returns the add-on context.
    pub fn context(&self) -> &Arc<A> {
        &self.context
    }

    /// Returns the settings store.
    pub fn settings(&self) -> &Arc<dyn SettingsStore> {
        &self.settings
    }

    /// Dispatches one invocation.
    pub fn run(&self, invocation: &Invocation) -> RuntimeResult<Outcome> {
        let span = span!(
            Level::INFO,
            "addon",
            id = %self.config.addon.id,
            handle = ?invocation.handle()
        );
        let _enter = span.enter();
        debug!(url = %invocation.url(), "Handling invocation");

        let request = invocation.to_request(Arc::clone(&self.context), Arc::clone(&self.settings));
        let outcome = self.dispatcher.dispatch(&request)?;

        match &outcome {
            Outcome::Handled { route } => debug!(route = %route, "Invocation handled"),
            Outcome::Recovered {
                route,
                kind,
                handled_as,
            } => warn!(
                route = %route,
                kind = %kind,
                handled_as = %handled_as,
                "Invocation failed and was recovered"
            ),
            Outcome::RouteNotFound { route } => debug!(route = %route, "No route for invocation"),
        }

        Ok(outcome)
    }

    /// Parses Kodi's plugin arguments and dispatches them.
    pub fn run_args<I, S>(&self, args: I) -> RuntimeResult<Outcome>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.run(&Invocation::from_args(args)?)
    }

    /// Dispatches the invocation described by the process arguments.
    pub fn run_env(&self) -> RuntimeResult<Outcome> {
        self.run(&Invocation::from_env()?)
    }
}

impl<A> std::fmt::Debug for AddonRuntime<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AddonRuntime")
            .field("config", &self.config)
            .field("dispatcher", &self.dispatcher)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for [`AddonRuntime`].
pub struct RuntimeBuilder {
    config_loader: ConfigLoader,
    init_logging: bool,
}

impl RuntimeBuilder {
    /// Creates a new runtime builder searching the current directory.
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new().with_current_dir(),
            init_logging: true,
        }
    }

    /// Sets a specific configuration file to load.
    pub fn config_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    /// Sets the configuration profile (e.g. "development", "production").
    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    /// Adds a search path for configuration files.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    /// Enables loading environment variables (enabled by default).
    pub fn with_env(mut self) -> Self {
        self.config_loader = self.config_loader.with_env();
        self
    }

    /// Disables loading environment variables.
    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    /// Layers configuration just above the built-in defaults, below files
    /// and environment variables.
    pub fn defaults(mut self, config: AddonConfig) -> Self {
        self.config_loader = self.config_loader.defaults(config);
        self
    }

    /// Merges configuration over every other source.
    pub fn merge(mut self, config: AddonConfig) -> Self {
        self.config_loader = self.config_loader.merge(config);
        self
    }

    /// Leaves logging setup to the caller.
    pub fn without_logging(mut self) -> Self {
        self.init_logging = false;
        self
    }

    /// Loads the configuration and builds the runtime.
    pub fn build<A: 'static>(
        self,
        dispatcher: Dispatcher<A>,
        context: impl Into<Arc<A>>,
    ) -> RuntimeResult<AddonRuntime<A>> {
        let config = self.config_loader.load()?;
        if self.init_logging {
            logging::init_from_config(&config.logging, &config.addon.id);
        }
        Ok(AddonRuntime::assemble(config, dispatcher, context.into()))
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigError;
    use crate::error::RuntimeError;
    use kodi_useful_core::{ErrorKind, HandlerError, HandlerResult, WithKind};
    use kodi_useful_router::{Navigator, Param, ParamType, UrlArgs};
    use parking_lot::Mutex;
    use serde_json::json;
    use tracing_test::traced_test;

    const AUTH_FAILED: ErrorKind = ErrorKind::new("api.auth_failed");

    #[derive(Default)]
    struct Addon {
        calls: Mutex<Vec<String>>,
    }

    impl Addon {
        fn record(&self, call: impl Into<String>) {
            self.calls.lock().push(call.into());
        }
    }

    #[derive(Debug, thiserror::Error)]
    #[error("user is banned")]
    struct Banned;

    fn index(addon: Arc<Addon>) {
        addon.record("index");
    }

    fn list_friends(addon: Arc<Addon>, offset: i64, per_page: i64, nav: Navigator<Addon>) {
        let next = nav.url_from_current(&UrlArgs::new().arg("offset", offset + per_page));
        addon.record(format!("friends {offset} {per_page} {next}"));
    }

    fn banned(_addon: Arc<Addon>) -> HandlerResult {
        Err(Banned).with_kind(AUTH_FAILED)
    }

    fn failing(_addon: Arc<Addon>) -> Result<(), Banned> {
        Err(Banned)
    }

    fn dispatcher() -> Dispatcher<Addon> {
        Dispatcher::new()
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
            .route_named("banned", banned, [Param::context("addon")])
            .unwrap()
            .route_named("failing", failing, [Param::context("addon")])
            .unwrap()
            .error_handler(AUTH_FAILED, |_err: &HandlerError, _d: &Dispatcher<Addon>, request| {
                request.context().record("auth handler");
                Ok(())
            })
    }

    fn config() -> AddonConfig {
        let mut config = AddonConfig::default();
        config.addon.id = "plugin.video.vk".into();
        config.router.route_param = "action".into();
        config.settings.insert("items_per_page".into(), json!(25));
        config
    }

    fn runtime() -> (AddonRuntime<Addon>, Arc<Addon>) {
        let dir = tempfile::tempdir().unwrap();
        let addon = Arc::new(Addon::default());
        let runtime = RuntimeBuilder::new()
            .search_path(dir.path())
            .without_env()
            .without_logging()
            .merge(config())
            .build(dispatcher(), Arc::clone(&addon))
            .unwrap();
        (runtime, addon)
    }

    #[test]
    fn test_config_applies_to_dispatcher() {
        let (runtime, _) = runtime();
        assert_eq!(runtime.dispatcher().route_key(), "action");
        assert_eq!(runtime.dispatcher().base_url(), "plugin://plugin.video.vk/");
        assert_eq!(runtime.dispatcher().carry_param(), Some("content_type"));
        assert_eq!(runtime.config().addon.id, "plugin.video.vk");
    }

    #[test]
    fn test_run_args_binds_settings_and_builds_links() {
        let (runtime, addon) = runtime();
        let outcome = runtime
            .run_args([
                "plugin://plugin.video.vk/",
                "3",
                "?action=friends&offset=25&content_type=video",
            ])
            .unwrap();
        assert_eq!(outcome, Outcome::Handled {
            route: "friends".into()
        });
        assert_eq!(*addon.calls.lock(), vec![
            "friends 25 25 plugin://plugin.video.vk/?action=friends&offset=50&content_type=video"
                .to_string()
        ]);
    }

    #[test]
    fn test_root_route_and_unknown_route() {
        let (runtime, addon) = runtime();
        let outcome = runtime
            .run(&Invocation::from_url("plugin://plugin.video.vk/"))
            .unwrap();
        assert_eq!(outcome, Outcome::Handled {
            route: "index".into()
        });

        let outcome = runtime
            .run(&Invocation::from_url("plugin://plugin.video.vk/?action=bogus"))
            .unwrap();
        assert_eq!(outcome, Outcome::RouteNotFound {
            route: "bogus".into()
        });
        assert_eq!(*addon.calls.lock(), vec!["index".to_string()]);
    }

    #[test]
    #[traced_test]
    fn test_recovered_and_unhandled_errors() {
        let (runtime, addon) = runtime();
        let outcome = runtime
            .run(&Invocation::from_url("plugin://plugin.video.vk/?action=banned"))
            .unwrap();
        assert!(matches!(outcome, Outcome::Recovered { handled_as, .. } if handled_as == AUTH_FAILED));
        assert_eq!(*addon.calls.lock(), vec!["auth handler".to_string()]);
        assert!(logs_contain("Invocation failed and was recovered"));

        let err = runtime
            .run(&Invocation::from_url("plugin://plugin.video.vk/?action=failing"))
            .unwrap_err();
        match err {
            RuntimeError::Dispatch(e) => assert_eq!(e.handler_error().kind(), ErrorKind::ANY),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_with_settings_replaces_store() {
        let (runtime, addon) = runtime();
        let runtime = runtime.with_settings(MemorySettings::new().with("items_per_page", "10"));
        runtime
            .run(&Invocation::from_url("plugin://plugin.video.vk/?action=friends"))
            .unwrap();
        assert!(addon.calls.lock()[0].starts_with("friends 0 10 "));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = config();
        config.router.carry_param = "action".into();
        let err = AddonRuntime::from_config(&config, dispatcher(), Addon::default()).unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::Config(ConfigError::ValidationError { .. })
        ));
    }
}
