//! # kodi-useful
//!
//! Declarative request routing and parameter binding for Kodi plugin add-ons.
//!
//! ## Overview
//!
//! A Kodi plugin is started once per click with a URL such as
//! `plugin://plugin.video.vk/?r=albums&owner_id=1&offset=50`. kodi-useful
//! reads the route name from the query, binds each declared handler
//! parameter from the query string, the add-on settings or the add-on
//! context, calls the handler and routes failures to error handlers.
//!
//! ```text
//! ┌────────────┐     ┌────────────┐     ┌─────────────────────────────┐
//! │ Invocation │────▶│ Dispatcher │────▶│ route "albums"  (bound args) │──▶ handler
//! │ (argv/URL) │     │            │────▶│ route "friends" (bound args) │──▶ handler
//! └────────────┘     └─────┬──────┘     └─────────────────────────────┘
//!                          │ failure
//!                          ▼
//!                   error handlers (nearest error kind)
//! ```
//!
//! - **Core**: query parsing, value coercion, the settings store interface
//! - **Router**: route table, parameter declarations, dispatch, URL generation
//! - **Runtime**: configuration, logging, Kodi argument parsing
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use kodi_useful::prelude::*;
//!
//! fn index(addon: Arc<Addon>, nav: Navigator<Addon>) -> HandlerResult {
//!     let url = nav.url_for("albums", &UrlArgs::new().arg("owner_id", 1))?;
//!     addon.add_folder("Albums", &url);
//!     Ok(())
//! }
//!
//! fn albums(addon: Arc<Addon>, owner_id: i64, offset: i64) { /* ... */ }
//!
//! fn main() -> anyhow::Result<()> {
//!     let dispatcher = Dispatcher::new()
//!         .root(index, [Param::context("addon"), Param::context("nav")])?
//!         .route(albums, [
//!             Param::context("addon"),
//!             Param::query("owner_id").ty(ParamType::Int),
//!             Param::query("offset").ty(ParamType::Int).default(0),
//!         ])?;
//!
//!     RuntimeBuilder::new()
//!         .build(dispatcher, Addon::new())?
//!         .run(&Invocation::from_env()?)?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config`: TOML configuration files (default)
//! - `yaml-config`: YAML configuration files
//! - `json-log`: JSON log output

pub use kodi_useful_core as core;
pub use kodi_useful_router as router;
pub use kodi_useful_runtime as runtime;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use kodi_useful::prelude::*;
/// ```
pub mod prelude {
    pub use std::sync::Arc;

    // Runtime - main entry point
    pub use kodi_useful_runtime::{AddonRuntime, Invocation, RuntimeBuilder, RuntimeError};

    // Routing and declarations
    pub use kodi_useful_router::{
        Dispatcher, Outcome, Param, ParamType, ROOT, Request, Scope, Target,
    };

    // Extractors and URL generation - for handler parameters
    pub use kodi_useful_router::{Json, Navigator, UrlArgs};

    // Errors
    pub use kodi_useful_core::{ErrorKind, HandlerError, HandlerResult, WithKind};

    // Settings
    pub use kodi_useful_core::{MemorySettings, SettingKind, SettingsStore};

    // Values
    pub use kodi_useful_core::{QueryParams, Value};
}
