//! # kodi-useful router
//!
//! Declarative request routing for Kodi plugin add-ons.
//!
//! This layer provides:
//! - Parameter declarations ([`Param`]) and the binding instructions derived
//!   from them at registration ([`ArgumentDescriptor`])
//! - Axum-style handlers: plain functions whose arguments implement
//!   [`FromArgument`]
//! - The [`Dispatcher`], which binds query, settings and context values and
//!   routes failures through a hierarchy of error kinds
//! - URL generation for registered routes ([`UrlBuilder`], [`Navigator`])

pub mod dispatcher;
pub mod error;
pub mod error_handler;
pub mod extractor;
pub mod handler;
pub mod param;
pub mod request;
pub mod route;
pub mod url;

pub use dispatcher::{DEFAULT_CARRY_PARAM, DEFAULT_ROUTE_KEY, Dispatcher, Outcome};
pub use error::{DispatchError, RouterError, RouterResult};
pub use error_handler::{ErrorHandlerFn, ErrorHandlers, ErrorHierarchy};
pub use extractor::{Argument, Binding, FromArgument, FromValue, Json};
pub use handler::{
    BoxedHandler, ErasedHandler, Handler, HandlerFn, IntoHandlerResult, handler_arity,
    into_handler,
};
pub use param::{ArgumentDescriptor, Param, ParamType, Scope};
pub use request::{Request, RouteContext};
pub use route::{ROOT, Route, RouteTable, Target};
pub use url::{Navigator, UrlArgs, UrlBuilder};
