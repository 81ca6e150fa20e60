//! Error types for route registration, URL generation and dispatch.

use kodi_useful_core::{ErrorClass, ErrorKind, HandlerError};
use thiserror::Error;

/// Errors raised while building the route table or generating URLs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouterError {
    /// A different handler is already registered under this name.
    #[error("duplicate route name `{name}`")]
    DuplicateRoute { name: String },

    /// A different handler already serves the root URL.
    #[error("cannot register `{name}` as root: `{existing}` is already the root route")]
    DuplicateRoot { existing: String, name: String },

    /// Route names must not be empty; the empty name is the root alias.
    #[error("route name must not be empty")]
    EmptyRouteName,

    /// The declared parameter list does not match the handler's arguments.
    #[error("route `{route}` declares {declared} parameters but its handler takes {expected}")]
    ArityMismatch {
        route: String,
        declared: usize,
        expected: usize,
    },

    /// Two parameters of one route share a name.
    #[error("parameter `{param}` is declared twice in route `{route}`")]
    DuplicateParameter { route: String, param: String },

    /// The target does not resolve to a registered route.
    #[error("`{target}` is not a registered route")]
    RouteNotFound { target: String },

    /// A required query parameter was not supplied to URL generation.
    #[error("missing value for required parameter `{param}` of route `{route}`")]
    MissingRouteParameter { route: String, param: String },

    /// Registration attempted after URL builders took a handle on the table.
    #[error("routes cannot be registered once the route table is shared")]
    RegistrySealed,

    /// Declaring this parent would make the error hierarchy cyclic.
    #[error("error kind `{kind}` cannot descend from `{parent}`")]
    KindCycle { kind: ErrorKind, parent: ErrorKind },
}

impl ErrorClass for RouterError {
    fn error_kind(&self) -> ErrorKind {
        ErrorKind::ROUTER
    }
}

/// Result type for registration and URL generation.
pub type RouterResult<T> = Result<T, RouterError>;

/// A dispatch that could not be completed.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// No error handler matched, or the matching handler failed itself.
    #[error("unhandled error in route `{route}`: {error}")]
    Unhandled { route: String, error: HandlerError },
}

impl DispatchError {
    /// Returns the error that escaped dispatch.
    pub fn handler_error(&self) -> &HandlerError {
        match self {
            Self::Unhandled { error, .. } => error,
        }
    }
}
