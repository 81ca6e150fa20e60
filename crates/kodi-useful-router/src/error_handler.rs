//! Error kinds hierarchy and the error handler registry.
//!
//! Error handlers are keyed by [`ErrorKind`]. When a handler fails, the kind of
//! its error is walked up the hierarchy (the kind itself, its parent, ..., up
//! to [`ErrorKind::ANY`]) and the first kind with a registered handler wins.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use kodi_useful_core::{ErrorKind, HandlerError, HandlerResult};

use crate::dispatcher::Dispatcher;
use crate::error::{RouterError, RouterResult};
use crate::request::Request;

/// Parent relation between error kinds.
#[derive(Debug, Clone)]
pub struct ErrorHierarchy {
    parents: HashMap<ErrorKind, ErrorKind>,
}

impl Default for ErrorHierarchy {
    fn default() -> Self {
        let parents = [
            (ErrorKind::ROUTER, ErrorKind::ANY),
            (ErrorKind::MISSING_PARAMETER, ErrorKind::ROUTER),
            (ErrorKind::CAST, ErrorKind::ROUTER),
            (ErrorKind::SETTINGS, ErrorKind::ROUTER),
            (ErrorKind::BIND, ErrorKind::ROUTER),
        ]
        .into_iter()
        .collect();
        Self { parents }
    }
}

impl ErrorHierarchy {
    /// Creates the hierarchy of the built-in kinds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares `parent` as the parent of `kind`.
    ///
    /// Redeclaring a kind replaces its parent. Declarations that would make a
    /// kind its own ancestor, or give [`ErrorKind::ANY`] a parent, are rejected.
    pub fn declare(&mut self, kind: ErrorKind, parent: ErrorKind) -> RouterResult<()> {
        if kind == ErrorKind::ANY || self.ancestors(parent).any(|k| k == kind) {
            return Err(RouterError::KindCycle { kind, parent });
        }
        self.parents.insert(kind, parent);
        Ok(())
    }

    /// Returns the parent of `kind`; undeclared kinds descend from `ANY`.
    pub fn parent(&self, kind: ErrorKind) -> Option<ErrorKind> {
        if kind == ErrorKind::ANY {
            return None;
        }
        Some(self.parents.get(&kind).copied().unwrap_or(ErrorKind::ANY))
    }

    /// Iterates from `kind` itself up to and including `ANY`.
    pub fn ancestors(&self, kind: ErrorKind) -> impl Iterator<Item = ErrorKind> + '_ {
        std::iter::successors(Some(kind), |k| self.parent(*k))
    }

    /// Returns `true` if `kind` is `ancestor` or descends from it.
    pub fn is_a(&self, kind: ErrorKind, ancestor: ErrorKind) -> bool {
        self.ancestors(kind).any(|k| k == ancestor)
    }
}

/// Callback invoked when a routed call fails with a matching error kind.
///
/// It receives the error, the dispatcher (to generate URLs or dispatch
/// again) and the request that failed. Returning `Err` propagates out of
/// [`Dispatcher::dispatch`].
pub type ErrorHandlerFn<A> =
    Arc<dyn Fn(&HandlerError, &Dispatcher<A>, &Request<A>) -> HandlerResult + Send + Sync>;

/// Error handlers keyed by error kind, resolved through an [`ErrorHierarchy`].
pub struct ErrorHandlers<A> {
    hierarchy: ErrorHierarchy,
    handlers: HashMap<ErrorKind, ErrorHandlerFn<A>>,
}

impl<A> Default for ErrorHandlers<A> {
    fn default() -> Self {
        Self {
            hierarchy: ErrorHierarchy::default(),
            handlers: HashMap::new(),
        }
    }
}

impl<A> ErrorHandlers<A> {
    /// Creates an empty registry over the built-in hierarchy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the kind hierarchy.
    pub fn hierarchy(&self) -> &ErrorHierarchy {
        &self.hierarchy
    }

    /// Declares a custom kind under `parent`.
    pub fn declare(&mut self, kind: ErrorKind, parent: ErrorKind) -> RouterResult<()> {
        self.hierarchy.declare(kind, parent)
    }

    /// Registers `handler` for `kind`, replacing any previous handler.
    pub fn register<F>(&mut self, kind: ErrorKind, handler: F)
    where
        F: Fn(&HandlerError, &Dispatcher<A>, &Request<A>) -> HandlerResult + Send + Sync + 'static,
    {
        self.handlers.insert(kind, Arc::new(handler));
    }

    /// Finds the handler of the nearest kind, starting from `kind` itself.
    pub fn resolve(&self, kind: ErrorKind) -> Option<(ErrorKind, &ErrorHandlerFn<A>)> {
        self.hierarchy
            .ancestors(kind)
            .find_map(|k| self.handlers.get(&k).map(|handler| (k, handler)))
    }

    /// Returns `true` if no handler is registered.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl<A> fmt::Debug for ErrorHandlers<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorHandlers")
            .field("hierarchy", &self.hierarchy)
            .field("handlers", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const API: ErrorKind = ErrorKind::new("api");
    const AUTH_FAILED: ErrorKind = ErrorKind::new("api.auth_failed");
    const TOKEN_EXPIRED: ErrorKind = ErrorKind::new("api.auth_failed.token_expired");

    fn hierarchy() -> ErrorHierarchy {
        let mut h = ErrorHierarchy::new();
        h.declare(API, ErrorKind::ANY).unwrap();
        h.declare(AUTH_FAILED, API).unwrap();
        h.declare(TOKEN_EXPIRED, AUTH_FAILED).unwrap();
        h
    }

    #[test]
    fn test_builtin_parents() {
        let h = ErrorHierarchy::new();
        assert_eq!(h.parent(ErrorKind::CAST), Some(ErrorKind::ROUTER));
        assert_eq!(h.parent(ErrorKind::ROUTER), Some(ErrorKind::ANY));
        assert_eq!(h.parent(ErrorKind::ANY), None);
        assert_eq!(h.parent(ErrorKind::new("undeclared")), Some(ErrorKind::ANY));
    }

    #[test]
    fn test_ancestors_are_ordered() {
        let h = hierarchy();
        assert_eq!(
            h.ancestors(TOKEN_EXPIRED).collect::<Vec<_>>(),
            vec![TOKEN_EXPIRED, AUTH_FAILED, API, ErrorKind::ANY]
        );
        assert!(h.is_a(TOKEN_EXPIRED, API));
        assert!(!h.is_a(API, AUTH_FAILED));
    }

    #[test]
    fn test_cycles_are_rejected() {
        let mut h = hierarchy();
        assert!(matches!(
            h.declare(API, TOKEN_EXPIRED),
            Err(RouterError::KindCycle { .. })
        ));
        assert!(h.declare(API, API).is_err());
        assert!(h.declare(ErrorKind::ANY, API).is_err());
        // unchanged after the failed declarations
        assert_eq!(h.parent(API), Some(ErrorKind::ANY));
    }

    #[test]
    fn test_nearest_handler_wins() {
        let mut handlers: ErrorHandlers<()> = ErrorHandlers::new();
        handlers.declare(API, ErrorKind::ANY).unwrap();
        handlers.declare(AUTH_FAILED, API).unwrap();
        handlers.declare(TOKEN_EXPIRED, AUTH_FAILED).unwrap();
        handlers.register(API, |_, _, _| Ok(()));
        handlers.register(AUTH_FAILED, |_, _, _| Ok(()));

        let (kind, _) = handlers.resolve(TOKEN_EXPIRED).unwrap();
        assert_eq!(kind, AUTH_FAILED);
        let (kind, _) = handlers.resolve(API).unwrap();
        assert_eq!(kind, API);
        assert!(handlers.resolve(ErrorKind::CAST).is_none());

        handlers.register(ErrorKind::ANY, |_, _, _| Ok(()));
        let (kind, _) = handlers.resolve(ErrorKind::CAST).unwrap();
        assert_eq!(kind, ErrorKind::ANY);
    }
}
