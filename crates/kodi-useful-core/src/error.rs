//! Error types shared by every layer of kodi-useful.
//!
//! Errors raised while a route is being dispatched are funnelled into a single
//! [`HandlerError`] carrying an [`ErrorKind`]. Kinds form a hierarchy (declared
//! in the router's `ErrorHierarchy`) so that an error handler registered for a
//! broad kind also catches its more specific descendants.

use std::error::Error as StdError;
use std::fmt;

use thiserror::Error;

// =============================================================================
// Error kinds
// =============================================================================

/// Classification of a dispatch-time error.
///
/// Kinds are plain static names; the parent links between them live in the
/// router's `ErrorHierarchy`, which is built once at startup. Add-ons define
/// their own kinds as constants:
///
/// ```rust,ignore
/// pub const AUTH_FAILED: ErrorKind = ErrorKind::new("vk.auth_failed");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ErrorKind(&'static str);

impl ErrorKind {
    /// Root of the hierarchy; every kind eventually falls back to it.
    pub const ANY: Self = Self("error");
    /// Base kind of every error produced by the routing engine itself.
    pub const ROUTER: Self = Self("router");
    /// A required query-scoped parameter was absent.
    pub const MISSING_PARAMETER: Self = Self("router.missing_parameter");
    /// A raw string could not be coerced into the declared type.
    pub const CAST: Self = Self("router.cast");
    /// The settings store could not supply a settings-scoped parameter.
    pub const SETTINGS: Self = Self("router.settings");
    /// A bound value did not fit the handler's argument type.
    pub const BIND: Self = Self("router.bind");

    /// Creates a kind with the given name.
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    /// Returns the name of this kind.
    pub const fn name(self) -> &'static str {
        self.0
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Errors that know which [`ErrorKind`] they belong to.
pub trait ErrorClass {
    /// Returns the kind this error is reported under.
    fn error_kind(&self) -> ErrorKind;
}

// =============================================================================
// Coercion / query / settings errors
// =============================================================================

/// A raw string could not be converted by a type cast.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CastError {
    /// The value does not parse as the expected type.
    #[error("cannot convert {value:?} to {expected}")]
    Invalid {
        /// The raw input.
        value: String,
        /// Name of the target type.
        expected: &'static str,
    },

    /// A custom getter rejected the value.
    #[error("{0}")]
    Custom(String),
}

impl CastError {
    /// Creates an [`CastError::Invalid`] error.
    pub fn invalid(value: impl Into<String>, expected: &'static str) -> Self {
        Self::Invalid {
            value: value.into(),
            expected,
        }
    }

    /// Creates a custom cast error.
    pub fn custom(msg: impl Into<String>) -> Self {
        Self::Custom(msg.into())
    }
}

impl ErrorClass for CastError {
    fn error_kind(&self) -> ErrorKind {
        ErrorKind::CAST
    }
}

/// Errors raised while reading values out of a query string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// A required parameter is absent.
    #[error("the `{name}` parameter is missing in the query string")]
    MissingParameter {
        /// Query key that was looked up.
        name: String,
    },

    /// A value was present but could not be coerced.
    #[error("invalid value for `{name}`: {source}")]
    Cast {
        /// Query key that was looked up.
        name: String,
        /// The underlying coercion failure.
        #[source]
        source: CastError,
    },
}

impl QueryError {
    /// Creates a missing parameter error.
    pub fn missing(name: impl Into<String>) -> Self {
        Self::MissingParameter { name: name.into() }
    }
}

impl ErrorClass for QueryError {
    fn error_kind(&self) -> ErrorKind {
        match self {
            Self::MissingParameter { .. } => ErrorKind::MISSING_PARAMETER,
            Self::Cast { .. } => ErrorKind::CAST,
        }
    }
}

/// Errors raised by a [`SettingsStore`](crate::settings::SettingsStore).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingsError {
    /// No value is stored under the key.
    #[error("setting `{key}` is not defined")]
    NotFound {
        /// The settings key.
        key: String,
    },

    /// The stored value does not match the requested kind.
    #[error("setting `{key}` has an invalid value: {source}")]
    Cast {
        /// The settings key.
        key: String,
        /// The underlying coercion failure.
        #[source]
        source: CastError,
    },
}

impl ErrorClass for SettingsError {
    fn error_kind(&self) -> ErrorKind {
        ErrorKind::SETTINGS
    }
}

// =============================================================================
// HandlerError
// =============================================================================

type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// The error type flowing out of route handlers and argument binding.
///
/// Any `std::error::Error` converts into a `HandlerError` of kind
/// [`ErrorKind::ANY`] through `?`; use [`HandlerError::classified`] or
/// [`WithKind::with_kind`] to report a more specific kind.
///
/// `HandlerError` does not implement `std::error::Error`: the blanket `From`
/// conversion would overlap with `From<T> for T`.
pub struct HandlerError {
    kind: ErrorKind,
    message: String,
    source: Option<BoxError>,
}

impl HandlerError {
    /// Creates an error with a kind and a message.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Wraps an error under the given kind.
    pub fn with_source<E>(kind: ErrorKind, source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self {
            kind,
            message: source.to_string(),
            source: Some(Box::new(source)),
        }
    }

    /// Wraps an error that knows its own kind.
    pub fn classified<E>(source: E) -> Self
    where
        E: ErrorClass + StdError + Send + Sync + 'static,
    {
        Self::with_source(source.error_kind(), source)
    }

    /// Returns the kind of this error.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the human-readable message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the wrapped error, if any.
    pub fn source(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.source.as_deref()
    }

    /// Attempts to downcast the wrapped error to a concrete type.
    pub fn downcast_ref<E: StdError + 'static>(&self) -> Option<&E> {
        self.source.as_deref().and_then(|e| e.downcast_ref::<E>())
    }
}

impl<E> From<E> for HandlerError
where
    E: StdError + Send + Sync + 'static,
{
    fn from(err: E) -> Self {
        Self::with_source(ErrorKind::ANY, err)
    }
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}

impl fmt::Debug for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerError")
            .field("kind", &self.kind)
            .field("message", &self.message)
            .field("source", &self.source)
            .finish()
    }
}

/// Extension for tagging fallible results with an [`ErrorKind`].
///
/// ```rust,ignore
/// let friends = api.get_friends(offset).with_kind(AUTH_FAILED)?;
/// ```
pub trait WithKind<T> {
    /// Converts the error side into a [`HandlerError`] of the given kind.
    fn with_kind(self, kind: ErrorKind) -> HandlerResult<T>;
}

impl<T, E> WithKind<T> for Result<T, E>
where
    E: StdError + Send + Sync + 'static,
{
    fn with_kind(self, kind: ErrorKind) -> HandlerResult<T> {
        self.map_err(|e| HandlerError::with_source(kind, e))
    }
}

/// Result type returned by handlers and error handlers.
pub type HandlerResult<T = ()> = Result<T, HandlerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    #[error("token expired")]
    struct TokenExpired;

    #[test]
    fn test_question_mark_conversion_uses_any() {
        fn run() -> HandlerResult {
            let res: Result<(), TokenExpired> = Err(TokenExpired);
            res?;
            Ok(())
        }

        let err = run().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ANY);
        assert_eq!(err.message(), "token expired");
        assert!(err.downcast_ref::<TokenExpired>().is_some());
    }

    #[test]
    fn test_classified_keeps_query_kind() {
        let err = HandlerError::classified(QueryError::missing("owner_id"));
        assert_eq!(err.kind(), ErrorKind::MISSING_PARAMETER);
        assert_eq!(
            err.to_string(),
            "[router.missing_parameter] the `owner_id` parameter is missing in the query string"
        );
    }

    #[test]
    fn test_with_kind() {
        const AUTH: ErrorKind = ErrorKind::new("vk.auth");
        let res: Result<(), TokenExpired> = Err(TokenExpired);
        let err = res.with_kind(AUTH).unwrap_err();
        assert_eq!(err.kind(), AUTH);
    }
}
