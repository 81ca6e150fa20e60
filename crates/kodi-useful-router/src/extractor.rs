//! Extractor system: turning bound arguments into typed handler parameters.
//!
//! The dispatcher resolves each declared parameter into an [`Argument`]. The
//! handler's argument types then decide how the bound value is read, through
//! [`FromArgument`]:
//!
//! ```rust,ignore
//! fn list_friends(
//!     addon: Arc<Addon>,       // the ambient context
//!     offset: i64,             // a coerced query value
//!     owner: Option<i64>,      // absent or null becomes `None`
//!     nav: Navigator<Addon>,   // URL generation for the current request
//! ) -> HandlerResult { ... }
//! ```

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use kodi_useful_core::{ErrorKind, HandlerError, HandlerResult, Value};
use serde::de::DeserializeOwned;

use crate::request::RouteContext;
use crate::url::Navigator;

/// What the dispatcher resolved for one parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    /// A value read from the query string or settings, or the declared default.
    Value(Value),
    /// Not supplied by the dispatcher.
    Unbound,
    /// The ambient execution context.
    Context,
}

/// A named binding, passed positionally to the handler.
#[derive(Debug, Clone, PartialEq)]
pub struct Argument {
    name: Arc<str>,
    binding: Binding,
}

impl Argument {
    /// Creates a named binding.
    pub fn new(name: impl Into<Arc<str>>, binding: Binding) -> Self {
        Self {
            name: name.into(),
            binding,
        }
    }

    /// Returns the parameter name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the binding.
    pub fn binding(&self) -> &Binding {
        &self.binding
    }

    /// Takes the bound value, failing for context or unbound arguments.
    pub fn into_value(self) -> HandlerResult<(Arc<str>, Value)> {
        match self.binding {
            Binding::Value(value) => Ok((self.name, value)),
            Binding::Unbound => Err(bind_error(&self.name, "is not bound to any value")),
            Binding::Context => Err(bind_error(
                &self.name,
                "receives the add-on context, not a value",
            )),
        }
    }
}

fn bind_error(name: &str, detail: impl std::fmt::Display) -> HandlerError {
    HandlerError::new(ErrorKind::BIND, format!("argument `{name}` {detail}"))
}

/// Types that can be built from a bound [`Argument`].
///
/// Failures are reported with [`ErrorKind::BIND`] and go through the error
/// handlers like any other handler error.
pub trait FromArgument<A>: Sized {
    /// Builds the handler parameter.
    fn from_argument(arg: Argument, ctx: &RouteContext<'_, A>) -> HandlerResult<Self>;
}

/// Types that can be read out of a bound JSON value.
pub trait FromValue: Sized {
    /// Converts the bound value.
    fn from_value(value: Value) -> Result<Self, serde_json::Error>;
}

// ============================================================================
// Leaf value types
// ============================================================================

macro_rules! impl_from_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl FromValue for $ty {
                fn from_value(value: Value) -> Result<Self, serde_json::Error> {
                    serde_json::from_value(value)
                }
            }

            impl<A> FromArgument<A> for $ty {
                fn from_argument(arg: Argument, _ctx: &RouteContext<'_, A>) -> HandlerResult<Self> {
                    from_bound_value(arg)
                }
            }
        )*
    };
}

impl_from_value!(bool, i32, i64, u32, u64, usize, f32, f64, String);

fn from_bound_value<T: FromValue>(arg: Argument) -> HandlerResult<T> {
    let (name, value) = arg.into_value()?;
    T::from_value(value).map_err(|e| bind_error(&name, e))
}

impl FromValue for Value {
    fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        Ok(value)
    }
}

impl<A> FromArgument<A> for Value {
    fn from_argument(arg: Argument, _ctx: &RouteContext<'_, A>) -> HandlerResult<Self> {
        match arg.binding {
            Binding::Unbound => Ok(Value::Null),
            _ => from_bound_value(arg),
        }
    }
}

/// Deserializes the bound value into `T`.
///
/// ```rust,ignore
/// #[derive(Deserialize)]
/// struct Filter { sort: String, reverse: bool }
///
/// fn search(Json(filter): Json<Filter>) -> HandlerResult { ... }
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Json<T>(pub T);

impl<T> Json<T> {
    /// Unwraps the inner value.
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Deref for Json<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T> DerefMut for Json<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.0
    }
}

impl<T: DeserializeOwned> FromValue for Json<T> {
    fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value).map(Json)
    }
}

impl<A, T: DeserializeOwned> FromArgument<A> for Json<T> {
    fn from_argument(arg: Argument, _ctx: &RouteContext<'_, A>) -> HandlerResult<Self> {
        from_bound_value(arg)
    }
}

// ============================================================================
// Wrappers
// ============================================================================

/// `None` for unbound or `Null` arguments.
impl<A, T: FromValue> FromArgument<A> for Option<T> {
    fn from_argument(arg: Argument, _ctx: &RouteContext<'_, A>) -> HandlerResult<Self> {
        match arg.binding {
            Binding::Unbound | Binding::Value(Value::Null) => Ok(None),
            _ => from_bound_value(arg).map(Some),
        }
    }
}

/// One element per list item; a scalar becomes a one-element list and an
/// unbound or `Null` argument an empty one.
impl<A, T: FromValue> FromArgument<A> for Vec<T> {
    fn from_argument(arg: Argument, _ctx: &RouteContext<'_, A>) -> HandlerResult<Self> {
        let name = Arc::clone(&arg.name);
        let items = match arg.binding {
            Binding::Unbound | Binding::Value(Value::Null) => return Ok(Vec::new()),
            Binding::Value(Value::Array(items)) => items,
            Binding::Value(other) => vec![other],
            Binding::Context => {
                return Err(bind_error(&name, "receives the add-on context, not a value"));
            }
        };
        items
            .into_iter()
            .map(|item| T::from_value(item).map_err(|e| bind_error(&name, e)))
            .collect()
    }
}

// ============================================================================
// Context extractors
// ============================================================================

/// The ambient context, for parameters declared with [`Param::context`].
///
/// [`Param::context`]: crate::param::Param::context
impl<A> FromArgument<A> for Arc<A> {
    fn from_argument(arg: Argument, ctx: &RouteContext<'_, A>) -> HandlerResult<Self> {
        match arg.binding {
            Binding::Context => Ok(ctx.request().context_arc()),
            _ => Err(bind_error(&arg.name, "is not declared as the add-on context")),
        }
    }
}

/// URL generation bound to the current request, for context parameters.
impl<A> FromArgument<A> for Navigator<A> {
    fn from_argument(arg: Argument, ctx: &RouteContext<'_, A>) -> HandlerResult<Self> {
        match arg.binding {
            Binding::Context => Ok(ctx.navigator()),
            _ => Err(bind_error(&arg.name, "is not declared as the add-on context")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_into_value() {
        let (name, value) = Argument::new("offset", Binding::Value(json!(10)))
            .into_value()
            .unwrap();
        assert_eq!(&*name, "offset");
        assert_eq!(value, json!(10));

        let err = Argument::new("offset", Binding::Unbound)
            .into_value()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BIND);
        assert!(err.message().contains("`offset`"));

        let err = Argument::new("addon", Binding::Context)
            .into_value()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BIND);
    }

    #[test]
    fn test_leaf_conversion_errors_are_bind_errors() {
        let err = from_bound_value::<i64>(Argument::new("offset", Binding::Value(json!("ten"))))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BIND);

        let value: f64 =
            from_bound_value(Argument::new("ratio", Binding::Value(json!(2)))).unwrap();
        assert_eq!(value, 2.0);
    }

    #[test]
    fn test_json_wrapper() {
        #[derive(Debug, serde::Deserialize, PartialEq)]
        struct Filter {
            sort: String,
        }
        let Json(filter): Json<Filter> =
            from_bound_value(Argument::new("filter", Binding::Value(json!({"sort": "name"}))))
                .unwrap();
        assert_eq!(filter.sort, "name");
    }
}
