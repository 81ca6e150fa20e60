//! Handler system.
//!
//! Route handlers are plain synchronous functions whose arguments implement
//! [`FromArgument`]. [`Handler`] is implemented for such functions of up to
//! twelve arguments, Axum-style, and records the arity so registration can
//! check it against the declared parameters.
//!
//! ```rust,ignore
//! fn index() {}
//!
//! fn list_albums(addon: Arc<Addon>, owner_id: i64, offset: i64) -> HandlerResult {
//!     let albums = addon.api().albums(owner_id, offset)?;
//!     ...
//!     Ok(())
//! }
//! ```

use std::marker::PhantomData;
use std::sync::Arc;

use kodi_useful_core::{ErrorKind, HandlerError, HandlerResult};

use crate::extractor::{Argument, FromArgument};
use crate::request::RouteContext;

// ============================================================================
// Handler Trait
// ============================================================================

/// A route handler taking the arguments described by `T`.
pub trait Handler<A, T>: Send + Sync + 'static {
    /// Number of arguments the handler takes.
    const ARITY: usize;

    /// Calls the handler with its bound arguments, in declaration order.
    fn call(&self, args: Vec<Argument>, ctx: &RouteContext<'_, A>) -> HandlerResult;
}

/// Return types accepted from handlers.
pub trait IntoHandlerResult {
    /// Normalises into a [`HandlerResult`].
    fn into_handler_result(self) -> HandlerResult;
}

impl IntoHandlerResult for () {
    fn into_handler_result(self) -> HandlerResult {
        Ok(())
    }
}

impl<E: Into<HandlerError>> IntoHandlerResult for Result<(), E> {
    fn into_handler_result(self) -> HandlerResult {
        self.map_err(Into::into)
    }
}

// ============================================================================
// Type erasure
// ============================================================================

/// Wraps a function so it can be stored behind [`ErasedHandler`].
pub struct HandlerFn<F, T> {
    f: F,
    _marker: PhantomData<fn() -> T>,
}

impl<F, T> HandlerFn<F, T> {
    /// Creates a new handler function wrapper.
    pub fn new(f: F) -> Self {
        Self {
            f,
            _marker: PhantomData,
        }
    }
}

/// Type-erased handler trait for dynamic dispatch.
pub trait ErasedHandler<A>: Send + Sync {
    /// Calls the handler.
    fn call(&self, args: Vec<Argument>, ctx: &RouteContext<'_, A>) -> HandlerResult;
}

impl<A, F, T> ErasedHandler<A> for HandlerFn<F, T>
where
    F: Handler<A, T>,
    T: 'static,
{
    fn call(&self, args: Vec<Argument>, ctx: &RouteContext<'_, A>) -> HandlerResult {
        self.f.call(args, ctx)
    }
}

/// A type-erased handler that can be stored in the route table.
pub type BoxedHandler<A> = Arc<dyn ErasedHandler<A>>;

/// Converts a handler function into a boxed handler.
pub fn into_handler<A, F, T>(f: F) -> BoxedHandler<A>
where
    A: 'static,
    F: Handler<A, T>,
    T: 'static,
{
    Arc::new(HandlerFn::new(f))
}

// ============================================================================
// Handler implementations for functions
// ============================================================================

fn next_argument(args: &mut std::vec::IntoIter<Argument>) -> HandlerResult<Argument> {
    args.next().ok_or_else(|| {
        HandlerError::new(
            ErrorKind::BIND,
            "handler takes more arguments than the route declares",
        )
    })
}

impl<A, F, R> Handler<A, ()> for F
where
    F: Fn() -> R + Send + Sync + 'static,
    R: IntoHandlerResult,
{
    const ARITY: usize = 0;

    fn call(&self, _args: Vec<Argument>, _ctx: &RouteContext<'_, A>) -> HandlerResult {
        (self)().into_handler_result()
    }
}

macro_rules! impl_handler {
    (
        $arity:literal; $($ty:ident),*
    ) => {
        #[allow(non_snake_case)]
        impl<A, F, R, $($ty,)*> Handler<A, ($($ty,)*)> for F
        where
            F: Fn($($ty,)*) -> R + Send + Sync + 'static,
            R: IntoHandlerResult,
            $( $ty: FromArgument<A>, )*
        {
            const ARITY: usize = $arity;

            fn call(&self, args: Vec<Argument>, ctx: &RouteContext<'_, A>) -> HandlerResult {
                let mut args = args.into_iter();
                $(
                    let $ty = <$ty as FromArgument<A>>::from_argument(next_argument(&mut args)?, ctx)?;
                )*

                (self)($($ty,)*).into_handler_result()
            }
        }
    };
}

impl_handler!(1; T1);
impl_handler!(2; T1, T2);
impl_handler!(3; T1, T2, T3);
impl_handler!(4; T1, T2, T3, T4);
impl_handler!(5; T1, T2, T3, T4, T5);
impl_handler!(6; T1, T2, T3, T4, T5, T6);
impl_handler!(7; T1, T2, T3, T4, T5, T6, T7);
impl_handler!(8; T1, T2, T3, T4, T5, T6, T7, T8);
impl_handler!(9; T1, T2, T3, T4, T5, T6, T7, T8, T9);
impl_handler!(10; T1, T2, T3, T4, T5, T6, T7, T8, T9, T10);
impl_handler!(11; T1, T2, T3, T4, T5, T6, T7, T8, T9, T10, T11);
impl_handler!(12; T1, T2, T3, T4, T5, T6, T7, T8, T9, T10, T11, T12);

/// Returns the arity of a handler without calling it.
pub fn handler_arity<A, F, T>(_handler: &F) -> usize
where
    F: Handler<A, T>,
{
    F::ARITY
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zero() {}
    fn two(_a: i64, _b: String) -> HandlerResult {
        Ok(())
    }
    fn fallible(_a: Option<bool>) -> Result<(), std::io::Error> {
        Ok(())
    }

    #[test]
    fn test_arity() {
        assert_eq!(handler_arity::<(), _, _>(&zero), 0);
        assert_eq!(handler_arity::<(), _, _>(&two), 2);
        assert_eq!(handler_arity::<(), _, _>(&fallible), 1);
    }

    #[test]
    fn test_into_handler_result() {
        assert!(().into_handler_result().is_ok());
        let err: Result<(), std::io::Error> = Err(std::io::Error::other("boom"));
        let err = err.into_handler_result().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ANY);
        assert_eq!(err.message(), "boom");
    }
}
