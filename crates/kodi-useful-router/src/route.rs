//! Routes and the route table.
//!
//! A route couples a handler with the argument descriptors derived from its
//! declared parameters. Its name defaults to the handler's fully qualified
//! path (`vk_browser::routes::list_friends`) and is what appears in generated
//! URLs under the route key.

use std::any::{TypeId, type_name};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;
use std::sync::Arc;

use kodi_useful_core::HandlerResult;
use tracing::{debug, warn};

use crate::error::{RouterError, RouterResult};
use crate::extractor::Argument;
use crate::handler::{BoxedHandler, Handler, into_handler};
use crate::param::{ArgumentDescriptor, Param};
use crate::request::RouteContext;

/// Name under which the root route is aliased.
pub const ROOT: &str = "";

/// A registered handler with its binding instructions.
pub struct Route<A> {
    name: String,
    handler: BoxedHandler<A>,
    handler_type: TypeId,
    handler_name: &'static str,
    arguments: Vec<ArgumentDescriptor>,
}

impl<A: 'static> Route<A> {
    /// Creates a route named after the handler's path.
    pub fn new<F, T>(handler: F, params: impl IntoIterator<Item = Param>) -> RouterResult<Self>
    where
        F: Handler<A, T>,
        T: 'static,
    {
        Self::named(type_name::<F>(), handler, params)
    }

    /// Creates a route with an explicit name.
    pub fn named<F, T>(
        name: impl Into<String>,
        handler: F,
        params: impl IntoIterator<Item = Param>,
    ) -> RouterResult<Self>
    where
        F: Handler<A, T>,
        T: 'static,
    {
        let name = name.into();
        if name.is_empty() {
            return Err(RouterError::EmptyRouteName);
        }

        let mut arguments: Vec<ArgumentDescriptor> = Vec::new();
        for param in params {
            if arguments.iter().any(|d| d.name() == param.name()) {
                return Err(RouterError::DuplicateParameter {
                    route: name,
                    param: param.name().to_owned(),
                });
            }
            arguments.push(param.describe());
        }
        if arguments.len() != F::ARITY {
            return Err(RouterError::ArityMismatch {
                route: name,
                declared: arguments.len(),
                expected: F::ARITY,
            });
        }

        Ok(Self {
            name,
            handler: into_handler(handler),
            handler_type: TypeId::of::<F>(),
            handler_name: type_name::<F>(),
            arguments,
        })
    }
}

impl<A> Route<A> {
    /// Returns the route name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the argument descriptors, in handler argument order.
    pub fn arguments(&self) -> &[ArgumentDescriptor] {
        &self.arguments
    }

    /// Returns the identity of the handler type.
    pub fn handler_type(&self) -> TypeId {
        self.handler_type
    }

    /// Returns the handler's type name.
    pub fn handler_name(&self) -> &'static str {
        self.handler_name
    }

    pub(crate) fn call(&self, args: Vec<Argument>, ctx: &RouteContext<'_, A>) -> HandlerResult {
        self.handler.call(args, ctx)
    }
}

impl<A> fmt::Debug for Route<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("name", &self.name)
            .field("handler", &self.handler_name)
            .field("arguments", &self.arguments)
            .finish()
    }
}

/// What a URL is being generated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target<'a> {
    /// A route name, or [`ROOT`].
    Name(&'a str),
    /// A handler, identified by its type.
    Handler {
        type_id: TypeId,
        type_name: &'static str,
    },
}

impl Target<'static> {
    /// Targets the route registered for `handler`.
    pub fn handler<F: 'static>(_handler: &F) -> Self {
        Self::Handler {
            type_id: TypeId::of::<F>(),
            type_name: type_name::<F>(),
        }
    }
}

impl<'a> From<&'a str> for Target<'a> {
    fn from(name: &'a str) -> Self {
        Self::Name(name)
    }
}

impl<'a> From<&'a String> for Target<'a> {
    fn from(name: &'a String) -> Self {
        Self::Name(name)
    }
}

impl fmt::Display for Target<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => f.write_str(name),
            Self::Handler { type_name, .. } => f.write_str(type_name),
        }
    }
}

/// Name-keyed route registry with a root alias.
pub struct RouteTable<A> {
    routes: HashMap<String, Arc<Route<A>>>,
    by_handler: HashMap<TypeId, Arc<Route<A>>>,
}

impl<A> Default for RouteTable<A> {
    fn default() -> Self {
        Self {
            routes: HashMap::new(),
            by_handler: HashMap::new(),
        }
    }
}

impl<A> RouteTable<A> {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a route, optionally aliasing it as the root.
    ///
    /// Registering the same handler again under the same name returns the
    /// existing route. A different handler under a taken name, or a second
    /// root, is rejected without touching the table.
    pub fn register(&mut self, route: Route<A>, root: bool) -> RouterResult<Arc<Route<A>>> {
        if let Some(existing) = self.routes.get(route.name()) {
            if existing.handler_type() != route.handler_type() {
                return Err(RouterError::DuplicateRoute {
                    name: route.name().to_owned(),
                });
            }
            warn!(
                route = route.name(),
                "Route registered twice with the same handler, keeping the first registration"
            );
            let existing = Arc::clone(existing);
            if root {
                self.alias_root(&existing)?;
            }
            return Ok(existing);
        }

        let route = Arc::new(route);
        if root {
            self.alias_root(&route)?;
        }
        debug!(route = route.name(), root, "Registered route");
        self.routes
            .insert(route.name().to_owned(), Arc::clone(&route));
        self.by_handler
            .entry(route.handler_type())
            .or_insert_with(|| Arc::clone(&route));
        Ok(route)
    }

    fn alias_root(&mut self, route: &Arc<Route<A>>) -> RouterResult<()> {
        match self.routes.entry(ROOT.to_owned()) {
            Entry::Occupied(entry) if Arc::ptr_eq(entry.get(), route) => Ok(()),
            Entry::Occupied(entry) => Err(RouterError::DuplicateRoot {
                existing: entry.get().name().to_owned(),
                name: route.name().to_owned(),
            }),
            Entry::Vacant(entry) => {
                entry.insert(Arc::clone(route));
                Ok(())
            }
        }
    }

    /// Looks up a route by name; [`ROOT`] resolves the root alias.
    pub fn get(&self, name: &str) -> Option<&Arc<Route<A>>> {
        self.routes.get(name)
    }

    /// Returns the root route, if one was registered.
    pub fn root(&self) -> Option<&Arc<Route<A>>> {
        self.routes.get(ROOT)
    }

    /// Resolves a URL target to its route.
    pub fn find(&self, target: &Target<'_>) -> RouterResult<&Arc<Route<A>>> {
        let found = match target {
            Target::Name(name) => self.routes.get(*name),
            Target::Handler { type_id, .. } => self.by_handler.get(type_id),
        };
        found.ok_or_else(|| RouterError::RouteNotFound {
            target: target.to_string(),
        })
    }

    /// Number of distinct routes, not counting the root alias.
    pub fn len(&self) -> usize {
        self.routes.len() - usize::from(self.routes.contains_key(ROOT))
    }

    /// Returns `true` if no route is registered.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Iterates over the registered route names, excluding the root alias.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.routes
            .keys()
            .map(String::as_str)
            .filter(|name| !name.is_empty())
    }
}

impl<A> fmt::Debug for RouteTable<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteTable")
            .field("routes", &self.routes.keys().collect::<Vec<_>>())
            .finish()
    }
}
