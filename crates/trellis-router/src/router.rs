//! Route registry and request resolution.
//!
//! Routes are kept per method in registration order and matched by a
//! linear scan over the requested method's group. When that group has no
//! compatible route, every other group is scanned so the caller can tell
//! "method not allowed" apart from "not found".

use std::borrow::Cow;

use http::Method;
use indexmap::IndexMap;

use crate::error::RegistrationError;
use crate::params::Params;
use crate::path::{normalize_path, split_segments, TrailingSlash};
use crate::route::{Route, Segment};

/// Settings applied to every lookup of a [`Router`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RouterConfig {
    /// Treatment of a trailing `/` on request paths.
    pub trailing_slash: TrailingSlash,
}

/// A successful lookup: the matched route and the parameters it bound.
#[derive(Debug)]
pub struct RouteMatch<'a, H> {
    /// The matched route.
    pub route: &'a Route<H>,
    /// Parameters bound by the route's parameter segments, in pattern order.
    pub params: Params,
}

impl<'a, H> RouteMatch<'a, H> {
    /// Returns the matched route's handler.
    #[must_use]
    pub fn handler(&self) -> &'a H {
        self.route.handler()
    }
}

/// Outcome of [`Router::resolve`].
#[derive(Debug)]
#[must_use]
pub enum Resolution<'a, H> {
    /// A route under the requested method matched.
    Matched(RouteMatch<'a, H>),
    /// No route under any method matches the path.
    NotFound,
    /// The path matches, but only under other methods.
    MethodNotAllowed {
        /// Methods that do have a matching route, in registration order.
        allowed: Vec<Method>,
    },
}

impl<'a, H> Resolution<'a, H> {
    /// Returns the match, if any.
    pub fn into_match(self) -> Option<RouteMatch<'a, H>> {
        match self {
            Self::Matched(m) => Some(m),
            _ => None,
        }
    }

    /// Returns `true` for [`Resolution::Matched`].
    pub fn is_matched(&self) -> bool {
        matches!(self, Self::Matched(_))
    }
}

/// Method-grouped route registry.
///
/// Registration rejects any route with the same shape as one already
/// registered under the same method, so a request matches at most one
/// route of each shape. When a request fits several routes of different
/// shapes (say `/news/:id` and `/news/statistics`), the one with a literal
/// at the leftmost position where they differ wins, whatever the order of
/// registration.
///
/// # Example
///
/// ```rust
/// use http::Method;
/// use trellis_router::{Resolution, Route, Router};
///
/// let mut router = Router::new();
/// router
///     .add_routes([
///         Route::get("/news", "listNews").unwrap(),
///         Route::get("/news/:id", "showNews").unwrap(),
///         Route::post("/comments", "createComment").unwrap(),
///     ])
///     .unwrap();
///
/// let Resolution::Matched(m) = router.resolve(&Method::GET, "/News/42?ref=home") else {
///     panic!("expected a match");
/// };
/// assert_eq!(*m.handler(), "showNews");
/// assert_eq!(m.params.get("id"), Some("42"));
///
/// assert!(matches!(
///     router.resolve(&Method::GET, "/comments"),
///     Resolution::MethodNotAllowed { .. }
/// ));
/// assert!(matches!(router.resolve(&Method::GET, "/unknown"), Resolution::NotFound));
/// ```
#[derive(Debug, Clone)]
pub struct Router<H> {
    routes: IndexMap<Method, Vec<Route<H>>>,
    config: RouterConfig,
}

impl<H> Default for Router<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> Router<H> {
    /// Creates an empty router with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(RouterConfig::default())
    }

    /// Creates an empty router with the given configuration.
    #[must_use]
    pub fn with_config(config: RouterConfig) -> Self {
        Self {
            routes: IndexMap::new(),
            config,
        }
    }

    /// Returns the router configuration.
    #[must_use]
    pub fn config(&self) -> RouterConfig {
        self.config
    }

    /// Registers routes in order.
    ///
    /// Stops at the first route that conflicts with an already registered
    /// one. Routes before it stay registered; a router that failed here
    /// should be discarded.
    pub fn add_routes<I>(&mut self, routes: I) -> Result<(), RegistrationError>
    where
        I: IntoIterator<Item = Route<H>>,
    {
        routes.into_iter().try_for_each(|route| self.add_route(route))
    }

    /// Registers a single route.
    pub fn add_route(&mut self, route: Route<H>) -> Result<(), RegistrationError> {
        let group = self.routes.entry(route.method().clone()).or_default();

        if let Some(existing) = group.iter().find(|existing| existing.same_shape(&route)) {
            tracing::error!(
                route = %route,
                existing = %existing,
                "route conflicts with an existing route"
            );
            return Err(RegistrationError::Conflict {
                method: route.method().clone(),
                path: route.path().to_string(),
                existing_method: existing.method().clone(),
                existing_path: existing.path().to_string(),
            });
        }

        tracing::debug!(method = %route.method(), path = route.path(), "route registered");
        group.push(route);
        Ok(())
    }

    /// Builds a route from a method token and path, then registers it.
    pub fn route(&mut self, method: &str, path: &str, handler: H) -> Result<(), RegistrationError> {
        let route = Route::new(path, method, handler)?;
        self.add_route(route)
    }

    /// Normalizes a request path the way [`Router::resolve`] does.
    ///
    /// Returns `None` when the trailing-slash policy rejects the path.
    pub fn normalize_path<'p>(&self, path: &'p str) -> Option<Cow<'p, str>> {
        normalize_path(path, self.config.trailing_slash)
    }

    /// Resolves a request to a route.
    ///
    /// The path is normalized first (query string dropped, lower-cased,
    /// trailing slash per [`RouterConfig::trailing_slash`]).
    pub fn resolve(&self, method: &Method, path: &str) -> Resolution<'_, H> {
        let Some(path) = normalize_path(path, self.config.trailing_slash) else {
            return Resolution::NotFound;
        };
        let requested = split_segments(&path);

        if let Some(route) = self
            .routes
            .get(method)
            .and_then(|group| most_specific(group, &requested))
        {
            return Resolution::Matched(RouteMatch {
                params: bind_params(route, &requested),
                route,
            });
        }

        let allowed: Vec<Method> = self
            .routes
            .iter()
            .filter(|(other, group)| {
                *other != method && group.iter().any(|route| is_compatible(route, &requested))
            })
            .map(|(other, _)| other.clone())
            .collect();

        if allowed.is_empty() {
            Resolution::NotFound
        } else {
            Resolution::MethodNotAllowed { allowed }
        }
    }

    /// Returns the number of registered routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.values().map(Vec::len).sum()
    }

    /// Returns true if no routes are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates over all routes, grouped by method in registration order.
    pub fn routes(&self) -> impl Iterator<Item = &Route<H>> {
        self.routes.values().flatten()
    }

    /// Iterates over the methods that have at least one route.
    pub fn methods(&self) -> impl Iterator<Item = &Method> {
        self.routes
            .iter()
            .filter(|(_, group)| !group.is_empty())
            .map(|(method, _)| method)
    }
}

/// Checks a route against request segments without binding anything.
fn is_compatible<H>(route: &Route<H>, requested: &[&str]) -> bool {
    route.segments().len() == requested.len()
        && route
            .segments()
            .iter()
            .zip(requested)
            .all(|(pattern, actual)| match pattern {
                Segment::Literal(expected) => expected == actual,
                Segment::Param(_) => true,
            })
}

/// Picks the compatible route with a literal at the leftmost position
/// where candidates differ.
fn most_specific<'a, H>(group: &'a [Route<H>], requested: &[&str]) -> Option<&'a Route<H>> {
    group
        .iter()
        .filter(|route| is_compatible(route, requested))
        .reduce(|best, candidate| {
            if more_specific(candidate, best) {
                candidate
            } else {
                best
            }
        })
}

fn more_specific<H>(candidate: &Route<H>, current: &Route<H>) -> bool {
    for (a, b) in candidate.segments().iter().zip(current.segments()) {
        match (a.is_param(), b.is_param()) {
            (false, true) => return true,
            (true, false) => return false,
            _ => {}
        }
    }
    false
}

fn bind_params<H>(route: &Route<H>, requested: &[&str]) -> Params {
    route
        .segments()
        .iter()
        .zip(requested)
        .filter_map(|(pattern, actual)| match pattern {
            Segment::Param(name) => Some((name.as_str(), *actual)),
            Segment::Literal(_) => None,
        })
        .collect()
}
