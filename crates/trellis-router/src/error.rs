//! Route construction and registration errors.
//!
//! Both error kinds describe programming mistakes in the route table, so
//! callers are expected to abort startup rather than recover from them.

use http::Method;
use thiserror::Error;

/// Reasons a path pattern or method is refused by [`Route::new`](crate::Route::new).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    /// The path pattern was empty.
    #[error("route path cannot be empty")]
    EmptyPath,

    /// The path pattern did not begin with `/`.
    #[error("route path must start with '/': {path}")]
    MissingLeadingSlash {
        /// The offending path.
        path: String,
    },

    /// The path pattern contained a query separator.
    #[error("route path cannot contain '?': {path}")]
    QueryInPath {
        /// The offending path.
        path: String,
    },

    /// The path pattern contained a fragment separator.
    #[error("route path cannot contain '#': {path}")]
    FragmentInPath {
        /// The offending path.
        path: String,
    },

    /// The path pattern ended with `/` and was not the root path.
    #[error("route path cannot end with '/': {path}")]
    TrailingSlash {
        /// The offending path.
        path: String,
    },

    /// The path pattern contained an empty segment (`//`).
    #[error("route path contains an empty segment: {path}")]
    EmptySegment {
        /// The offending path.
        path: String,
    },

    /// A parameter segment had no name after the `:` sigil.
    #[error("route path contains a parameter without a name: {path}")]
    EmptyParameterName {
        /// The offending path.
        path: String,
    },

    /// The method token was empty.
    #[error("route method cannot be empty")]
    EmptyMethod,

    /// The method token was not a valid HTTP method.
    #[error("invalid route method: {method}")]
    InvalidMethod {
        /// The offending method token.
        method: String,
    },
}

/// Errors produced while adding routes to a [`Router`](crate::Router).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    /// The new route has the same shape as one already registered under
    /// the same method.
    #[error(
        "route {method} {path} intersects with an existing one {existing_method} {existing_path} and cannot be registered"
    )]
    Conflict {
        /// Method of the rejected route.
        method: Method,
        /// Normalized path of the rejected route.
        path: String,
        /// Method of the route already registered.
        existing_method: Method,
        /// Normalized path of the route already registered.
        existing_path: String,
    },

    /// The route could not be constructed.
    #[error(transparent)]
    InvalidRoute(#[from] RouteError),
}
