//! Request-scoped routing data.
//!
//! The dispatcher stores matched [`Params`] (only when there are any) and,
//! for a custom 405 handler, the [`AllowedMethods`] in the request's
//! [`http::Extensions`]. Extensions are keyed by type, so these types are
//! their own process-wide keys and cannot collide with anything else a
//! middleware puts there.

use http::{Method, Request};
use trellis_router::Params;

/// Methods that would have matched the request path, attached to requests
/// handed to a custom method-not-allowed handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowedMethods(pub Vec<Method>);

impl AllowedMethods {
    /// Formats the methods as an `Allow` header value.
    #[must_use]
    pub fn header_value(&self) -> String {
        self.0
            .iter()
            .map(Method::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Returns the path parameters bound by the router, if any.
///
/// Requests for routes without parameter segments carry none.
pub fn path_params<B>(req: &Request<B>) -> Option<&Params> {
    req.extensions().get::<Params>()
}

/// Convenience accessors for routing data on a request.
pub trait RequestParamsExt {
    /// Returns the path parameters bound by the router, if any.
    fn path_params(&self) -> Option<&Params>;

    /// Returns a single path parameter by name.
    fn path_param(&self, name: &str) -> Option<&str> {
        self.path_params().and_then(|params| params.get(name))
    }

    /// Returns the allowed methods attached for a method-not-allowed handler.
    fn allowed_methods(&self) -> Option<&AllowedMethods>;
}

impl<B> RequestParamsExt for Request<B> {
    fn path_params(&self) -> Option<&Params> {
        path_params(self)
    }

    fn allowed_methods(&self) -> Option<&AllowedMethods> {
        self.extensions().get::<AllowedMethods>()
    }
}
