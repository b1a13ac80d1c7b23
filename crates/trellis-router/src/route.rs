//! Validated route definitions.
//!
//! A [`Route`] is one normalized `(method, path pattern)` pair plus an
//! opaque handler. Patterns are validated and lower-cased once, at
//! construction; a `Route` never changes afterwards.

use std::borrow::Cow;
use std::fmt;

use http::Method;

use crate::error::RouteError;
use crate::path::lowercase;

/// Leading character marking a parameter segment (`/news/:id`).
pub const PARAM_SIGIL: char = ':';

/// One segment of a route pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// Literal segment matched by exact comparison (e.g. `news`).
    Literal(String),
    /// Named parameter matching any single segment (e.g. `:id`).
    Param(String),
}

impl Segment {
    fn parse(raw: &str) -> Self {
        match raw.strip_prefix(PARAM_SIGIL) {
            Some(name) => Self::Param(name.to_string()),
            None => Self::Literal(raw.to_string()),
        }
    }

    /// Returns `true` for a parameter segment.
    #[must_use]
    pub fn is_param(&self) -> bool {
        matches!(self, Self::Param(_))
    }

    /// Structural equality: equal literals, or two parameters whatever
    /// their names.
    pub(crate) fn same_shape(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Literal(a), Self::Literal(b)) => a == b,
            (Self::Param(_), Self::Param(_)) => true,
            _ => false,
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(s) => f.write_str(s),
            Self::Param(name) => write!(f, "{PARAM_SIGIL}{name}"),
        }
    }
}

/// A registered `(method, path pattern)` pair bound to a handler.
///
/// # Example
///
/// ```rust
/// use trellis_router::{Route, Segment};
///
/// let route = Route::new("/News/:id", "GET", "showNews").unwrap();
///
/// assert_eq!(route.path(), "/news/:id");
/// assert_eq!(route.method(), "GET");
/// assert_eq!(route.segments()[1], Segment::Param("id".to_string()));
/// assert_eq!(*route.handler(), "showNews");
///
/// assert!(Route::new("/news/", "GET", ()).is_err());
/// ```
#[derive(Clone)]
pub struct Route<H> {
    path: String,
    method: Method,
    segments: Vec<Segment>,
    handler: H,
}

impl<H> Route<H> {
    /// Creates a route from a path pattern and a method token.
    ///
    /// The path must be non-empty, start with `/`, contain no `?` or `#`,
    /// have no trailing `/` (unless it is `/`), no empty segments and no
    /// unnamed parameters. It is stored lower-cased. The method is kept
    /// verbatim and compared case-sensitively. Path errors are reported
    /// before method errors.
    pub fn new(path: &str, method: &str, handler: H) -> Result<Self, RouteError> {
        let path = validate_path(path)?;
        if method.is_empty() {
            return Err(RouteError::EmptyMethod);
        }
        let method = Method::from_bytes(method.as_bytes()).map_err(|_| RouteError::InvalidMethod {
            method: method.to_string(),
        })?;

        Ok(Self::from_parts(path, method, handler))
    }

    /// Creates a route for an already-parsed method.
    pub fn with_method(path: &str, method: Method, handler: H) -> Result<Self, RouteError> {
        let path = validate_path(path)?;
        Ok(Self::from_parts(path, method, handler))
    }

    fn from_parts(path: String, method: Method, handler: H) -> Self {
        let segments = parse_segments(&path);

        Self {
            path,
            method,
            segments,
            handler,
        }
    }

    /// Creates a `GET` route.
    pub fn get(path: &str, handler: H) -> Result<Self, RouteError> {
        Self::with_method(path, Method::GET, handler)
    }

    /// Creates a `POST` route.
    pub fn post(path: &str, handler: H) -> Result<Self, RouteError> {
        Self::with_method(path, Method::POST, handler)
    }

    /// Creates a `PUT` route.
    pub fn put(path: &str, handler: H) -> Result<Self, RouteError> {
        Self::with_method(path, Method::PUT, handler)
    }

    /// Creates a `PATCH` route.
    pub fn patch(path: &str, handler: H) -> Result<Self, RouteError> {
        Self::with_method(path, Method::PATCH, handler)
    }

    /// Creates a `DELETE` route.
    pub fn delete(path: &str, handler: H) -> Result<Self, RouteError> {
        Self::with_method(path, Method::DELETE, handler)
    }

    /// Returns the normalized path pattern.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the method this route answers to.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the parsed pattern segments. Empty for the root path.
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Returns the handler bound to this route.
    #[must_use]
    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// Returns `true` if this is the root route `/`.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Returns `true` if `other` has exactly the same shape as this route.
    pub(crate) fn same_shape<T>(&self, other: &Route<T>) -> bool {
        self.segments.len() == other.segments.len()
            && self
                .segments
                .iter()
                .zip(&other.segments)
                .all(|(a, b)| a.same_shape(b))
    }
}

impl<H> fmt::Debug for Route<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl<H> fmt::Display for Route<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

fn validate_path(path: &str) -> Result<String, RouteError> {
    if path.is_empty() {
        return Err(RouteError::EmptyPath);
    }
    if !path.starts_with('/') {
        return Err(RouteError::MissingLeadingSlash {
            path: path.to_string(),
        });
    }
    if path.contains('?') {
        return Err(RouteError::QueryInPath {
            path: path.to_string(),
        });
    }
    if path.contains('#') {
        return Err(RouteError::FragmentInPath {
            path: path.to_string(),
        });
    }
    if path == "/" {
        return Ok(path.to_string());
    }
    if path.ends_with('/') {
        return Err(RouteError::TrailingSlash {
            path: path.to_string(),
        });
    }
    for raw in path[1..].split('/') {
        if raw.is_empty() {
            return Err(RouteError::EmptySegment {
                path: path.to_string(),
            });
        }
        if raw == ":" {
            return Err(RouteError::EmptyParameterName {
                path: path.to_string(),
            });
        }
    }

    Ok(lowercase(Cow::Borrowed(path)).into_owned())
}

fn parse_segments(path: &str) -> Vec<Segment> {
    if path == "/" {
        return Vec::new();
    }
    path[1..].split('/').map(Segment::parse).collect()
}
