//! Request path normalization.
//!
//! Incoming paths are brought into the same canonical form that route
//! patterns are stored in before any segment comparison happens: query
//! string and fragment removed, leading slash enforced, trailing slash
//! handled per [`TrailingSlash`], and the whole path lower-cased.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use smallvec::SmallVec;

/// Number of request segments kept on the stack while matching.
const INLINE_SEGMENTS: usize = 8;

/// Request segments borrowed from a normalized path.
pub(crate) type Segments<'a> = SmallVec<[&'a str; INLINE_SEGMENTS]>;

/// How a trailing `/` on an incoming request path is treated.
///
/// Route patterns never carry a trailing slash (they are rejected at
/// construction), so this only concerns requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum TrailingSlash {
    /// `/news/` is looked up as `/news`.
    #[default]
    Strip,
    /// `/news/` never matches anything and resolves to not found.
    Reject,
}

impl fmt::Display for TrailingSlash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Strip => f.write_str("strip"),
            Self::Reject => f.write_str("reject"),
        }
    }
}

/// Error returned when parsing an unknown [`TrailingSlash`] name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown trailing slash policy '{0}', expected 'strip' or 'reject'")]
pub struct ParseTrailingSlashError(String);

impl FromStr for TrailingSlash {
    type Err = ParseTrailingSlashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strip" => Ok(Self::Strip),
            "reject" => Ok(Self::Reject),
            other => Err(ParseTrailingSlashError(other.to_string())),
        }
    }
}

/// Normalizes a request path for matching.
///
/// Returns `None` when the path can never match a route, which only
/// happens for a trailing slash under [`TrailingSlash::Reject`].
///
/// # Example
///
/// ```rust
/// use trellis_router::{normalize_path, TrailingSlash};
///
/// assert_eq!(normalize_path("/News/?page=2", TrailingSlash::Strip).as_deref(), Some("/news"));
/// assert_eq!(normalize_path("", TrailingSlash::Strip).as_deref(), Some("/"));
/// assert_eq!(normalize_path("/news/", TrailingSlash::Reject), None);
/// ```
#[must_use]
pub fn normalize_path(path: &str, trailing_slash: TrailingSlash) -> Option<Cow<'_, str>> {
    let end = path.find(['?', '#']).unwrap_or(path.len());
    let mut path = Cow::Borrowed(&path[..end]);

    if path.is_empty() {
        return Some(Cow::Borrowed("/"));
    }
    if !path.starts_with('/') {
        path = Cow::Owned(format!("/{path}"));
    }
    if path.len() > 1 && path.ends_with('/') {
        match trailing_slash {
            TrailingSlash::Strip => path = strip_last_byte(path),
            TrailingSlash::Reject => return None,
        }
    }

    Some(lowercase(path))
}

/// Lower-cases a path, borrowing when it is already lower-case.
pub(crate) fn lowercase(path: Cow<'_, str>) -> Cow<'_, str> {
    if path.chars().any(|c| c.to_lowercase().ne(std::iter::once(c))) {
        Cow::Owned(path.to_lowercase())
    } else {
        path
    }
}

fn strip_last_byte(path: Cow<'_, str>) -> Cow<'_, str> {
    match path {
        Cow::Borrowed(p) => Cow::Borrowed(&p[..p.len() - 1]),
        Cow::Owned(mut p) => {
            p.pop();
            Cow::Owned(p)
        }
    }
}

/// Splits a normalized path into its segments. The root path has none.
pub(crate) fn split_segments(path: &str) -> Segments<'_> {
    match path.strip_prefix('/') {
        Some("") | None => Segments::new(),
        Some(rest) => rest.split('/').collect(),
    }
}
