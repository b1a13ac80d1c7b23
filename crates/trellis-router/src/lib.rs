//! Method-grouped HTTP router for Trellis.
//!
//! This crate decides which handler answers a `(method, path)` request. It
//! knows nothing about HTTP I/O: handlers are an opaque type parameter and
//! resolution is a synchronous scan over immutable data, so a fully
//! registered [`Router`] can be shared between any number of threads.
//!
//! # Features
//!
//! - **Validated routes**: malformed patterns are rejected when the
//!   [`Route`] is built, never coerced
//! - **Conflict detection**: two routes of the same shape under one method
//!   cannot both be registered
//! - **Path parameters**: `:name` segments bind the matching request segment
//! - **404 vs 405**: [`Resolution`] tells "no such path" apart from "path
//!   exists under another method"
//!
//! # Example
//!
//! ```rust
//! use http::Method;
//! use trellis_router::{Resolution, Route, Router};
//!
//! let mut router = Router::new();
//! router
//!     .add_routes([
//!         Route::get("/", "index").unwrap(),
//!         Route::get("/news/:id", "showNews").unwrap(),
//!         Route::get("/news/statistics", "newsStats").unwrap(),
//!     ])
//!     .unwrap();
//!
//! match router.resolve(&Method::GET, "/news/statistics") {
//!     Resolution::Matched(m) => assert_eq!(*m.handler(), "newsStats"),
//!     _ => unreachable!(),
//! }
//! ```
//!
//! # Matching
//!
//! ```text
//!   request ──► normalize ──► split ──► scan own method group
//!                                           │
//!                           match ◄─────────┤ none
//!                                           ▼
//!                                 scan other method groups
//!                                           │
//!                    MethodNotAllowed ◄─────┤ none
//!                                           ▼
//!                                       NotFound
//! ```

#![forbid(unsafe_code)]

mod error;
mod params;
mod path;
mod route;
mod router;

pub use error::{RegistrationError, RouteError};
pub use params::Params;
pub use path::{normalize_path, ParseTrailingSlashError, TrailingSlash};
pub use route::{Route, Segment, PARAM_SIGIL};
pub use router::{Resolution, RouteMatch, Router, RouterConfig};
