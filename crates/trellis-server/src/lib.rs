//! # Trellis Server
//!
//! Serves a [`trellis_router::Router`] over HTTP/1.1 with hyper and tokio.
//!
//! - [`Dispatcher`]: resolves each request and delivers the outcome
//!   (handler, 404, or 405 with `Allow`), with optional panic recovery
//! - [`Server`]: accept loop, request timeouts, graceful shutdown
//! - [`ConfigLoader`]: defaults, then a TOML file, then `TRELLIS__*`
//!   environment overrides
//! - [`init_logging`]: JSON or pretty `tracing` output
//!
//! Handlers read bound path parameters from the request extensions:
//!
//! ```rust
//! use bytes::Bytes;
//! use http::Response;
//! use http_body_util::Full;
//! use trellis_server::{HttpRequest, HttpResponse, RequestParamsExt};
//!
//! async fn show_news(req: HttpRequest) -> HttpResponse {
//!     let id = req.path_param("id").unwrap_or_default().to_string();
//!     Response::new(Full::new(Bytes::from(id)))
//! }
//! ```

#![forbid(unsafe_code)]

pub mod config;
mod context;
mod dispatch;
pub mod error;
mod handler;
mod loader;
pub mod logging;
pub mod response;
mod server;
pub mod shutdown;

pub use config::{LogConfig, LogFormat, ServerConfig, ServerConfigBuilder, TrellisConfig};
pub use context::{path_params, AllowedMethods, RequestParamsExt};
pub use dispatch::{Dispatcher, PanicHandler, RecoveredPanic};
pub use error::{ConfigError, ConfigResult, ServerError, ServerResult};
pub use handler::{handler_fn, BoxedHandler, BoxedHandlerFuture, HttpRequest, HttpResponse, ResponseBody};
pub use loader::{ConfigLoader, DEFAULT_ENV_PREFIX};
pub use logging::init_logging;
pub use server::{Server, ServerBuilder};
pub use shutdown::{ConnectionToken, ConnectionTracker, ShutdownSignal};
