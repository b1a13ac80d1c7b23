//! HTTP/1 server on hyper and tokio.
//!
//! Each accepted connection is served on its own task. Requests have their
//! body collected (bounded by the request timeout), are handed to the
//! [`Dispatcher`] and answered with whatever it returns.
//!
//! ```rust,ignore
//! use trellis_router::Route;
//! use trellis_server::{handler_fn, Server};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let server = Server::builder()
//!         .http_addr("0.0.0.0:8080")
//!         .route(Route::get("/news/:id", handler_fn(show_news))?)
//!         .build()?;
//!
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use http::{Request, StatusCode};
use http_body_util::BodyExt;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::{TcpListener, TcpStream};
use trellis_router::{Route, Router};

use crate::config::ServerConfig;
use crate::dispatch::{Dispatcher, RecoveredPanic};
use crate::error::{ServerError, ServerResult};
use crate::handler::{BoxedHandler, HttpResponse};
use crate::response;
use crate::shutdown::{ConnectionTracker, ShutdownSignal};

/// The Trellis HTTP server.
pub struct Server {
    config: ServerConfig,
    dispatcher: Dispatcher,
}

impl Server {
    /// Creates a server builder.
    #[must_use]
    pub fn builder() -> ServerBuilder {
        ServerBuilder::default()
    }

    /// Creates a server around an existing dispatcher.
    ///
    /// The dispatcher's router keeps its own trailing-slash policy.
    #[must_use]
    pub fn new(config: ServerConfig, dispatcher: Dispatcher) -> Self {
        Self { config, dispatcher }
    }

    /// Returns the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Returns the dispatcher.
    #[must_use]
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Binds a listener on the configured address.
    ///
    /// Port `0` picks a free port; read it back with
    /// [`TcpListener::local_addr`].
    pub async fn bind(&self) -> ServerResult<TcpListener> {
        let addr = self
            .config
            .socket_addr()
            .map_err(|source| ServerError::InvalidAddress {
                addr: self.config.http_addr().to_string(),
                source,
            })?;

        TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })
    }

    /// Serves until SIGTERM or SIGINT.
    pub async fn run(self) -> ServerResult<()> {
        let shutdown = ShutdownSignal::with_os_signals();
        self.run_with_shutdown(shutdown).await
    }

    /// Serves until `shutdown` is triggered.
    pub async fn run_with_shutdown(self, shutdown: ShutdownSignal) -> ServerResult<()> {
        let listener = self.bind().await?;
        self.serve(listener, shutdown).await
    }

    /// Serves connections from `listener` until `shutdown` is triggered,
    /// then waits up to the shutdown timeout for open connections to finish.
    pub async fn serve(self, listener: TcpListener, shutdown: ShutdownSignal) -> ServerResult<()> {
        let local_addr = listener.local_addr()?;
        tracing::info!(
            addr = %local_addr,
            routes = self.dispatcher.router().len(),
            "server listening"
        );

        let server = Arc::new(self);
        let tracker = ConnectionTracker::new();

        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, remote_addr)) => {
                        let server = Arc::clone(&server);
                        let token = tracker.acquire();
                        let shutdown = shutdown.clone();

                        tokio::spawn(async move {
                            if let Err(e) = server.handle_connection(stream, remote_addr, shutdown).await {
                                tracing::warn!(remote = %remote_addr, error = %e, "connection error");
                            }
                            drop(token);
                        });
                    }
                    Err(e) => tracing::error!(error = %e, "failed to accept connection"),
                },
                () = shutdown.recv() => {
                    tracing::info!("shutdown signal received, no longer accepting connections");
                    break;
                }
            }
        }
        drop(listener);

        let shutdown_timeout = server.config.shutdown_timeout();
        tracing::info!(
            timeout = ?shutdown_timeout,
            active = tracker.active_connections(),
            "waiting for connections to close"
        );

        if tokio::time::timeout(shutdown_timeout, tracker.wait_idle())
            .await
            .is_err()
        {
            tracing::warn!(
                active = tracker.active_connections(),
                "shutdown timeout reached with connections still open"
            );
        }

        tracing::info!("server stopped");
        Ok(())
    }

    async fn handle_connection(
        self: &Arc<Self>,
        stream: TcpStream,
        remote_addr: SocketAddr,
        shutdown: ShutdownSignal,
    ) -> Result<(), hyper::Error> {
        let io = TokioIo::new(stream);
        let server = Arc::clone(self);

        let service = service_fn(move |req: Request<Incoming>| {
            let server = Arc::clone(&server);
            async move { Ok::<_, Infallible>(server.handle_request(req).await) }
        });

        let conn = http1::Builder::new().serve_connection(io, service);
        tokio::pin!(conn);

        tokio::select! {
            result = conn.as_mut() => result,
            () = shutdown.recv() => {
                tracing::debug!(remote = %remote_addr, "finishing connection for shutdown");
                conn.as_mut().graceful_shutdown();
                conn.await
            }
        }
    }

    async fn handle_request(&self, req: Request<Incoming>) -> HttpResponse {
        let started = Instant::now();
        let method = req.method().clone();
        let path = req.uri().path().to_string();
        let timeout = self.config.request_timeout();

        let (parts, body) = req.into_parts();
        let body = match tokio::time::timeout(timeout, body.collect()).await {
            Ok(Ok(collected)) => collected.to_bytes(),
            Ok(Err(e)) => {
                tracing::warn!(method = %method, path = %path, error = %e, "failed to read request body");
                return response::error_response(
                    StatusCode::BAD_REQUEST,
                    "BODY_READ_ERROR",
                    "failed to read request body",
                );
            }
            Err(_) => {
                tracing::warn!(method = %method, path = %path, "request body timed out");
                return response::error_response(
                    StatusCode::REQUEST_TIMEOUT,
                    "REQUEST_TIMEOUT",
                    "request body was not received in time",
                );
            }
        };

        let req = Request::from_parts(parts, body);
        let response = match tokio::time::timeout(timeout, self.dispatcher.dispatch(req)).await {
            Ok(response) => response,
            Err(_) => {
                tracing::warn!(method = %method, path = %path, "handler timed out");
                response::error_response(
                    StatusCode::GATEWAY_TIMEOUT,
                    "HANDLER_TIMEOUT",
                    "handler did not respond in time",
                )
            }
        };

        tracing::debug!(
            method = %method,
            path = %path,
            status = response.status().as_u16(),
            elapsed = ?started.elapsed(),
            "request completed"
        );
        response
    }
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("config", &self.config)
            .field("dispatcher", &self.dispatcher)
            .finish()
    }
}

/// Builder for [`Server`].
///
/// Routes are registered in [`build`](Self::build) against a router using
/// the configured trailing-slash policy.
#[derive(Default)]
pub struct ServerBuilder {
    config: ServerConfig,
    routes: Vec<Route<BoxedHandler>>,
    not_found: Option<BoxedHandler>,
    method_not_allowed: Option<BoxedHandler>,
    panic_handler: Option<Box<dyn Fn(&RecoveredPanic) -> HttpResponse + Send + Sync>>,
}

impl ServerBuilder {
    /// Replaces the whole server configuration.
    #[must_use]
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the bind address.
    #[must_use]
    pub fn http_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.http_addr = addr.into();
        self
    }

    /// Sets the graceful shutdown timeout.
    #[must_use]
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.config.shutdown_timeout = timeout;
        self
    }

    /// Sets the per-request timeout.
    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    /// Adds a route.
    #[must_use]
    pub fn route(mut self, route: Route<BoxedHandler>) -> Self {
        self.routes.push(route);
        self
    }

    /// Adds routes in order.
    #[must_use]
    pub fn routes(mut self, routes: impl IntoIterator<Item = Route<BoxedHandler>>) -> Self {
        self.routes.extend(routes);
        self
    }

    /// Sets the handler for requests matching no route.
    #[must_use]
    pub fn not_found(mut self, handler: BoxedHandler) -> Self {
        self.not_found = Some(handler);
        self
    }

    /// Sets the handler for paths registered only under other methods.
    #[must_use]
    pub fn method_not_allowed(mut self, handler: BoxedHandler) -> Self {
        self.method_not_allowed = Some(handler);
        self
    }

    /// Enables panic recovery with `handler`.
    #[must_use]
    pub fn panic_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&RecoveredPanic) -> HttpResponse + Send + Sync + 'static,
    {
        self.panic_handler = Some(Box::new(handler));
        self
    }

    /// Registers the routes and builds the server.
    ///
    /// # Errors
    ///
    /// Fails when the configuration is invalid (unparsable address, zero
    /// timeout) or on the first route that conflicts with an earlier one.
    pub fn build(self) -> ServerResult<Server> {
        self.config.validate()?;

        let mut router = Router::with_config(self.config.router_config());
        router.add_routes(self.routes)?;

        let mut dispatcher = Dispatcher::new(router);
        if let Some(handler) = self.not_found {
            dispatcher = dispatcher.with_not_found(handler);
        }
        if let Some(handler) = self.method_not_allowed {
            dispatcher = dispatcher.with_method_not_allowed(handler);
        }
        if let Some(handler) = self.panic_handler {
            dispatcher = dispatcher.with_panic_handler(handler);
        }

        Ok(Server::new(self.config, dispatcher))
    }
}
