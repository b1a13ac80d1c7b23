//! Turning a [`Resolution`] into a response.
//!
//! The [`Dispatcher`] owns the fully registered router and the optional
//! overrides for "not found", "method not allowed" and panics. It is built
//! once, wrapped in an `Arc` and shared by every connection task.

use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use http::{Method, Uri};
use trellis_router::{Resolution, Router};

use crate::context::AllowedMethods;
use crate::handler::{BoxedHandler, HttpRequest, HttpResponse};
use crate::response;

/// Builds the response for a request whose handler panicked.
pub type PanicHandler = Arc<dyn Fn(&RecoveredPanic) -> HttpResponse + Send + Sync>;

/// A panic caught while running a request handler.
pub struct RecoveredPanic {
    /// Method of the request being handled.
    pub method: Method,
    /// URI of the request being handled.
    pub uri: Uri,
    /// The value the handler panicked with.
    pub payload: Box<dyn Any + Send>,
}

impl RecoveredPanic {
    /// Returns the panic message when the payload is a string.
    pub fn message(&self) -> Option<&str> {
        self.payload
            .downcast_ref::<&'static str>()
            .copied()
            .or_else(|| self.payload.downcast_ref::<String>().map(String::as_str))
    }
}

impl fmt::Debug for RecoveredPanic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecoveredPanic")
            .field("method", &self.method)
            .field("uri", &self.uri)
            .field("message", &self.message())
            .finish_non_exhaustive()
    }
}

/// Routes requests to handlers and delivers the routing outcome.
///
/// # Example
///
/// ```rust
/// use bytes::Bytes;
/// use http::{Request, StatusCode};
/// use trellis_router::{Route, Router};
/// use trellis_server::{handler_fn, response, Dispatcher, HttpRequest};
///
/// # tokio_test::block_on(async {
/// let mut router = Router::new();
/// router
///     .add_route(Route::get("/health", handler_fn(|_req: HttpRequest| async {
///         response::error_response(StatusCode::OK, "OK", "healthy")
///     }))?)?;
///
/// let dispatcher = Dispatcher::new(router);
/// let resp = dispatcher.dispatch(Request::new(Bytes::new())).await;
/// assert_eq!(resp.status(), StatusCode::NOT_FOUND);
/// # Ok::<(), trellis_router::RegistrationError>(())
/// # }).unwrap();
/// ```
pub struct Dispatcher {
    router: Router<BoxedHandler>,
    not_found: Option<BoxedHandler>,
    method_not_allowed: Option<BoxedHandler>,
    panic_handler: Option<PanicHandler>,
}

impl Dispatcher {
    /// Creates a dispatcher with the default 404 and 405 responses and no
    /// panic recovery.
    #[must_use]
    pub fn new(router: Router<BoxedHandler>) -> Self {
        Self {
            router,
            not_found: None,
            method_not_allowed: None,
            panic_handler: None,
        }
    }

    /// Uses `handler` for requests that match no route.
    pub fn with_not_found(mut self, handler: BoxedHandler) -> Self {
        self.not_found = Some(handler);
        self
    }

    /// Uses `handler` for requests whose path exists only under other
    /// methods. The request carries [`AllowedMethods`] in its extensions.
    pub fn with_method_not_allowed(mut self, handler: BoxedHandler) -> Self {
        self.method_not_allowed = Some(handler);
        self
    }

    /// Catches panics raised by handlers and answers with `handler`.
    ///
    /// Without a panic handler a panicking handler unwinds into the
    /// connection task.
    pub fn with_panic_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&RecoveredPanic) -> HttpResponse + Send + Sync + 'static,
    {
        self.panic_handler = Some(Arc::new(handler));
        self
    }

    /// Returns the router.
    pub fn router(&self) -> &Router<BoxedHandler> {
        &self.router
    }

    /// Resolves the request and runs the chosen handler.
    pub async fn dispatch(&self, req: HttpRequest) -> HttpResponse {
        let Some(panic_handler) = &self.panic_handler else {
            return self.route(req).await;
        };

        let method = req.method().clone();
        let uri = req.uri().clone();

        match AssertUnwindSafe(self.route(req)).catch_unwind().await {
            Ok(response) => response,
            Err(payload) => {
                let panic = RecoveredPanic {
                    method,
                    uri,
                    payload,
                };
                tracing::error!(
                    method = %panic.method,
                    uri = %panic.uri,
                    message = panic.message().unwrap_or("<non-string panic payload>"),
                    "request handler panicked"
                );
                panic_handler(&panic)
            }
        }
    }

    async fn route(&self, mut req: HttpRequest) -> HttpResponse {
        let resolution = self.router.resolve(req.method(), req.uri().path());

        match resolution {
            Resolution::Matched(route_match) => {
                tracing::debug!(
                    method = %req.method(),
                    path = req.uri().path(),
                    route = %route_match.route,
                    "route matched"
                );
                let handler = Arc::clone(route_match.handler());
                if !route_match.params.is_empty() {
                    req.extensions_mut().insert(route_match.params);
                }
                handler(req).await
            }
            Resolution::NotFound => {
                tracing::debug!(method = %req.method(), path = req.uri().path(), "route not found");
                match &self.not_found {
                    Some(handler) => handler(req).await,
                    None => response::not_found(req.uri().path()),
                }
            }
            Resolution::MethodNotAllowed { allowed } => {
                tracing::debug!(
                    method = %req.method(),
                    path = req.uri().path(),
                    allowed = ?allowed,
                    "method not allowed"
                );
                match &self.method_not_allowed {
                    Some(handler) => {
                        req.extensions_mut().insert(AllowedMethods(allowed));
                        handler(req).await
                    }
                    None => response::method_not_allowed(req.method(), req.uri().path(), &allowed),
                }
            }
        }
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("routes", &self.router.len())
            .field("custom_not_found", &self.not_found.is_some())
            .field("custom_method_not_allowed", &self.method_not_allowed.is_some())
            .field("panic_recovery", &self.panic_handler.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RequestParamsExt;
    use crate::handler::handler_fn;
    use bytes::Bytes;
    use http::header::ALLOW;
    use http::{Request, Response, StatusCode};
    use http_body_util::{BodyExt, Full};
    use trellis_router::Route;

    fn text(status: StatusCode, body: impl Into<Bytes>) -> HttpResponse {
        Response::builder()
            .status(status)
            .body(Full::new(body.into()))
            .unwrap()
    }

    fn request(method: Method, uri: &str) -> HttpRequest {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Bytes::new())
            .unwrap()
    }

    async fn body_string(response: HttpResponse) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    async fn explode(_req: HttpRequest) -> HttpResponse {
        panic!("handler exploded")
    }

    fn news_dispatcher() -> Dispatcher {
        let mut router = Router::new();
        router
            .add_routes([
                Route::get(
                    "/news/:id",
                    handler_fn(|req: HttpRequest| async move {
                        let id = req.path_param("id").unwrap_or("none").to_string();
                        text(StatusCode::OK, format!("news {id}"))
                    }),
                )
                .unwrap(),
                Route::get(
                    "/news",
                    handler_fn(|req: HttpRequest| async move {
                        let has_params = req.path_params().is_some();
                        text(StatusCode::OK, format!("list params={has_params}"))
                    }),
                )
                .unwrap(),
                Route::post(
                    "/v1/comments",
                    handler_fn(|_req: HttpRequest| async { text(StatusCode::CREATED, "created") }),
                )
                .unwrap(),
                Route::get("/panic", handler_fn(explode)).unwrap(),
            ])
            .unwrap();
        Dispatcher::new(router)
    }

    #[tokio::test]
    async fn test_dispatch_passes_params_through_extensions() {
        let dispatcher = news_dispatcher();

        let response = dispatcher.dispatch(request(Method::GET, "/news/42?page=1")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "news 42");
    }

    #[tokio::test]
    async fn test_dispatch_without_params_leaves_extensions_empty() {
        let dispatcher = news_dispatcher();

        let response = dispatcher.dispatch(request(Method::GET, "/news")).await;
        assert_eq!(body_string(response).await, "list params=false");
    }

    #[tokio::test]
    async fn test_dispatch_default_not_found() {
        let dispatcher = news_dispatcher();

        let response = dispatcher.dispatch(request(Method::GET, "/v1/unknown")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(body_string(response).await.contains("NOT_FOUND"));
    }

    #[tokio::test]
    async fn test_dispatch_default_method_not_allowed() {
        let dispatcher = news_dispatcher();

        let response = dispatcher.dispatch(request(Method::GET, "/v1/comments")).await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()[ALLOW], "POST");
    }

    #[tokio::test]
    async fn test_dispatch_custom_not_found() {
        let dispatcher = news_dispatcher().with_not_found(handler_fn(|req: HttpRequest| async move {
            text(StatusCode::NOT_FOUND, format!("nothing at {}", req.uri().path()))
        }));

        let response = dispatcher.dispatch(request(Method::GET, "/missing")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_string(response).await, "nothing at /missing");
    }

    #[tokio::test]
    async fn test_dispatch_custom_method_not_allowed_sees_allowed_methods() {
        let dispatcher =
            news_dispatcher().with_method_not_allowed(handler_fn(|req: HttpRequest| async move {
                let allowed = req
                    .allowed_methods()
                    .map(AllowedMethods::header_value)
                    .unwrap_or_default();
                text(StatusCode::METHOD_NOT_ALLOWED, allowed)
            }));

        let response = dispatcher.dispatch(request(Method::DELETE, "/v1/comments")).await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(body_string(response).await, "POST");
    }

    #[tokio::test]
    async fn test_dispatch_recovers_panic_with_handler() {
        let dispatcher = news_dispatcher().with_panic_handler(|panic: &RecoveredPanic| {
            assert_eq!(panic.method, Method::GET);
            assert_eq!(panic.uri.path(), "/panic");
            assert_eq!(panic.message(), Some("handler exploded"));
            response::default_panic_response()
        });

        let response = dispatcher.dispatch(request(Method::GET, "/panic")).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        // Dispatcher stays usable after a recovered panic.
        let response = dispatcher.dispatch(request(Method::GET, "/news/7")).await;
        assert_eq!(body_string(response).await, "news 7");
    }

    #[tokio::test]
    async fn test_dispatch_panic_propagates_without_handler() {
        let dispatcher = Arc::new(news_dispatcher());

        let task = tokio::spawn({
            let dispatcher = Arc::clone(&dispatcher);
            async move { dispatcher.dispatch(request(Method::GET, "/panic")).await }
        });

        let err = task.await.unwrap_err();
        assert!(err.is_panic());
    }

    #[test]
    fn test_recovered_panic_message_from_string() {
        let panic = RecoveredPanic {
            method: Method::GET,
            uri: Uri::from_static("/"),
            payload: Box::new(String::from("formatted 1")),
        };
        assert_eq!(panic.message(), Some("formatted 1"));

        let opaque = RecoveredPanic {
            method: Method::GET,
            uri: Uri::from_static("/"),
            payload: Box::new(7_u32),
        };
        assert_eq!(opaque.message(), None);
    }

    #[test]
    fn test_dispatcher_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Dispatcher>();
    }
}
