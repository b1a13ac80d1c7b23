//! Handler types and type erasure.
//!
//! Every route is bound to a [`BoxedHandler`]: an `Arc`'d async function
//! from a body-collected request to a response. Use [`handler_fn`] to turn
//! a plain async function or closure into one.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use http::{Request, Response};
use http_body_util::Full;

/// Body type of every response produced by the server.
pub type ResponseBody = Full<Bytes>;

/// Response produced by handlers.
pub type HttpResponse = Response<ResponseBody>;

/// Request handed to handlers, with its body already collected.
pub type HttpRequest = Request<Bytes>;

/// Future returned by a type-erased handler.
pub type BoxedHandlerFuture = Pin<Box<dyn Future<Output = HttpResponse> + Send>>;

/// A type-erased, shareable request handler.
pub type BoxedHandler = Arc<dyn Fn(HttpRequest) -> BoxedHandlerFuture + Send + Sync>;

/// Wraps an async function into a [`BoxedHandler`].
///
/// # Example
///
/// ```rust
/// use bytes::Bytes;
/// use http::Response;
/// use http_body_util::Full;
/// use trellis_server::{handler_fn, HttpRequest, HttpResponse};
///
/// async fn hello(_req: HttpRequest) -> HttpResponse {
///     Response::new(Full::new(Bytes::from_static(b"hello")))
/// }
///
/// let handler = handler_fn(hello);
/// # let _ = handler;
/// ```
pub fn handler_fn<F, Fut>(f: F) -> BoxedHandler
where
    F: Fn(HttpRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HttpResponse> + Send + 'static,
{
    Arc::new(move |req: HttpRequest| -> BoxedHandlerFuture { Box::pin(f(req)) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;
    use http_body_util::BodyExt;

    #[tokio::test]
    async fn test_handler_fn_invokes_function() {
        let handler = handler_fn(|req: HttpRequest| async move {
            Response::builder()
                .status(StatusCode::CREATED)
                .body(Full::new(req.into_body()))
                .unwrap()
        });

        let response = handler(Request::new(Bytes::from_static(b"echo"))).await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body, Bytes::from_static(b"echo"));
    }

    #[test]
    fn test_handler_is_cloneable() {
        let handler = handler_fn(|_req: HttpRequest| async { Response::new(Full::new(Bytes::new())) });
        let cloned = Arc::clone(&handler);
        assert_eq!(Arc::strong_count(&handler), 2);
        drop(cloned);
    }
}
