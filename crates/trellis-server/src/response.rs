//! Default responses for routing failures.
//!
//! Bodies use the JSON error envelope `{"error": {"code", "message", ...}}`.

use bytes::Bytes;
use http::header::{ALLOW, CONTENT_TYPE};
use http::{Method, Response, StatusCode};
use http_body_util::Full;
use serde_json::{json, Value};

use crate::context::AllowedMethods;
use crate::handler::HttpResponse;

/// Builds a JSON response, falling back to an empty body of the same
/// status if the builder rejects anything.
pub fn json_response(status: StatusCode, body: &Value) -> HttpResponse {
    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, "application/json")
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap_or_else(|_| fallback(status))
}

/// Builds a JSON error envelope response.
pub fn error_response(status: StatusCode, code: &str, message: &str) -> HttpResponse {
    json_response(
        status,
        &json!({
            "error": {
                "code": code,
                "message": message
            }
        }),
    )
}

/// Default 404 response.
pub fn not_found(path: &str) -> HttpResponse {
    json_response(
        StatusCode::NOT_FOUND,
        &json!({
            "error": {
                "code": "NOT_FOUND",
                "message": "route with requested path does not exist",
                "path": path
            }
        }),
    )
}

/// Default 405 response, with an `Allow` header listing `allowed`.
pub fn method_not_allowed(method: &Method, path: &str, allowed: &[Method]) -> HttpResponse {
    let allowed = AllowedMethods(allowed.to_vec());
    let mut response = json_response(
        StatusCode::METHOD_NOT_ALLOWED,
        &json!({
            "error": {
                "code": "METHOD_NOT_ALLOWED",
                "message": "route with requested method does not exist",
                "method": method.as_str(),
                "path": path,
                "allowed": allowed.0.iter().map(Method::as_str).collect::<Vec<_>>()
            }
        }),
    );

    if let Ok(value) = allowed.header_value().parse() {
        response.headers_mut().insert(ALLOW, value);
    }
    response
}

/// Response suitable for a panic handler: a 500 with a generic message.
pub fn default_panic_response() -> HttpResponse {
    error_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "the request handler failed",
    )
}

fn fallback(status: StatusCode) -> HttpResponse {
    let mut response = Response::new(Full::new(Bytes::new()));
    *response.status_mut() = status;
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_json(response: HttpResponse) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_not_found_body() {
        let response = not_found("/v1/unknown");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers()[CONTENT_TYPE], "application/json");

        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "NOT_FOUND");
        assert_eq!(body["error"]["path"], "/v1/unknown");
    }

    #[tokio::test]
    async fn test_method_not_allowed_sets_allow_header() {
        let response = method_not_allowed(&Method::GET, "/v1/comments", &[Method::POST, Method::PUT]);
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()[ALLOW], "POST, PUT");

        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "METHOD_NOT_ALLOWED");
        assert_eq!(body["error"]["method"], "GET");
        assert_eq!(body["error"]["allowed"], json!(["POST", "PUT"]));
    }

    #[tokio::test]
    async fn test_default_panic_response() {
        let response = default_panic_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(response).await["error"]["code"], "INTERNAL_ERROR");
    }

    #[test]
    fn test_error_response_status() {
        let response = error_response(StatusCode::GATEWAY_TIMEOUT, "HANDLER_TIMEOUT", "timed out");
        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    }
}
