//! A small news API served by Trellis.
//!
//! ```text
//! cargo run -p trellis-server --example news
//! curl localhost:8080/news/42
//! curl -X DELETE localhost:8080/news       # 405, Allow: GET, POST
//! ```
//!
//! Configuration is read from `trellis.toml` when present and from
//! `TRELLIS__*` environment variables.

use anyhow::Context as _;
use bytes::Bytes;
use http::{Response, StatusCode};
use http_body_util::Full;
use serde_json::json;
use trellis_router::Route;
use trellis_server::{
    handler_fn, init_logging, response, ConfigLoader, HttpRequest, HttpResponse, RequestParamsExt,
    Server,
};

async fn index(_req: HttpRequest) -> HttpResponse {
    response::json_response(StatusCode::OK, &json!({ "service": "news" }))
}

async fn list_news(_req: HttpRequest) -> HttpResponse {
    response::json_response(StatusCode::OK, &json!({ "news": [1, 2, 3] }))
}

async fn news_statistics(_req: HttpRequest) -> HttpResponse {
    response::json_response(StatusCode::OK, &json!({ "total": 3 }))
}

async fn show_news(req: HttpRequest) -> HttpResponse {
    let id = req.path_param("id").unwrap_or_default();
    response::json_response(StatusCode::OK, &json!({ "id": id }))
}

async fn show_comment(req: HttpRequest) -> HttpResponse {
    let params = req.path_params().cloned().unwrap_or_default();
    let body: serde_json::Map<_, _> = params
        .iter()
        .map(|(name, value)| (name.to_string(), json!(value)))
        .collect();
    response::json_response(StatusCode::OK, &serde_json::Value::Object(body))
}

async fn create_news(req: HttpRequest) -> HttpResponse {
    Response::builder()
        .status(StatusCode::CREATED)
        .body(Full::new(req.into_body()))
        .unwrap_or_else(|_| Response::new(Full::new(Bytes::new())))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ConfigLoader::new()
        .with_optional_file("trellis.toml")?
        .load()
        .context("loading configuration")?;
    init_logging(&config.logging)?;

    let server = Server::builder()
        .config(config.server)
        .routes([
            Route::get("/", handler_fn(index))?,
            Route::get("/news", handler_fn(list_news))?,
            Route::post("/news", handler_fn(create_news))?,
            Route::get("/news/statistics", handler_fn(news_statistics))?,
            Route::get("/news/:id", handler_fn(show_news))?,
            Route::get("/news/:news_id/comments/:comment_id", handler_fn(show_comment))?,
        ])
        .panic_handler(|_panic| response::default_panic_response())
        .build()
        .context("registering routes")?;

    server.run().await?;
    Ok(())
}
