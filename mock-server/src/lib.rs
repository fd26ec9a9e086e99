//! Deterministic local HTTP server for client integration tests.
//!
//! Stateless — every endpoint computes its response from the request
//! alone, so tests can share one server instance freely:
//! - `GET /text` returns a fixed plaintext body with a content-type header.
//! - `POST /echo` returns the request body unchanged, propagating the
//!   request's content-type.
//! - `GET /slow/{ms}` sleeps for the given number of milliseconds before
//!   responding, for exercising read-phase timeouts.
//! - `GET /redirect` issues a 302 to `/text`; `GET /redirect/loop`
//!   redirects to itself forever.
//! - `POST /relocate` issues a 302 to `/reflect`, which reports the
//!   content-type it received (or `none`), for observing what a client
//!   carries across a method-rewriting redirect.

use std::time::Duration;

use axum::{
    body::Bytes,
    extract::Path,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;

pub fn app() -> Router {
    Router::new()
        .route("/text", get(text))
        .route("/echo", post(echo))
        .route("/slow/{ms}", get(slow))
        .route("/redirect", get(redirect))
        .route("/redirect/loop", get(redirect_loop))
        .route("/relocate", post(relocate))
        .route("/reflect", get(reflect))
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn text() -> &'static str {
    "Hello from the mock server!"
}

async fn echo(headers: HeaderMap, body: Bytes) -> Response {
    let mut response = body.into_response();
    if let Some(content_type) = headers.get(header::CONTENT_TYPE) {
        response
            .headers_mut()
            .insert(header::CONTENT_TYPE, content_type.clone());
    }
    response
}

async fn slow(Path(ms): Path<u64>) -> &'static str {
    tokio::time::sleep(Duration::from_millis(ms)).await;
    "finally"
}

async fn redirect() -> impl IntoResponse {
    (StatusCode::FOUND, [(header::LOCATION, "/text")])
}

async fn redirect_loop() -> impl IntoResponse {
    (StatusCode::FOUND, [(header::LOCATION, "/redirect/loop")])
}

async fn relocate() -> impl IntoResponse {
    (StatusCode::FOUND, [(header::LOCATION, "/reflect")])
}

async fn reflect(headers: HeaderMap) -> String {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("none")
        .to_string()
}
