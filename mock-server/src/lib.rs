use std::collections::BTreeMap;

use axum::{
    body::Bytes,
    extract::Path,
    http::{header, HeaderMap, StatusCode},
    response::{AppendHeaders, Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;

/// Largest payload `/bytes/{n}` will produce.
pub const MAX_BYTES: usize = 1 << 20;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub name: String,
    pub items: Vec<u32>,
}

pub fn app() -> Router {
    Router::new()
        .route("/hello", get(hello))
        .route("/status/{code}", get(status))
        .route("/headers", get(echo_headers))
        .route("/echo", post(echo_body))
        .route("/json", get(json))
        .route("/html", get(html))
        .route("/multi", get(multi))
        .route("/bytes/{n}", get(bytes))
        .route("/redirect", get(redirect))
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn hello() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/plain")], "hello")
}

async fn status(Path(code): Path<u16>) -> Result<Response, StatusCode> {
    let status = StatusCode::from_u16(code).map_err(|_| StatusCode::BAD_REQUEST)?;
    tracing::debug!(%status, "answering with requested status");
    Ok((
        status,
        [(header::CONTENT_TYPE, "text/plain")],
        format!("status {code}"),
    )
        .into_response())
}

/// Request headers as a JSON object; repeated names are joined with ", ".
async fn echo_headers(headers: HeaderMap) -> Json<BTreeMap<String, String>> {
    let mut seen: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in &headers {
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        seen.entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert(value);
    }
    Json(seen)
}

async fn echo_body(headers: HeaderMap, body: Bytes) -> impl IntoResponse {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream")
        .to_string();
    tracing::debug!(len = body.len(), %content_type, "echoing body");
    ([(header::CONTENT_TYPE, content_type)], body)
}

async fn json() -> Json<Sample> {
    Json(Sample {
        name: "xfer".to_string(),
        items: vec![1, 2, 3],
    })
}

async fn html() -> Html<&'static str> {
    Html("<html><body><h1>not json</h1></body></html>")
}

async fn multi() -> impl IntoResponse {
    (
        AppendHeaders([(header::SET_COOKIE, "a=1"), (header::SET_COOKIE, "b=2")]),
        [(header::CONTENT_TYPE, "text/plain")],
        "two cookies",
    )
}

async fn bytes(Path(n): Path<usize>) -> Result<impl IntoResponse, StatusCode> {
    if n > MAX_BYTES {
        return Err(StatusCode::PAYLOAD_TOO_LARGE);
    }
    let body: Vec<u8> = (0..n).map(|i| b'a' + (i % 26) as u8).collect();
    Ok(([(header::CONTENT_TYPE, "application/octet-stream")], body))
}

async fn redirect() -> impl IntoResponse {
    (StatusCode::FOUND, [(header::LOCATION, "/hello")])
}
