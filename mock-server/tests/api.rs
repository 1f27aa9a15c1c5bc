use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::{app, Sample, MAX_BYTES};
use tower::ServiceExt;

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn get(uri: &str) -> Request<String> {
    Request::builder().uri(uri).body(String::new()).unwrap()
}

// --- hello ---

#[tokio::test]
async fn hello_is_plain_text() {
    let resp = app().oneshot(get("/hello")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[http::header::CONTENT_TYPE], "text/plain");
    assert_eq!(body_bytes(resp).await, "hello");
}

// --- status ---

#[tokio::test]
async fn status_returns_requested_code() {
    let resp = app().oneshot(get("/status/500")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_bytes(resp).await, "status 500");
}

#[tokio::test]
async fn status_rejects_out_of_range_code() {
    let resp = app().oneshot(get("/status/1000")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn status_rejects_non_numeric_code() {
    let resp = app().oneshot(get("/status/teapot")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// --- headers ---

#[tokio::test]
async fn headers_are_echoed_as_json() {
    let req = Request::builder()
        .uri("/headers")
        .header("X-Trace", "abc")
        .header(http::header::ACCEPT, "text/html")
        .header(http::header::ACCEPT, "application/json")
        .body(String::new())
        .unwrap();
    let resp = app().oneshot(req).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let seen: serde_json::Map<String, serde_json::Value> = body_json(resp).await;
    assert_eq!(seen["x-trace"], "abc");
    assert_eq!(seen["accept"], "text/html, application/json");
}

// --- echo ---

#[tokio::test]
async fn echo_returns_body_and_content_type() {
    let req = Request::builder()
        .method("POST")
        .uri("/echo")
        .header(http::header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body("a=1&b=2".to_string())
        .unwrap();
    let resp = app().oneshot(req).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers()[http::header::CONTENT_TYPE],
        "application/x-www-form-urlencoded"
    );
    assert_eq!(body_bytes(resp).await, "a=1&b=2");
}

#[tokio::test]
async fn echo_rejects_get() {
    let resp = app().oneshot(get("/echo")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
}

// --- json / html ---

#[tokio::test]
async fn json_returns_sample() {
    let resp = app().oneshot(get("/json")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let sample: Sample = body_json(resp).await;
    assert_eq!(sample.name, "xfer");
    assert_eq!(sample.items, vec![1, 2, 3]);
}

#[tokio::test]
async fn html_is_not_json() {
    let resp = app().oneshot(get("/html")).await.unwrap();

    let content_type = resp.headers()[http::header::CONTENT_TYPE].to_str().unwrap();
    assert!(content_type.starts_with("text/html"));
    let body = body_bytes(resp).await;
    assert!(serde_json::from_slice::<serde_json::Value>(&body).is_err());
}

// --- multi ---

#[tokio::test]
async fn multi_sends_two_set_cookie_headers() {
    let resp = app().oneshot(get("/multi")).await.unwrap();

    let cookies: Vec<_> = resp
        .headers()
        .get_all(http::header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect();
    assert_eq!(cookies, vec!["a=1", "b=2"]);
}

// --- bytes ---

#[tokio::test]
async fn bytes_returns_exact_length() {
    let resp = app().oneshot(get("/bytes/30")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_bytes(resp).await;
    assert_eq!(body.len(), 30);
    assert_eq!(&body[..3], b"abc");
    assert_eq!(body[26], b'a');
}

#[tokio::test]
async fn bytes_refuses_oversized_payloads() {
    let resp = app()
        .oneshot(get(&format!("/bytes/{}", MAX_BYTES + 1)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

// --- redirect ---

#[tokio::test]
async fn redirect_points_at_hello() {
    let resp = app().oneshot(get("/redirect")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(resp.headers()[http::header::LOCATION], "/hello");
}

// --- unknown ---

#[tokio::test]
async fn unknown_route_is_404() {
    let resp = app().oneshot(get("/nope")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
