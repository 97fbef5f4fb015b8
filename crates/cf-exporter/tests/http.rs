mod common;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::extract::ConnectInfo;
use axum::http::{header, Request, StatusCode};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use cf_exporter::config::{BasicAuth, WebConfig};
use cf_exporter::{router, ApiState, SystemClock};
use common::*;
use tower::ServiceExt;

fn web(auth: Option<BasicAuth>) -> WebConfig {
    WebConfig {
        listen_address: "127.0.0.1:9193".parse().unwrap(),
        telemetry_path: "/metrics".to_string(),
        auth,
        tls: None,
    }
}

fn app(connector: StubConnector, auth: Option<BasicAuth>) -> axum::Router {
    let composer = composer("", Arc::new(connector), Arc::new(SystemClock));
    router(ApiState::new(Arc::new(composer), &web(auth)))
}

fn admin() -> Option<BasicAuth> {
    Some(BasicAuth {
        username: "admin".to_string(),
        password: "s3cret".to_string(),
    })
}

fn get(path: &str) -> Request<Body> {
    Request::builder().uri(path).body(Body::empty()).unwrap()
}

fn get_with_auth(path: &str, user: &str, password: &str) -> Request<Body> {
    let token = STANDARD.encode(format!("{}:{}", user, password));
    Request::builder()
        .uri(path)
        .header(header::AUTHORIZATION, format!("Basic {}", token))
        .body(Body::empty())
        .unwrap()
}

fn from_peer(mut request: Request<Body>, peer: &str) -> Request<Body> {
    let addr: SocketAddr = peer.parse().unwrap();
    request.extensions_mut().insert(ConnectInfo(addr));
    request
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn empty_platform() -> StubConnector {
    StubConnector::new(StubCf::default(), Some(StubBbs::default()))
}

#[tokio::test]
async fn test_metrics_without_auth_configured() {
    let response = app(empty_platform(), None)
        .oneshot(get("/metrics"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap();
    assert!(content_type.starts_with("text/plain"));
    let body = body_text(response).await;
    assert!(body.contains("cf_applications_scrapes_total"));
}

#[tokio::test]
async fn test_missing_credentials_are_challenged() {
    let response = app(empty_platform(), admin())
        .oneshot(get("/metrics"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.headers()[header::WWW_AUTHENTICATE],
        r#"Basic realm="metrics""#
    );
}

#[tokio::test]
async fn test_wrong_password_is_rejected() {
    let response = app(empty_platform(), admin())
        .oneshot(get_with_auth("/metrics", "admin", "guess"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_valid_credentials_scrape() {
    let response = app(empty_platform(), admin())
        .oneshot(get_with_auth("/metrics", "admin", "s3cret"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_repeated_failures_are_rate_limited() {
    let router = app(empty_platform(), admin());
    for _ in 0..5 {
        let response = router
            .clone()
            .oneshot(get_with_auth("/metrics", "admin", "guess"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    let response = router
        .oneshot(get_with_auth("/metrics", "admin", "s3cret"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_lockout_is_keyed_on_peer_address() {
    let router = app(empty_platform(), admin());
    for _ in 0..5 {
        let mut request = from_peer(
            get_with_auth("/metrics", "admin", "guess"),
            "203.0.113.9:40000",
        );
        request
            .headers_mut()
            .insert("x-forwarded-for", "10.0.0.50".parse().unwrap());
        let response = router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    let scraper = from_peer(
        get_with_auth("/metrics", "admin", "s3cret"),
        "10.0.0.50:51000",
    );
    let response = router.clone().oneshot(scraper).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let attacker = from_peer(
        get_with_auth("/metrics", "admin", "s3cret"),
        "203.0.113.9:40001",
    );
    let response = router.oneshot(attacker).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_health_and_index_are_public() {
    let router = app(empty_platform(), admin());

    let health = router.clone().oneshot(get("/health")).await.unwrap();
    assert_eq!(health.status(), StatusCode::OK);
    assert_eq!(body_text(health).await, r#"{"status":"ok"}"#);

    let index = router.oneshot(get("/")).await.unwrap();
    assert_eq!(index.status(), StatusCode::OK);
    let html = body_text(index).await;
    assert!(html.contains("Cloud Foundry Exporter"));
    assert!(html.contains(r#"href="/metrics""#));
}

#[tokio::test]
async fn test_security_headers() {
    let response = app(empty_platform(), None)
        .oneshot(get("/health"))
        .await
        .unwrap();

    let headers = response.headers();
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["x-frame-options"], "DENY");
    assert_eq!(headers[header::CACHE_CONTROL], "no-store");
}

#[tokio::test]
async fn test_bbs_failure_still_answers_ok() {
    let (cf, bbs) = single_app_platform();
    let mut connector = StubConnector::new(cf, Some(bbs));
    connector.bbs_fails = true;

    let response = app(connector, None)
        .oneshot(get("/metrics"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let samples = parse(&body_text(response).await);
    assert_eq!(value(&samples, "cf_last_applications_scrape_error"), Some(1.0));
    assert_eq!(value(&samples, "cf_applications_scrape_errors_total"), Some(1.0));
}
