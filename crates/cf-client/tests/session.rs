//! End-to-end tests of `CfSession` and `BbsClient` against an in-process HTTP
//! server standing in for Cloud Controller, UAA and BBS.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use cf_client::{
    BbsApi, BbsClient, BbsConfig, CfApi, CfSession, Credentials, RetryConfig, SessionConfig,
};
use serde_json::{json, Value};
use std::collections::HashMap;

#[derive(Clone)]
struct FakeCf {
    base: String,
    stack_calls: Arc<AtomicU32>,
    token_calls: Arc<AtomicU32>,
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(|v| v == "Bearer test-token")
        .unwrap_or(false)
}

async fn root(State(cf): State<FakeCf>) -> Json<Value> {
    Json(json!({ "links": { "uaa": { "href": cf.base }, "login": { "href": cf.base } } }))
}

async fn token(State(cf): State<FakeCf>) -> Json<Value> {
    cf.token_calls.fetch_add(1, Ordering::SeqCst);
    Json(json!({ "access_token": "test-token", "token_type": "bearer", "expires_in": 3600 }))
}

async fn apps(
    State(cf): State<FakeCf>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    if query.get("per_page").map(String::as_str) != Some("5000") {
        return StatusCode::BAD_REQUEST.into_response();
    }
    let body = if query.get("page").map(String::as_str) == Some("2") {
        json!({
            "pagination": { "total_results": 2, "total_pages": 2, "next": null },
            "resources": [{ "guid": "app2", "name": "worker", "state": "STOPPED" }]
        })
    } else {
        json!({
            "pagination": {
                "total_results": 2,
                "total_pages": 2,
                "next": { "href": format!("{}/v3/apps?page=2&per_page=5000", cf.base) }
            },
            "resources": [{
                "guid": "app1",
                "name": "web",
                "state": "STARTED",
                "relationships": { "space": { "data": { "guid": "sp1" } } },
                "lifecycle": { "type": "buildpack", "data": { "stack": "cflinuxfs4", "buildpacks": [] } }
            }]
        })
    };
    Json(body).into_response()
}

async fn stacks(State(cf): State<FakeCf>, headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    if cf.stack_calls.fetch_add(1, Ordering::SeqCst) == 0 {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }
    Json(json!({
        "pagination": { "total_results": 1, "total_pages": 1, "next": null },
        "resources": [{ "guid": "st1", "name": "cflinuxfs4" }]
    }))
    .into_response()
}

async fn space_summary(Path(guid): Path<String>) -> Response {
    if guid == "gone" {
        return StatusCode::NOT_FOUND.into_response();
    }
    Json(json!({
        "guid": guid,
        "name": "dev",
        "apps": [{ "guid": "app1", "name": "web", "running_instances": 2, "instances": 2 }]
    }))
    .into_response()
}

async fn broken() -> StatusCode {
    StatusCode::FORBIDDEN
}

async fn actual_lrps() -> Json<Value> {
    Json(json!({
        "actual_lrps": [
            { "actual_lrp_key": { "process_guid": "aaaaaaaa-bbbb-cccc-dddd-eeeeeeeeeeee-1234", "index": 0 }, "state": "RUNNING" },
            { "actual_lrp_key": { "process_guid": "aaaaaaaa-bbbb-cccc-dddd-eeeeeeeeeeee-1234", "index": 1 }, "state": "CRASHED" }
        ]
    }))
}

async fn start_fake_cf() -> FakeCf {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let state = FakeCf {
        base,
        stack_calls: Arc::new(AtomicU32::new(0)),
        token_calls: Arc::new(AtomicU32::new(0)),
    };

    let router = Router::new()
        .route("/", get(root))
        .route("/oauth/token", post(token))
        .route("/v3/apps", get(apps))
        .route("/v3/stacks", get(stacks))
        .route("/v3/organizations", get(broken))
        .route("/v2/spaces/:guid/summary", get(space_summary))
        .route("/v1/actual_lrps/list.r1", post(actual_lrps))
        .with_state(state.clone());

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    state
}

fn session_config(base: &str) -> SessionConfig {
    let mut config = SessionConfig::new(
        base,
        Credentials::Password {
            username: "admin".to_string(),
            password: "admin".to_string(),
        },
    );
    config.retry = RetryConfig {
        max_retries: 2,
        initial_backoff: Duration::from_millis(1),
        max_backoff: Duration::from_millis(5),
        backoff_multiplier: 2.0,
        jitter: false,
    };
    config
}

#[tokio::test]
async fn test_list_follows_pagination() {
    let cf = start_fake_cf().await;
    let session = CfSession::connect(session_config(&cf.base)).await.unwrap();

    let apps = session.list_applications().await.unwrap();
    let guids: Vec<_> = apps.iter().map(|a| a.guid.as_str()).collect();
    assert_eq!(guids, vec!["app1", "app2"]);
    assert_eq!(apps[0].relationships.guid("space"), Some("sp1"));
    assert_eq!(apps[0].lifecycle.data.stack.as_deref(), Some("cflinuxfs4"));
}

#[tokio::test]
async fn test_token_is_cached_between_requests() {
    let cf = start_fake_cf().await;
    let session = CfSession::connect(session_config(&cf.base)).await.unwrap();

    session.list_applications().await.unwrap();
    session.list_applications().await.unwrap();
    assert_eq!(cf.token_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_transient_failure_is_retried() {
    let cf = start_fake_cf().await;
    let session = CfSession::connect(session_config(&cf.base)).await.unwrap();

    let stacks = session.list_stacks().await.unwrap();
    assert_eq!(stacks.len(), 1);
    assert_eq!(cf.stack_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_permanent_failure_names_endpoint() {
    let cf = start_fake_cf().await;
    let session = CfSession::connect(session_config(&cf.base)).await.unwrap();

    let err = session.list_organizations().await.unwrap_err();
    assert_eq!(err.status(), Some(403));
    assert!(err.to_string().contains("/v3/organizations"));
}

#[tokio::test]
async fn test_deleted_space_summary_is_none() {
    let cf = start_fake_cf().await;
    let session = CfSession::connect(session_config(&cf.base)).await.unwrap();

    assert!(session.get_space_summary("gone").await.unwrap().is_none());
    let summary = session.get_space_summary("sp1").await.unwrap().unwrap();
    assert_eq!(summary.apps[0].running_instances, 2);
}

#[tokio::test]
async fn test_connect_fails_without_api() {
    let err = CfSession::connect(session_config("http://127.0.0.1:1"))
        .await
        .unwrap_err();
    assert!(err.status().is_none());
}

#[tokio::test]
async fn test_bbs_lists_actual_lrps() {
    let cf = start_fake_cf().await;
    let client = BbsClient::new(BbsConfig::new(cf.base.clone())).unwrap();

    let lrps = client.list_actual_lrps().await.unwrap();
    assert_eq!(lrps.len(), 2);
    assert_eq!(lrps[0].cc_process_guid(), "aaaaaaaa-bbbb-cccc-dddd-eeeeeeeeeeee");
    assert_eq!(lrps.iter().filter(|l| l.is_running()).count(), 1);
}
