//! HTTP surface: landing page, telemetry endpoint and health check.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{ConnectInfo, Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tracing::{error, warn};

use crate::composer::{content_type, ScrapeComposer};
use crate::config::{BasicAuth, WebConfig};
use crate::security::{constant_time_eq, parse_basic_auth, AuthRateLimiter};

#[derive(Clone)]
pub struct ApiState {
    composer: Arc<ScrapeComposer>,
    auth: Option<Arc<BasicAuth>>,
    rate_limiter: Arc<AuthRateLimiter>,
    telemetry_path: Arc<str>,
}

impl ApiState {
    pub fn new(composer: Arc<ScrapeComposer>, web: &WebConfig) -> Self {
        Self {
            composer,
            auth: web.auth.clone().map(Arc::new),
            rate_limiter: Arc::new(AuthRateLimiter::new()),
            telemetry_path: Arc::from(web.telemetry_path.as_str()),
        }
    }
}

pub fn router(state: ApiState) -> Router {
    let telemetry_path = state.telemetry_path.to_string();
    let protected = Router::new()
        .route(&telemetry_path, get(metrics_handler))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            basic_auth_middleware,
        ));

    let public = Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler));

    Router::new()
        .merge(protected)
        .merge(public)
        .layer(axum::middleware::from_fn(
            crate::security::security_headers_middleware,
        ))
        .with_state(state)
}

async fn index_handler(State(state): State<ApiState>) -> Html<String> {
    Html(format!(
        "<html>\n<head><title>Cloud Foundry Exporter</title></head>\n<body>\n\
         <h1>Cloud Foundry Exporter</h1>\n\
         <p><a href=\"{path}\">Metrics</a></p>\n\
         </body>\n</html>\n",
        path = state.telemetry_path
    ))
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn metrics_handler(State(state): State<ApiState>) -> Response {
    match state.composer.scrape().await {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, content_type())],
            body,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "failed to render metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

/// Lockout key: the peer address. `X-Forwarded-For` is ignored.
fn client_key(request: &Request<Body>) -> String {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        [(header::WWW_AUTHENTICATE, r#"Basic realm="metrics""#)],
        "Unauthorized",
    )
        .into_response()
}

async fn basic_auth_middleware(
    State(state): State<ApiState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let Some(expected) = state.auth.as_deref() else {
        return next.run(request).await;
    };

    let client = client_key(&request);
    if state.rate_limiter.is_rate_limited(&client) {
        return (StatusCode::TOO_MANY_REQUESTS, "Too Many Requests").into_response();
    }

    let authorized = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_basic_auth)
        .is_some_and(|(user, password)| {
            let user_ok = constant_time_eq(&user, &expected.username);
            let password_ok = constant_time_eq(&password, &expected.password);
            user_ok & password_ok
        });

    if authorized {
        return next.run(request).await;
    }
    if state.rate_limiter.record_failure(&client) {
        warn!(client = %client, "basic auth lockout");
    }
    state.rate_limiter.prune();
    unauthorized()
}
