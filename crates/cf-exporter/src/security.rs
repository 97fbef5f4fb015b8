use std::collections::HashMap;
use std::time::{Duration, Instant};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use parking_lot::Mutex;

const MAX_FAILURES: u32 = 5;
const FAILURE_WINDOW: Duration = Duration::from_secs(60);
const LOCKOUT: Duration = Duration::from_secs(60);

pub fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.as_bytes()
        .iter()
        .zip(b.as_bytes())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

/// Decodes an `Authorization: Basic ...` header value into user and password.
pub fn parse_basic_auth(header: &str) -> Option<(String, String)> {
    let encoded = header
        .strip_prefix("Basic ")
        .or_else(|| header.strip_prefix("basic "))?;
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (user, password) = decoded.split_once(':')?;
    Some((user.to_string(), password.to_string()))
}

struct FailureWindow {
    failures: u32,
    first_failure: Instant,
    locked_until: Option<Instant>,
}

/// Locks a client out for a minute after five failed logins within a minute.
#[derive(Default)]
pub struct AuthRateLimiter {
    clients: Mutex<HashMap<String, FailureWindow>>,
}

impl AuthRateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether the client is now locked out.
    pub fn record_failure(&self, client: &str) -> bool {
        let now = Instant::now();
        let mut clients = self.clients.lock();
        let entry = clients
            .entry(client.to_string())
            .or_insert(FailureWindow {
                failures: 0,
                first_failure: now,
                locked_until: None,
            });
        if entry.first_failure + FAILURE_WINDOW < now {
            entry.failures = 0;
            entry.first_failure = now;
        }
        entry.failures += 1;
        if entry.failures >= MAX_FAILURES {
            entry.locked_until = Some(now + LOCKOUT);
        }
        entry.locked_until.is_some_and(|until| until > now)
    }

    pub fn is_rate_limited(&self, client: &str) -> bool {
        self.clients
            .lock()
            .get(client)
            .and_then(|entry| entry.locked_until)
            .is_some_and(|until| until > Instant::now())
    }

    /// Drops entries whose window and lockout have both expired.
    pub fn prune(&self) {
        let now = Instant::now();
        self.clients.lock().retain(|_, entry| {
            entry.first_failure + FAILURE_WINDOW > now
                || entry.locked_until.is_some_and(|until| until > now)
        });
    }

    pub fn tracked(&self) -> usize {
        self.clients.lock().len()
    }
}

pub async fn security_headers_middleware(
    request: axum::extract::Request,
    next: axum::middleware::Next,
) -> axum::response::Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(
        axum::http::header::X_CONTENT_TYPE_OPTIONS,
        axum::http::HeaderValue::from_static("nosniff"),
    );
    headers.insert(
        axum::http::header::X_FRAME_OPTIONS,
        axum::http::HeaderValue::from_static("DENY"),
    );
    headers.insert(
        axum::http::header::CACHE_CONTROL,
        axum::http::HeaderValue::from_static("no-store"),
    );
    response
}
