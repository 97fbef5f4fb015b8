//! OAuth2 token acquisition against UAA.
//!
//! Tokens are cached and renewed shortly before expiry. Concurrent callers share
//! a single in-flight renewal through the cache mutex.

use std::time::{Duration, Instant};

use serde::Deserialize;
use tokio::sync::Mutex;

use crate::error::{ClientError, Result};

/// Seconds before expiry at which a cached token is considered stale.
const EXPIRY_MARGIN: Duration = Duration::from_secs(30);

/// Client id used by the CF CLI for password grants.
const DEFAULT_PASSWORD_CLIENT: &str = "cf";

/// Grant used to obtain tokens.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Resource owner password grant with the `cf` client.
    Password {
        /// UAA user.
        username: String,
        /// UAA password.
        password: String,
    },
    /// Client credentials grant.
    ClientCredentials {
        /// UAA client id.
        client_id: String,
        /// UAA client secret.
        client_secret: String,
    },
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credentials::Password { username, .. } => f
                .debug_struct("Password")
                .field("username", username)
                .finish_non_exhaustive(),
            Credentials::ClientCredentials { client_id, .. } => f
                .debug_struct("ClientCredentials")
                .field("client_id", client_id)
                .finish_non_exhaustive(),
        }
    }
}

impl Credentials {
    fn form(&self) -> Vec<(&'static str, &str)> {
        match self {
            Credentials::Password { username, password } => vec![
                ("grant_type", "password"),
                ("username", username.as_str()),
                ("password", password.as_str()),
            ],
            Credentials::ClientCredentials { .. } => vec![("grant_type", "client_credentials")],
        }
    }

    fn client(&self) -> (&str, &str) {
        match self {
            Credentials::Password { .. } => (DEFAULT_PASSWORD_CLIENT, ""),
            Credentials::ClientCredentials {
                client_id,
                client_secret,
            } => (client_id.as_str(), client_secret.as_str()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

impl CachedToken {
    fn is_fresh(&self, now: Instant) -> bool {
        now + EXPIRY_MARGIN < self.expires_at
    }
}

/// Caching token source for one UAA endpoint.
#[derive(Debug)]
pub struct TokenSource {
    client: reqwest::Client,
    token_url: String,
    credentials: Credentials,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenSource {
    /// Creates a token source posting to `<uaa_url>/oauth/token`.
    pub fn new(client: reqwest::Client, uaa_url: &str, credentials: Credentials) -> Self {
        Self {
            client,
            token_url: format!("{}/oauth/token", uaa_url.trim_end_matches('/')),
            credentials,
            cached: Mutex::new(None),
        }
    }

    /// Token endpoint this source posts to.
    pub fn token_url(&self) -> &str {
        &self.token_url
    }

    /// Returns a valid access token, renewing it when stale.
    pub async fn token(&self) -> Result<String> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.is_fresh(Instant::now()) {
                return Ok(token.access_token.clone());
            }
        }

        let fresh = self.request_token().await?;
        let access_token = fresh.access_token.clone();
        *cached = Some(fresh);
        Ok(access_token)
    }

    /// Drops the cached token so the next call renews it.
    pub async fn invalidate(&self) {
        *self.cached.lock().await = None;
    }

    async fn request_token(&self) -> Result<CachedToken> {
        let (client_id, client_secret) = self.credentials.client();
        let started = Instant::now();
        let response = self
            .client
            .post(&self.token_url)
            .basic_auth(client_id, Some(client_secret))
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&self.credentials.form())
            .send()
            .await
            .map_err(|e| ClientError::Auth {
                reason: format!("token request to {} failed: {}", self.token_url, e),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Auth {
                reason: format!("{} returned HTTP {}", self.token_url, status.as_u16()),
            });
        }

        let body: TokenResponse = response.json().await.map_err(|e| ClientError::Auth {
            reason: format!("invalid token response: {}", e),
        })?;

        tracing::debug!(
            token_url = %self.token_url,
            expires_in = body.expires_in,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "obtained UAA token"
        );

        Ok(CachedToken {
            access_token: body.access_token,
            expires_at: started + Duration::from_secs(body.expires_in.unwrap_or(0)),
        })
    }
}
