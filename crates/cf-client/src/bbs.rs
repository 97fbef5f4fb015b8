//! Diego BBS client for ActualLRP state.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;

use crate::error::{ClientError, Result};
use crate::models::ActualLrp;
use crate::retry::RetryConfig;
use crate::session::BbsApi;
use crate::tls;

const ACTUAL_LRPS_PATH: &str = "/v1/actual_lrps/list.r1";

/// Settings for [`BbsClient::new`].
#[derive(Debug, Clone)]
pub struct BbsConfig {
    /// BBS base URL, e.g. `https://bbs.service.cf.internal:8889`.
    pub api_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// CA used to verify the BBS server.
    pub ca_file: Option<PathBuf>,
    /// Client certificate for mutual TLS.
    pub cert_file: Option<PathBuf>,
    /// Client key for mutual TLS.
    pub key_file: Option<PathBuf>,
    /// Disable TLS verification.
    pub skip_ssl_verify: bool,
    /// Retry policy for transient failures.
    pub retry: RetryConfig,
}

impl BbsConfig {
    /// Defaults for everything but the URL.
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            timeout: Duration::from_secs(10),
            ca_file: None,
            cert_file: None,
            key_file: None,
            skip_ssl_verify: false,
            retry: RetryConfig::default(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct BbsError {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Default, Deserialize)]
struct ActualLrpsResponse {
    #[serde(default)]
    error: Option<BbsError>,
    #[serde(default)]
    actual_lrps: Vec<ActualLrp>,
}

/// HTTP client for the BBS ActualLRP listing.
#[derive(Debug)]
pub struct BbsClient {
    client: reqwest::Client,
    url: Url,
    retry: RetryConfig,
}

impl BbsClient {
    /// Builds the client, loading mTLS material when configured.
    pub fn new(config: BbsConfig) -> Result<Self> {
        let base = config.api_url.trim_end_matches('/');
        let url = Url::parse(&format!("{}{}", base, ACTUAL_LRPS_PATH)).map_err(|e| {
            ClientError::Config {
                reason: format!("invalid BBS URL {:?}: {}", config.api_url, e),
            }
        })?;

        let mut builder = reqwest::Client::builder()
            .timeout(config.timeout)
            .danger_accept_invalid_certs(config.skip_ssl_verify);

        if let Some(ca_file) = &config.ca_file {
            builder = builder.add_root_certificate(tls::root_certificate(ca_file)?);
        }
        match (&config.cert_file, &config.key_file) {
            (Some(cert), Some(key)) => builder = builder.identity(tls::identity(cert, key)?),
            (None, None) => {}
            _ => {
                return Err(ClientError::Config {
                    reason: "BBS client certificate and key must be set together".to_string(),
                })
            }
        }

        let client = builder.build().map_err(|e| ClientError::Config {
            reason: format!("failed to build BBS client: {}", e),
        })?;

        Ok(Self {
            client,
            url,
            retry: config.retry,
        })
    }

    async fn request_actual_lrps(&self) -> Result<Vec<ActualLrp>> {
        let started = Instant::now();
        let response = self
            .client
            .post(self.url.clone())
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&serde_json::json!({}))
            .send()
            .await
            .map_err(|source| ClientError::Http {
                endpoint: ACTUAL_LRPS_PATH.to_string(),
                source,
            })?;

        let status = response.status();
        tracing::debug!(
            endpoint = ACTUAL_LRPS_PATH,
            status = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "HTTP POST"
        );
        if !status.is_success() {
            return Err(ClientError::Status {
                endpoint: ACTUAL_LRPS_PATH.to_string(),
                status: status.as_u16(),
            });
        }

        let body: ActualLrpsResponse = response.json().await.map_err(|e| ClientError::Decode {
            endpoint: ACTUAL_LRPS_PATH.to_string(),
            reason: e.to_string(),
        })?;
        if let Some(err) = body.error {
            return Err(ClientError::Decode {
                endpoint: ACTUAL_LRPS_PATH.to_string(),
                reason: format!("BBS error {}: {}", err.kind, err.message),
            });
        }
        Ok(body.actual_lrps)
    }
}

#[async_trait]
impl BbsApi for BbsClient {
    async fn list_actual_lrps(&self) -> Result<Vec<ActualLrp>> {
        self.retry
            .run(ACTUAL_LRPS_PATH, move || self.request_actual_lrps())
            .await
    }
}
