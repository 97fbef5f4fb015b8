//! Validated runtime configuration built once from the command line.

use std::collections::HashMap;
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::PathBuf;
use std::time::Duration;

use cf_client::{BbsConfig, Credentials, RetryConfig, SessionConfig};
use prometheus::Opts;
use reqwest::Url;

use crate::cli::{Cli, LogStream};
use crate::error::{ExporterError, Result};
use crate::filter::Filter;

pub const TASK_STATES: [&str; 5] = ["PENDING", "RUNNING", "CANCELING", "SUCCEEDED", "FAILED"];

#[derive(Debug, Clone)]
pub struct CfConfig {
    pub api_url: String,
    pub credentials: Credentials,
    pub skip_ssl_verify: bool,
    pub page_size: u32,
    pub retries: u32,
    pub timeout: Duration,
}

/// What every emitter needs to name its metrics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsConfig {
    pub namespace: String,
    pub environment: String,
    pub deployment: String,
}

impl MetricsConfig {
    pub fn const_labels(&self) -> HashMap<String, String> {
        HashMap::from([
            ("environment".to_string(), self.environment.clone()),
            ("deployment".to_string(), self.deployment.clone()),
        ])
    }

    /// Options for `<namespace>_<subsystem>_<name>`.
    pub fn opts(&self, subsystem: &str, name: &str, help: &str) -> Opts {
        Opts::new(name, help)
            .namespace(self.namespace.clone())
            .subsystem(subsystem)
            .const_labels(self.const_labels())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicAuth {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsFiles {
    pub cert_file: PathBuf,
    pub key_file: PathBuf,
}

#[derive(Debug, Clone)]
pub struct WebConfig {
    pub listen_address: SocketAddr,
    pub telemetry_path: String,
    pub auth: Option<BasicAuth>,
    pub tls: Option<TlsFiles>,
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: String,
    pub stream: LogStream,
    pub json: bool,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub cf: CfConfig,
    pub bbs: Option<BbsConfig>,
    pub filter: Filter,
    pub task_states: Vec<String>,
    pub metrics: MetricsConfig,
    pub web: WebConfig,
    pub workers: usize,
    pub log: LogConfig,
}

fn invalid(msg: impl Into<String>) -> ExporterError {
    ExporterError::Config(msg.into())
}

fn check_url(flag: &str, value: &str) -> Result<String> {
    let url = Url::parse(value).map_err(|e| invalid(format!("--{}: {}", flag, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(value.trim_end_matches('/').to_string()),
        other => Err(invalid(format!("--{}: unsupported scheme {}", flag, other))),
    }
}

/// Both or neither; `flags` names the pair in the error message.
fn pair<A, B>(a: Option<A>, b: Option<B>, flags: &str) -> Result<Option<(A, B)>> {
    match (a, b) {
        (Some(a), Some(b)) => Ok(Some((a, b))),
        (None, None) => Ok(None),
        _ => Err(invalid(format!("{} must be set together", flags))),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn credentials(cli: &Cli) -> Result<Credentials> {
    let password = pair(
        non_empty(cli.cf_username.clone()),
        non_empty(cli.cf_password.clone()),
        "--cf.username and --cf.password",
    )?;
    let client = pair(
        non_empty(cli.cf_client_id.clone()),
        non_empty(cli.cf_client_secret.clone()),
        "--cf.client-id and --cf.client-secret",
    )?;
    match (password, client) {
        (Some((username, password)), _) => Ok(Credentials::Password { username, password }),
        (None, Some((client_id, client_secret))) => Ok(Credentials::ClientCredentials {
            client_id,
            client_secret,
        }),
        (None, None) => Err(invalid(
            "either --cf.username/--cf.password or --cf.client-id/--cf.client-secret is required",
        )),
    }
}

/// Upper-cases and validates a comma separated list of task states.
pub fn parse_task_states(list: &str) -> Result<Vec<String>> {
    let mut states = Vec::new();
    for state in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let state = state.to_uppercase();
        if !TASK_STATES.contains(&state.as_str()) {
            return Err(invalid(format!(
                "unknown task state {}, expected one of {}",
                state,
                TASK_STATES.join(", ")
            )));
        }
        if !states.contains(&state) {
            states.push(state);
        }
    }
    Ok(states)
}

/// Accepts `host:port` (host names are resolved, first address wins) and
/// the `:port` shorthand for all interfaces.
pub fn parse_listen_address(value: &str) -> Result<SocketAddr> {
    let full = if value.starts_with(':') {
        format!("0.0.0.0{}", value)
    } else {
        value.to_string()
    };
    full.to_socket_addrs()
        .map_err(|e| invalid(format!("--web.listen-address {}: {}", value, e)))?
        .next()
        .ok_or_else(|| invalid(format!("--web.listen-address {}: no address", value)))
}

fn parse_log_level(value: &str) -> Result<String> {
    let level = value.to_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(level),
        _ => Err(invalid(format!("unknown log level {}", value))),
    }
}

impl Config {
    pub fn from_cli(cli: Cli) -> Result<Self> {
        let credentials = credentials(&cli)?;
        let api_url = check_url("cf.api_url", &cli.cf_api_url)?;

        let bbs = match non_empty(cli.bbs_api_url.clone()) {
            Some(url) => {
                let mut bbs = BbsConfig::new(check_url("bbs.api_url", &url)?);
                bbs.timeout = Duration::from_secs(cli.bbs_timeout);
                bbs.ca_file = cli.bbs_ca_file.clone();
                bbs.skip_ssl_verify = cli.bbs_skip_ssl_verify;
                if let Some((cert, key)) = pair(
                    cli.bbs_cert_file.clone(),
                    cli.bbs_key_file.clone(),
                    "--bbs.cert_file and --bbs.key_file",
                )? {
                    bbs.cert_file = Some(cert);
                    bbs.key_file = Some(key);
                }
                Some(bbs)
            }
            None => None,
        };

        if cli.metrics_namespace.is_empty() {
            return Err(invalid("--metrics.namespace must not be empty"));
        }
        if !cli.web_telemetry_path.starts_with('/') {
            return Err(invalid("--web.telemetry-path must start with '/'"));
        }

        let auth = pair(
            non_empty(cli.web_auth_username.clone()),
            non_empty(cli.web_auth_password.clone()),
            "--web.auth.username and --web.auth.password",
        )?
        .map(|(username, password)| BasicAuth { username, password });
        let tls = pair(
            cli.web_tls_cert_file.clone(),
            cli.web_tls_key_file.clone(),
            "--web.tls.cert_file and --web.tls.key_file",
        )?
        .map(|(cert_file, key_file)| TlsFiles { cert_file, key_file });

        Ok(Self {
            cf: CfConfig {
                api_url,
                credentials,
                skip_ssl_verify: cli.skip_ssl_verify,
                page_size: cli.cf_page_size.max(1),
                retries: cli.cf_retries,
                timeout: Duration::from_secs(cli.cf_timeout),
            },
            bbs,
            filter: Filter::parse(&cli.filter_collectors)?,
            task_states: parse_task_states(&cli.filter_task_states)?,
            metrics: MetricsConfig {
                namespace: cli.metrics_namespace,
                environment: cli.metrics_environment,
                deployment: cli.cf_deployment_name,
            },
            web: WebConfig {
                listen_address: parse_listen_address(&cli.web_listen_address)?,
                telemetry_path: cli.web_telemetry_path,
                auth,
                tls,
            },
            workers: cli.collector_workers.max(1),
            log: LogConfig {
                level: parse_log_level(&cli.log_level)?,
                stream: cli.log_stream,
                json: cli.log_json,
            },
        })
    }

    pub fn session_config(&self) -> SessionConfig {
        let mut session = SessionConfig::new(self.cf.api_url.clone(), self.cf.credentials.clone());
        session.skip_ssl_verify = self.cf.skip_ssl_verify;
        session.timeout = self.cf.timeout;
        session.page_size = self.cf.page_size;
        session.retry = RetryConfig::with_retries(self.cf.retries);
        session
    }

    pub fn bbs_config(&self) -> Option<BbsConfig> {
        self.bbs.clone().map(|mut bbs| {
            bbs.retry = RetryConfig::with_retries(self.cf.retries);
            bbs
        })
    }
}
