use std::path::PathBuf;

use clap::error::ErrorKind;
use clap::{Parser, ValueEnum};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogStream {
    Stdout,
    Stderr,
}

#[derive(Debug, Clone, Parser)]
#[command(name = "cf_exporter")]
#[command(about = "Prometheus exporter for Cloud Foundry", long_about = None)]
#[command(version)]
pub struct Cli {
    #[arg(long = "cf.api_url", env = "CF_EXPORTER_CF_API_URL")]
    pub cf_api_url: String,

    #[arg(long = "cf.username", env = "CF_EXPORTER_CF_USERNAME")]
    pub cf_username: Option<String>,

    #[arg(long = "cf.password", env = "CF_EXPORTER_CF_PASSWORD", hide_env_values = true)]
    pub cf_password: Option<String>,

    #[arg(long = "cf.client-id", env = "CF_EXPORTER_CF_CLIENT_ID")]
    pub cf_client_id: Option<String>,

    #[arg(long = "cf.client-secret", env = "CF_EXPORTER_CF_CLIENT_SECRET", hide_env_values = true)]
    pub cf_client_secret: Option<String>,

    #[arg(long = "cf.deployment-name", env = "CF_EXPORTER_CF_DEPLOYMENT_NAME")]
    pub cf_deployment_name: String,

    #[arg(long = "cf.page-size", env = "CF_EXPORTER_CF_PAGE_SIZE", default_value_t = cf_client::DEFAULT_PAGE_SIZE)]
    pub cf_page_size: u32,

    #[arg(long = "cf.retries", env = "CF_EXPORTER_CF_RETRIES", default_value_t = 3)]
    pub cf_retries: u32,

    /// Seconds.
    #[arg(long = "cf.timeout", env = "CF_EXPORTER_CF_TIMEOUT", default_value_t = 30)]
    pub cf_timeout: u64,

    #[arg(long = "bbs.api_url", env = "CF_EXPORTER_BBS_API_URL")]
    pub bbs_api_url: Option<String>,

    /// Seconds.
    #[arg(long = "bbs.timeout", env = "CF_EXPORTER_BBS_TIMEOUT", default_value_t = 10)]
    pub bbs_timeout: u64,

    #[arg(long = "bbs.ca_file", env = "CF_EXPORTER_BBS_CA_FILE")]
    pub bbs_ca_file: Option<PathBuf>,

    #[arg(long = "bbs.cert_file", env = "CF_EXPORTER_BBS_CERT_FILE")]
    pub bbs_cert_file: Option<PathBuf>,

    #[arg(long = "bbs.key_file", env = "CF_EXPORTER_BBS_KEY_FILE")]
    pub bbs_key_file: Option<PathBuf>,

    #[arg(long = "bbs.skip_ssl_verify", env = "CF_EXPORTER_BBS_SKIP_SSL_VERIFY")]
    pub bbs_skip_ssl_verify: bool,

    /// Comma separated families to export; empty selects all but events and tasks.
    #[arg(long = "filter.collectors", env = "CF_EXPORTER_FILTER_COLLECTORS", default_value = "")]
    pub filter_collectors: String,

    /// Comma separated task states; empty selects PENDING,RUNNING,CANCELING.
    #[arg(long = "filter.task-states", env = "CF_EXPORTER_FILTER_TASK_STATES", default_value = "")]
    pub filter_task_states: String,

    #[arg(long = "metrics.namespace", env = "CF_EXPORTER_METRICS_NAMESPACE", default_value = "cf")]
    pub metrics_namespace: String,

    #[arg(long = "metrics.environment", env = "CF_EXPORTER_METRICS_ENVIRONMENT")]
    pub metrics_environment: String,

    #[arg(long = "skip-ssl-verify", env = "CF_EXPORTER_SKIP_SSL_VERIFY")]
    pub skip_ssl_verify: bool,

    #[arg(long = "web.listen-address", env = "CF_EXPORTER_WEB_LISTEN_ADDRESS", default_value = ":9193")]
    pub web_listen_address: String,

    #[arg(long = "web.telemetry-path", env = "CF_EXPORTER_WEB_TELEMETRY_PATH", default_value = "/metrics")]
    pub web_telemetry_path: String,

    /// Enables Basic auth together with --web.auth.password; setting only one is a startup error.
    #[arg(long = "web.auth.username", env = "CF_EXPORTER_WEB_AUTH_USERNAME")]
    pub web_auth_username: Option<String>,

    /// Enables Basic auth together with --web.auth.username; setting only one is a startup error.
    #[arg(long = "web.auth.password", env = "CF_EXPORTER_WEB_AUTH_PASSWORD", hide_env_values = true)]
    pub web_auth_password: Option<String>,

    /// Enables TLS together with --web.tls.key_file; setting only one is a startup error.
    #[arg(long = "web.tls.cert_file", env = "CF_EXPORTER_WEB_TLS_CERT_FILE")]
    pub web_tls_cert_file: Option<PathBuf>,

    /// Enables TLS together with --web.tls.cert_file; setting only one is a startup error.
    #[arg(long = "web.tls.key_file", env = "CF_EXPORTER_WEB_TLS_KEY_FILE")]
    pub web_tls_key_file: Option<PathBuf>,

    #[arg(long = "collector.workers", env = "CF_EXPORTER_COLLECTOR_WORKERS", default_value_t = crate::fetcher::DEFAULT_WORKERS)]
    pub collector_workers: usize,

    #[arg(long = "log.level", env = "CF_EXPORTER_LOG_LEVEL", default_value = "error")]
    pub log_level: String,

    #[arg(long = "log.stream", env = "CF_EXPORTER_LOG_STREAM", value_enum, default_value_t = LogStream::Stdout)]
    pub log_stream: LogStream,

    #[arg(long = "log.json", env = "CF_EXPORTER_LOG_JSON")]
    pub log_json: bool,
}

/// Exit status for a failed parse: 0 after `--help`/`--version`, 1 for any
/// usage error.
pub fn exit_code(error: &clap::Error) -> u8 {
    match error.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
        _ => 1,
    }
}
