use cf_client::ClientError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExporterError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("cannot connect to {target}: {source}")]
    Connect {
        target: &'static str,
        #[source]
        source: ClientError,
    },

    #[error("job {job} failed: {source}")]
    Fetch {
        job: String,
        #[source]
        source: ClientError,
    },

    #[error("fetch worker aborted: {0}")]
    Worker(String),

    #[error("metric registration failed: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("TLS listener error: {0}")]
    Tls(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ExporterError>;
