use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::cli::LogStream;
use crate::config::LogConfig;
use crate::error::{ExporterError, Result};

/// `RUST_LOG` wins over `--log.level` when set.
pub fn filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

pub fn init(config: &LogConfig) -> Result<()> {
    let writer = match config.stream {
        LogStream::Stdout => BoxMakeWriter::new(std::io::stdout),
        LogStream::Stderr => BoxMakeWriter::new(std::io::stderr),
    };
    let layer = if config.json {
        fmt::layer().json().with_writer(writer).boxed()
    } else {
        fmt::layer().with_writer(writer).boxed()
    };
    tracing_subscriber::registry()
        .with(layer)
        .with(filter(&config.level))
        .try_init()
        .map_err(|e| ExporterError::Config(format!("logging: {}", e)))
}
