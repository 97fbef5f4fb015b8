//! Prometheus exporter for Cloud Foundry.
//!
//! Every scrape of the telemetry endpoint plans the API listings the
//! enabled metric families need, runs them on a worker pool into a
//! [`snapshot::Snapshot`], and lets each family's emitter project that
//! snapshot into samples.

pub mod api;
pub mod cli;
pub mod clock;
pub mod composer;
pub mod config;
pub mod emitters;
pub mod error;
pub mod fetcher;
pub mod filter;
pub mod logging;
pub mod security;
pub mod server;
pub mod snapshot;

pub use api::{router, ApiState};
pub use clock::{Clock, ManualClock, SystemClock};
pub use composer::ScrapeComposer;
pub use config::{Config, MetricsConfig};
pub use error::{ExporterError, Result};
pub use fetcher::{CfConnector, Connector, Fetcher};
pub use filter::{Family, Filter};
pub use snapshot::Snapshot;
