//! Metric emitters, one per [`Family`].
//!
//! An emitter owns prometheus vectors for its data metrics plus a
//! [`ScrapeMeta`] block with the per-family self-observability metrics. On
//! every scrape the composer hands it the fresh [`Snapshot`]; the emitter
//! clears its vectors, projects the snapshot into samples and records how
//! the scrape went.

mod applications;
mod buildpacks;
mod domains;
mod events;
mod isolation_segments;
mod organizations;
mod quota;
mod routes;
mod security_groups;
mod service_bindings;
mod service_instances;
mod service_plans;
mod service_route_bindings;
mod services;
mod spaces;
mod stacks;
mod tasks;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use prometheus::core::{Collector, Desc};
use prometheus::proto::MetricFamily;
use prometheus::{Gauge, GaugeVec, IntCounter};

use crate::clock::Clock;
use crate::config::MetricsConfig;
use crate::error::Result;
use crate::filter::{Family, Filter};
use crate::snapshot::Snapshot;

pub use applications::ApplicationsEmitter;
pub use buildpacks::BuildpacksEmitter;
pub use domains::DomainsEmitter;
pub use events::EventsEmitter;
pub use isolation_segments::IsolationSegmentsEmitter;
pub use organizations::OrganizationsEmitter;
pub use routes::RoutesEmitter;
pub use security_groups::SecurityGroupsEmitter;
pub use service_bindings::ServiceBindingsEmitter;
pub use service_instances::ServiceInstancesEmitter;
pub use service_plans::ServicePlansEmitter;
pub use service_route_bindings::ServiceRouteBindingsEmitter;
pub use services::ServicesEmitter;
pub use spaces::SpacesEmitter;
pub use stacks::StacksEmitter;
pub use tasks::TasksEmitter;

pub trait Emitter: Send + Sync {
    fn family(&self) -> Family;

    fn meta(&self) -> &ScrapeMeta;

    /// Data metrics, excluding the self-observability block.
    fn metrics(&self) -> Vec<&dyn Collector>;

    /// Writes samples for `snapshot` into the (already cleared) data
    /// metrics. Returns how many records had to be skipped.
    fn project(&self, snapshot: &Snapshot, now: DateTime<Utc>) -> usize;

    /// Clears every data sample.
    fn reset(&self);

    fn describe(&self) -> Vec<&Desc> {
        let mut descs = self.meta().describe();
        for metric in self.metrics() {
            descs.extend(metric.desc());
        }
        descs
    }

    fn collect(&self, snapshot: &Snapshot, now: DateTime<Utc>) {
        self.reset();
        let skipped = match &snapshot.error {
            Some(_) => 0,
            None => self.project(snapshot, now),
        };
        if skipped > 0 {
            tracing::warn!(family = %self.family(), skipped, "records skipped");
        }
        self.meta().record(snapshot, skipped, now);
    }

    /// Current samples of every metric this emitter owns.
    fn families(&self) -> Vec<MetricFamily> {
        let mut families = self.meta().families();
        for metric in self.metrics() {
            families.extend(metric.collect());
        }
        families
    }
}

/// Per-family scrape bookkeeping:
/// `<ns>_<f>_scrapes_total`, `<ns>_<f>_scrape_errors_total`,
/// `<ns>_last_<f>_scrape_error`, `<ns>_last_<f>_scrape_timestamp` and
/// `<ns>_last_<f>_scrape_duration_seconds`.
pub struct ScrapeMeta {
    scrapes_total: IntCounter,
    scrape_errors_total: IntCounter,
    last_error: Gauge,
    last_timestamp: Gauge,
    last_duration: Gauge,
}

impl ScrapeMeta {
    pub fn new(config: &MetricsConfig, family: Family) -> Result<Self> {
        let subsystem = family.subsystem();
        let last = format!("last_{}", subsystem);
        Ok(Self {
            scrapes_total: IntCounter::with_opts(config.opts(
                subsystem,
                "scrapes_total",
                &format!("Total number of scrapes for Cloud Foundry {}.", subsystem),
            ))?,
            scrape_errors_total: IntCounter::with_opts(config.opts(
                subsystem,
                "scrape_errors_total",
                &format!("Total number of scrape errors of Cloud Foundry {}.", subsystem),
            ))?,
            last_error: Gauge::with_opts(config.opts(
                &last,
                "scrape_error",
                &format!(
                    "Whether the last scrape of {} metrics from Cloud Foundry resulted in an error (1 for error, 0 for success).",
                    subsystem
                ),
            ))?,
            last_timestamp: Gauge::with_opts(config.opts(
                &last,
                "scrape_timestamp",
                &format!(
                    "Number of seconds since 1970 since last scrape of {} metrics from Cloud Foundry.",
                    subsystem
                ),
            ))?,
            last_duration: Gauge::with_opts(config.opts(
                &last,
                "scrape_duration_seconds",
                &format!(
                    "Duration of the last scrape of {} metrics from Cloud Foundry.",
                    subsystem
                ),
            ))?,
        })
    }

    fn record(&self, snapshot: &Snapshot, skipped: usize, now: DateTime<Utc>) {
        self.scrapes_total.inc();
        if snapshot.error.is_some() || skipped > 0 {
            self.scrape_errors_total.inc();
            self.last_error.set(1.0);
        } else {
            self.last_error.set(0.0);
        }
        self.last_timestamp.set(now.timestamp() as f64);
        self.last_duration.set(snapshot.took);
    }

    fn collectors(&self) -> [&dyn Collector; 5] {
        [
            &self.scrapes_total,
            &self.scrape_errors_total,
            &self.last_error,
            &self.last_timestamp,
            &self.last_duration,
        ]
    }

    fn describe(&self) -> Vec<&Desc> {
        self.collectors().into_iter().flat_map(|c| c.desc()).collect()
    }

    fn families(&self) -> Vec<MetricFamily> {
        self.collectors()
            .into_iter()
            .flat_map(|c| c.collect())
            .collect()
    }
}

/// `GaugeVec` named `<ns>_<subsystem>_<name>` carrying the constant labels.
pub(crate) fn gauge_vec(
    config: &MetricsConfig,
    subsystem: &str,
    name: &str,
    help: &str,
    labels: &[&str],
) -> Result<GaugeVec> {
    Ok(GaugeVec::new(config.opts(subsystem, name, help), labels)?)
}

/// Exposes an [`Emitter`] to a prometheus `Registry`.
pub struct EmitterCollector(pub Arc<dyn Emitter>);

impl Collector for EmitterCollector {
    fn desc(&self) -> Vec<&Desc> {
        self.0.describe()
    }

    fn collect(&self) -> Vec<MetricFamily> {
        self.0.families()
    }
}

/// Emitters for every family enabled in `filter`, in family order.
pub fn build_emitters(
    filter: &Filter,
    config: &MetricsConfig,
    clock: Arc<dyn Clock>,
) -> Result<Vec<Arc<dyn Emitter>>> {
    let mut emitters: Vec<Arc<dyn Emitter>> = Vec::new();
    for family in filter.families() {
        let emitter: Arc<dyn Emitter> = match family {
            Family::Applications => Arc::new(ApplicationsEmitter::new(config)?),
            Family::Buildpacks => Arc::new(BuildpacksEmitter::new(config)?),
            Family::Domains => Arc::new(DomainsEmitter::new(config)?),
            Family::Events => Arc::new(EventsEmitter::new(config, clock.as_ref())?),
            Family::IsolationSegments => Arc::new(IsolationSegmentsEmitter::new(config)?),
            Family::Organizations => Arc::new(OrganizationsEmitter::new(config)?),
            Family::Routes => Arc::new(RoutesEmitter::new(config)?),
            Family::SecurityGroups => Arc::new(SecurityGroupsEmitter::new(config)?),
            Family::ServiceBindings => Arc::new(ServiceBindingsEmitter::new(config)?),
            Family::ServiceRouteBindings => Arc::new(ServiceRouteBindingsEmitter::new(config)?),
            Family::ServiceInstances => Arc::new(ServiceInstancesEmitter::new(config)?),
            Family::ServicePlans => Arc::new(ServicePlansEmitter::new(config)?),
            Family::Services => Arc::new(ServicesEmitter::new(config)?),
            Family::Spaces => Arc::new(SpacesEmitter::new(config)?),
            Family::Stacks => Arc::new(StacksEmitter::new(config)?),
            Family::Tasks => Arc::new(TasksEmitter::new(config)?),
        };
        emitters.push(emitter);
    }
    Ok(emitters)
}
