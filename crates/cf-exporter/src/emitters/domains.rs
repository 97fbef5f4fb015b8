use chrono::{DateTime, Utc};
use prometheus::core::Collector;
use prometheus::GaugeVec;

use super::{gauge_vec, Emitter, ScrapeMeta};
use crate::config::MetricsConfig;
use crate::error::Result;
use crate::filter::Family;
use crate::snapshot::Snapshot;

pub struct DomainsEmitter {
    meta: ScrapeMeta,
    info: GaugeVec,
}

impl DomainsEmitter {
    pub fn new(config: &MetricsConfig) -> Result<Self> {
        Ok(Self {
            meta: ScrapeMeta::new(config, Family::Domains)?,
            info: gauge_vec(
                config,
                "domain",
                "info",
                "Labeled Cloud Foundry Domain information with a constant '1' value.",
                &["domain_id", "domain_name", "internal", "protocol"],
            )?,
        })
    }
}

impl Emitter for DomainsEmitter {
    fn family(&self) -> Family {
        Family::Domains
    }

    fn meta(&self) -> &ScrapeMeta {
        &self.meta
    }

    fn metrics(&self) -> Vec<&dyn Collector> {
        vec![&self.info]
    }

    // A domain without protocols has no sample.
    fn project(&self, snapshot: &Snapshot, _now: DateTime<Utc>) -> usize {
        for domain in snapshot.domains.values() {
            let internal = if domain.internal { "true" } else { "false" };
            for protocol in &domain.supported_protocols {
                self.info
                    .with_label_values(&[&domain.guid, &domain.name, internal, protocol])
                    .set(1.0);
            }
        }
        0
    }

    fn reset(&self) {
        self.info.reset();
    }
}
