use chrono::{DateTime, Utc};
use prometheus::core::Collector;
use prometheus::GaugeVec;

use super::{gauge_vec, Emitter, ScrapeMeta};
use crate::config::MetricsConfig;
use crate::error::Result;
use crate::filter::Family;
use crate::snapshot::Snapshot;

/// Service offerings, labelled with the broker that provides them.
pub struct ServicesEmitter {
    meta: ScrapeMeta,
    info: GaugeVec,
}

impl ServicesEmitter {
    pub fn new(config: &MetricsConfig) -> Result<Self> {
        Ok(Self {
            meta: ScrapeMeta::new(config, Family::Services)?,
            info: gauge_vec(
                config,
                "service",
                "info",
                "Labeled Cloud Foundry Service information with a constant '1' value.",
                &[
                    "service_id",
                    "service_label",
                    "service_available",
                    "service_broker_id",
                    "service_broker_name",
                ],
            )?,
        })
    }
}

impl Emitter for ServicesEmitter {
    fn family(&self) -> Family {
        Family::Services
    }

    fn meta(&self) -> &ScrapeMeta {
        &self.meta
    }

    fn metrics(&self) -> Vec<&dyn Collector> {
        vec![&self.info]
    }

    fn project(&self, snapshot: &Snapshot, _now: DateTime<Utc>) -> usize {
        for offering in snapshot.service_offerings.values() {
            let broker_guid = offering.relationships.guid("service_broker").unwrap_or("");
            let broker_name = snapshot
                .service_brokers
                .get(broker_guid)
                .map(|b| b.name.as_str())
                .unwrap_or("");
            self.info
                .with_label_values(&[
                    &offering.guid,
                    &offering.name,
                    if offering.available { "true" } else { "false" },
                    broker_guid,
                    broker_name,
                ])
                .set(1.0);
        }
        0
    }

    fn reset(&self) {
        self.info.reset();
    }
}
