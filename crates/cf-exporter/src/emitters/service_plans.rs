use chrono::{DateTime, Utc};
use prometheus::core::Collector;
use prometheus::GaugeVec;

use super::{gauge_vec, Emitter, ScrapeMeta};
use crate::config::MetricsConfig;
use crate::error::Result;
use crate::filter::Family;
use crate::snapshot::Snapshot;

pub struct ServicePlansEmitter {
    meta: ScrapeMeta,
    info: GaugeVec,
}

impl ServicePlansEmitter {
    pub fn new(config: &MetricsConfig) -> Result<Self> {
        Ok(Self {
            meta: ScrapeMeta::new(config, Family::ServicePlans)?,
            info: gauge_vec(
                config,
                "service_plan",
                "info",
                "Labeled Cloud Foundry Service Plan information with a constant '1' value.",
                &["service_plan_id", "service_plan_name", "service_id", "free"],
            )?,
        })
    }
}

impl Emitter for ServicePlansEmitter {
    fn family(&self) -> Family {
        Family::ServicePlans
    }

    fn meta(&self) -> &ScrapeMeta {
        &self.meta
    }

    fn metrics(&self) -> Vec<&dyn Collector> {
        vec![&self.info]
    }

    fn project(&self, snapshot: &Snapshot, _now: DateTime<Utc>) -> usize {
        for plan in snapshot.service_plans.values() {
            self.info
                .with_label_values(&[
                    &plan.guid,
                    &plan.name,
                    plan.relationships.guid("service_offering").unwrap_or(""),
                    if plan.free { "true" } else { "false" },
                ])
                .set(1.0);
        }
        0
    }

    fn reset(&self) {
        self.info.reset();
    }
}
