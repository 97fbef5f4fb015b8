use chrono::{DateTime, Utc};
use prometheus::core::Collector;
use prometheus::GaugeVec;

use super::{gauge_vec, Emitter, ScrapeMeta};
use crate::config::MetricsConfig;
use crate::error::Result;
use crate::filter::Family;
use crate::snapshot::Snapshot;

pub struct ServiceBindingsEmitter {
    meta: ScrapeMeta,
    info: GaugeVec,
}

impl ServiceBindingsEmitter {
    pub fn new(config: &MetricsConfig) -> Result<Self> {
        Ok(Self {
            meta: ScrapeMeta::new(config, Family::ServiceBindings)?,
            info: gauge_vec(
                config,
                "service_binding",
                "info",
                "Labeled Cloud Foundry Service Binding information with a constant '1' value.",
                &[
                    "service_binding_id",
                    "service_binding_name",
                    "service_binding_type",
                    "application_id",
                    "service_instance_id",
                ],
            )?,
        })
    }
}

impl Emitter for ServiceBindingsEmitter {
    fn family(&self) -> Family {
        Family::ServiceBindings
    }

    fn meta(&self) -> &ScrapeMeta {
        &self.meta
    }

    fn metrics(&self) -> Vec<&dyn Collector> {
        vec![&self.info]
    }

    fn project(&self, snapshot: &Snapshot, _now: DateTime<Utc>) -> usize {
        for binding in snapshot.service_bindings.values() {
            let rel = &binding.relationships;
            self.info
                .with_label_values(&[
                    &binding.guid,
                    binding.name.as_deref().unwrap_or(""),
                    &binding.kind,
                    rel.guid("app").unwrap_or(""),
                    rel.guid("service_instance").unwrap_or(""),
                ])
                .set(1.0);
        }
        0
    }

    fn reset(&self) {
        self.info.reset();
    }
}
