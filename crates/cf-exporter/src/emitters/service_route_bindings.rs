use chrono::{DateTime, Utc};
use prometheus::core::Collector;
use prometheus::GaugeVec;

use super::{gauge_vec, Emitter, ScrapeMeta};
use crate::config::MetricsConfig;
use crate::error::Result;
use crate::filter::Family;
use crate::snapshot::Snapshot;

pub struct ServiceRouteBindingsEmitter {
    meta: ScrapeMeta,
    info: GaugeVec,
}

impl ServiceRouteBindingsEmitter {
    pub fn new(config: &MetricsConfig) -> Result<Self> {
        Ok(Self {
            meta: ScrapeMeta::new(config, Family::ServiceRouteBindings)?,
            info: gauge_vec(
                config,
                "service_route_binding",
                "info",
                "Labeled Cloud Foundry Service Route Binding information with a constant '1' value.",
                &[
                    "service_route_binding_id",
                    "route_id",
                    "service_instance_id",
                    "route_service_url",
                ],
            )?,
        })
    }
}

impl Emitter for ServiceRouteBindingsEmitter {
    fn family(&self) -> Family {
        Family::ServiceRouteBindings
    }

    fn meta(&self) -> &ScrapeMeta {
        &self.meta
    }

    fn metrics(&self) -> Vec<&dyn Collector> {
        vec![&self.info]
    }

    fn project(&self, snapshot: &Snapshot, _now: DateTime<Utc>) -> usize {
        for binding in snapshot.service_route_bindings.values() {
            let rel = &binding.relationships;
            self.info
                .with_label_values(&[
                    &binding.guid,
                    rel.guid("route").unwrap_or(""),
                    rel.guid("service_instance").unwrap_or(""),
                    binding.route_service_url.as_deref().unwrap_or(""),
                ])
                .set(1.0);
        }
        0
    }

    fn reset(&self) {
        self.info.reset();
    }
}
