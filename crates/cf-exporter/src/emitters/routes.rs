use std::collections::HashMap;

use chrono::{DateTime, Utc};
use prometheus::core::Collector;
use prometheus::GaugeVec;

use super::{gauge_vec, Emitter, ScrapeMeta};
use crate::config::MetricsConfig;
use crate::error::Result;
use crate::filter::Family;
use crate::snapshot::Snapshot;

pub struct RoutesEmitter {
    meta: ScrapeMeta,
    info: GaugeVec,
}

impl RoutesEmitter {
    pub fn new(config: &MetricsConfig) -> Result<Self> {
        Ok(Self {
            meta: ScrapeMeta::new(config, Family::Routes)?,
            info: gauge_vec(
                config,
                "route",
                "info",
                "Labeled Cloud Foundry Route information with a constant '1' value.",
                &[
                    "route_id",
                    "route_host",
                    "route_path",
                    "domain_id",
                    "space_id",
                    "service_instance_id",
                ],
            )?,
        })
    }
}

impl Emitter for RoutesEmitter {
    fn family(&self) -> Family {
        Family::Routes
    }

    fn meta(&self) -> &ScrapeMeta {
        &self.meta
    }

    fn metrics(&self) -> Vec<&dyn Collector> {
        vec![&self.info]
    }

    fn project(&self, snapshot: &Snapshot, _now: DateTime<Utc>) -> usize {
        let bound: HashMap<&str, &str> = snapshot
            .route_bindings
            .values()
            .filter_map(|b| {
                let route = b.relationships.guid("route")?;
                let instance = b.relationships.guid("service_instance")?;
                Some((route, instance))
            })
            .collect();

        for route in snapshot.routes.values() {
            let rel = &route.relationships;
            self.info
                .with_label_values(&[
                    &route.guid,
                    &route.host,
                    &route.path,
                    rel.guid("domain").unwrap_or(""),
                    rel.guid("space").unwrap_or(""),
                    bound.get(route.guid.as_str()).copied().unwrap_or(""),
                ])
                .set(1.0);
        }
        0
    }

    fn reset(&self) {
        self.info.reset();
    }
}
