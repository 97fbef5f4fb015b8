use chrono::{DateTime, Utc};
use prometheus::core::Collector;
use prometheus::GaugeVec;

use super::{gauge_vec, Emitter, ScrapeMeta};
use crate::config::MetricsConfig;
use crate::error::Result;
use crate::filter::Family;
use crate::snapshot::Snapshot;

pub struct StacksEmitter {
    meta: ScrapeMeta,
    info: GaugeVec,
}

impl StacksEmitter {
    pub fn new(config: &MetricsConfig) -> Result<Self> {
        Ok(Self {
            meta: ScrapeMeta::new(config, Family::Stacks)?,
            info: gauge_vec(
                config,
                "stack",
                "info",
                "Labeled Cloud Foundry Stack information with a constant '1' value.",
                &["stack_id", "stack_name"],
            )?,
        })
    }
}

impl Emitter for StacksEmitter {
    fn family(&self) -> Family {
        Family::Stacks
    }

    fn meta(&self) -> &ScrapeMeta {
        &self.meta
    }

    fn metrics(&self) -> Vec<&dyn Collector> {
        vec![&self.info]
    }

    fn project(&self, snapshot: &Snapshot, _now: DateTime<Utc>) -> usize {
        for stack in snapshot.stacks.values() {
            self.info
                .with_label_values(&[&stack.guid, &stack.name])
                .set(1.0);
        }
        0
    }

    fn reset(&self) {
        self.info.reset();
    }
}
