use chrono::{DateTime, Utc};
use prometheus::core::Collector;
use prometheus::GaugeVec;

use super::{gauge_vec, Emitter, ScrapeMeta};
use crate::config::MetricsConfig;
use crate::error::Result;
use crate::filter::Family;
use crate::snapshot::Snapshot;

pub struct SecurityGroupsEmitter {
    meta: ScrapeMeta,
    info: GaugeVec,
}

impl SecurityGroupsEmitter {
    pub fn new(config: &MetricsConfig) -> Result<Self> {
        Ok(Self {
            meta: ScrapeMeta::new(config, Family::SecurityGroups)?,
            info: gauge_vec(
                config,
                "security_group",
                "info",
                "Labeled Cloud Foundry Security Group information with a constant '1' value.",
                &["security_group_id", "security_group_name"],
            )?,
        })
    }
}

impl Emitter for SecurityGroupsEmitter {
    fn family(&self) -> Family {
        Family::SecurityGroups
    }

    fn meta(&self) -> &ScrapeMeta {
        &self.meta
    }

    fn metrics(&self) -> Vec<&dyn Collector> {
        vec![&self.info]
    }

    fn project(&self, snapshot: &Snapshot, _now: DateTime<Utc>) -> usize {
        for group in snapshot.security_groups.values() {
            self.info
                .with_label_values(&[&group.guid, &group.name])
                .set(1.0);
        }
        0
    }

    fn reset(&self) {
        self.info.reset();
    }
}
