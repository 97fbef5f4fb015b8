use chrono::{DateTime, Utc};
use prometheus::core::Collector;
use prometheus::GaugeVec;

use super::{gauge_vec, Emitter, ScrapeMeta};
use crate::config::MetricsConfig;
use crate::error::Result;
use crate::filter::Family;
use crate::snapshot::Snapshot;

pub struct IsolationSegmentsEmitter {
    meta: ScrapeMeta,
    info: GaugeVec,
}

impl IsolationSegmentsEmitter {
    pub fn new(config: &MetricsConfig) -> Result<Self> {
        Ok(Self {
            meta: ScrapeMeta::new(config, Family::IsolationSegments)?,
            info: gauge_vec(
                config,
                "isolation_segment",
                "info",
                "Labeled Cloud Foundry Isolation Segment information with a constant '1' value.",
                &["isolation_segment_id", "isolation_segment_name"],
            )?,
        })
    }
}

impl Emitter for IsolationSegmentsEmitter {
    fn family(&self) -> Family {
        Family::IsolationSegments
    }

    fn meta(&self) -> &ScrapeMeta {
        &self.meta
    }

    fn metrics(&self) -> Vec<&dyn Collector> {
        vec![&self.info]
    }

    fn project(&self, snapshot: &Snapshot, _now: DateTime<Utc>) -> usize {
        for segment in snapshot.isolation_segments.values() {
            self.info
                .with_label_values(&[&segment.guid, &segment.name])
                .set(1.0);
        }
        0
    }

    fn reset(&self) {
        self.info.reset();
    }
}
