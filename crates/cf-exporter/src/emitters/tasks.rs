use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use prometheus::core::Collector;
use prometheus::GaugeVec;

use super::{gauge_vec, Emitter, ScrapeMeta};
use crate::config::MetricsConfig;
use crate::error::Result;
use crate::filter::Family;
use crate::snapshot::Snapshot;

/// Application label for tasks whose app relationship is missing.
pub const UNAVAILABLE_APP: &str = "unavailable";

#[derive(Debug)]
struct TaskGroup {
    count: usize,
    memory_mb: i64,
    disk_mb: i64,
    oldest: DateTime<Utc>,
}

/// Tasks aggregated per `(application_id, state)`.
pub struct TasksEmitter {
    meta: ScrapeMeta,
    info: GaugeVec,
    count: GaugeVec,
    memory_mb_sum: GaugeVec,
    disk_quota_mb_sum: GaugeVec,
    oldest_created_at: GaugeVec,
}

impl TasksEmitter {
    pub fn new(config: &MetricsConfig) -> Result<Self> {
        let labels = ["application_id", "state"];
        let gauge = |name: &str, help: &str| gauge_vec(config, "task", name, help, &labels);
        Ok(Self {
            meta: ScrapeMeta::new(config, Family::Tasks)?,
            info: gauge(
                "info",
                "Labeled Cloud Foundry Task information with a constant '1' value.",
            )?,
            count: gauge("count", "Number of Cloud Foundry Tasks.")?,
            memory_mb_sum: gauge(
                "memory_mb_sum",
                "Sum of Cloud Foundry Tasks Memory (Mb).",
            )?,
            disk_quota_mb_sum: gauge(
                "disk_quota_mb_sum",
                "Sum of Cloud Foundry Tasks Disk Quota (Mb).",
            )?,
            oldest_created_at: gauge(
                "oldest_created_at",
                "Number of seconds since 1970 of creation time of the oldest Cloud Foundry Task.",
            )?,
        })
    }

    fn all(&self) -> [&GaugeVec; 5] {
        [
            &self.info,
            &self.count,
            &self.memory_mb_sum,
            &self.disk_quota_mb_sum,
            &self.oldest_created_at,
        ]
    }
}

impl Emitter for TasksEmitter {
    fn family(&self) -> Family {
        Family::Tasks
    }

    fn meta(&self) -> &ScrapeMeta {
        &self.meta
    }

    fn metrics(&self) -> Vec<&dyn Collector> {
        self.all().into_iter().map(|g| g as &dyn Collector).collect()
    }

    fn project(&self, snapshot: &Snapshot, _now: DateTime<Utc>) -> usize {
        let mut groups: BTreeMap<(&str, &str), TaskGroup> = BTreeMap::new();
        for task in snapshot.tasks.values() {
            let app = task
                .relationships
                .guid("app")
                .filter(|guid| !guid.is_empty())
                .unwrap_or(UNAVAILABLE_APP);
            let group = groups
                .entry((app, task.state.as_str()))
                .or_insert_with(|| TaskGroup {
                    count: 0,
                    memory_mb: 0,
                    disk_mb: 0,
                    oldest: task.created_at,
                });
            group.count += 1;
            group.memory_mb += task.memory_in_mb;
            group.disk_mb += task.disk_in_mb;
            group.oldest = group.oldest.min(task.created_at);
        }

        for ((app, state), group) in &groups {
            let labels = [*app, *state];
            self.info.with_label_values(&labels).set(1.0);
            self.count.with_label_values(&labels).set(group.count as f64);
            self.memory_mb_sum
                .with_label_values(&labels)
                .set(group.memory_mb as f64);
            self.disk_quota_mb_sum
                .with_label_values(&labels)
                .set(group.disk_mb as f64);
            self.oldest_created_at
                .with_label_values(&labels)
                .set(group.oldest.timestamp() as f64);
        }
        0
    }

    fn reset(&self) {
        for gauge in self.all() {
            gauge.reset();
        }
    }
}
