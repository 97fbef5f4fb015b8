use chrono::{DateTime, Utc};
use prometheus::core::Collector;
use prometheus::GaugeVec;
use tracing::warn;

use super::quota::QuotaMetrics;
use super::{gauge_vec, Emitter, ScrapeMeta};
use crate::config::MetricsConfig;
use crate::error::Result;
use crate::filter::Family;
use crate::snapshot::Snapshot;

pub struct OrganizationsEmitter {
    meta: ScrapeMeta,
    info: GaugeVec,
    quotas: QuotaMetrics,
}

impl OrganizationsEmitter {
    pub fn new(config: &MetricsConfig) -> Result<Self> {
        Ok(Self {
            meta: ScrapeMeta::new(config, Family::Organizations)?,
            info: gauge_vec(
                config,
                "organization",
                "info",
                "Labeled Cloud Foundry Organization information with a constant '1' value.",
                &["organization_id", "organization_name", "quota_name", "suspended"],
            )?,
            quotas: QuotaMetrics::new(
                config,
                "organization",
                &["organization_id", "organization_name"],
                true,
            )?,
        })
    }
}

impl Emitter for OrganizationsEmitter {
    fn family(&self) -> Family {
        Family::Organizations
    }

    fn meta(&self) -> &ScrapeMeta {
        &self.meta
    }

    fn metrics(&self) -> Vec<&dyn Collector> {
        let mut metrics: Vec<&dyn Collector> = vec![&self.info];
        metrics.extend(self.quotas.collectors());
        metrics
    }

    fn project(&self, snapshot: &Snapshot, _now: DateTime<Utc>) -> usize {
        let mut skipped = 0;
        for org in snapshot.orgs.values() {
            let quota = match org.relationships.guid("quota") {
                Some(guid) => match snapshot.org_quotas.get(guid) {
                    Some(quota) => Some(quota),
                    None => {
                        warn!(org_guid = %org.guid, quota_guid = guid, "organization references unknown quota");
                        skipped += 1;
                        None
                    }
                },
                None => None,
            };
            let quota_name = quota.map(|q| q.name.as_str()).unwrap_or("");
            let suspended = if org.suspended { "true" } else { "false" };
            self.info
                .with_label_values(&[&org.guid, &org.name, quota_name, suspended])
                .set(1.0);
            if let Some(quota) = quota {
                self.quotas.set(&[&org.guid, &org.name], quota);
            }
        }
        skipped
    }

    fn reset(&self) {
        self.info.reset();
        self.quotas.reset();
    }
}
