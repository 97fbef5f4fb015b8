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

pub struct SpacesEmitter {
    meta: ScrapeMeta,
    info: GaugeVec,
    quotas: QuotaMetrics,
}

impl SpacesEmitter {
    pub fn new(config: &MetricsConfig) -> Result<Self> {
        Ok(Self {
            meta: ScrapeMeta::new(config, Family::Spaces)?,
            info: gauge_vec(
                config,
                "space",
                "info",
                "Labeled Cloud Foundry Space information with a constant '1' value.",
                &["space_id", "space_name", "organization_id", "quota_name"],
            )?,
            quotas: QuotaMetrics::new(
                config,
                "space",
                &["space_id", "space_name", "organization_id"],
                false,
            )?,
        })
    }
}

impl Emitter for SpacesEmitter {
    fn family(&self) -> Family {
        Family::Spaces
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
        for space in snapshot.spaces.values() {
            let org_guid = space.relationships.guid("organization").unwrap_or("");
            let quota = match space.relationships.guid("quota") {
                Some(guid) => {
                    let quota = snapshot.space_quotas.get(guid);
                    if quota.is_none() {
                        warn!(space_guid = %space.guid, quota_guid = guid, "space references unknown quota");
                        skipped += 1;
                    }
                    quota
                }
                None => None,
            };
            let quota_name = quota.map(|q| q.name.as_str()).unwrap_or("");
            self.info
                .with_label_values(&[&space.guid, &space.name, org_guid, quota_name])
                .set(1.0);
            if let Some(quota) = quota {
                self.quotas.set(&[&space.guid, &space.name, org_guid], quota);
            }
        }
        skipped
    }

    fn reset(&self) {
        self.info.reset();
        self.quotas.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emitters::testing::*;
    use cf_client::models::{Quota, Relationships, RoutesQuota, Space};

    #[test]
    fn test_space_with_and_without_quota() {
        let mut snapshot = Snapshot::new();
        snapshot.spaces.insert(
            "sp1".to_string(),
            Space {
                guid: "sp1".to_string(),
                name: "dev".to_string(),
                relationships: Relationships::from_pairs([
                    ("organization", "org1"),
                    ("quota", "sp_q"),
                ]),
            },
        );
        snapshot.spaces.insert(
            "sp2".to_string(),
            Space {
                guid: "sp2".to_string(),
                name: "prod".to_string(),
                relationships: Relationships::from_pairs([("organization", "org1")]),
            },
        );
        snapshot.space_quotas.insert(
            "sp_q".to_string(),
            Quota {
                guid: "sp_q".to_string(),
                name: "small".to_string(),
                routes: RoutesQuota {
                    total_routes: Some(10),
                    total_reserved_ports: None,
                },
                ..Quota::default()
            },
        );

        let emitter = SpacesEmitter::new(&config()).unwrap();
        emitter.collect(&snapshot, Utc::now());

        let mut info = samples(&emitter, "cf_space_info");
        info.sort_by(|a, b| label(&a.0, "space_id").cmp(label(&b.0, "space_id")));
        assert_eq!(info.len(), 2);
        assert_eq!(label(&info[0].0, "quota_name"), "small");
        assert_eq!(label(&info[0].0, "organization_id"), "org1");
        assert_eq!(label(&info[1].0, "quota_name"), "");

        let routes = samples(&emitter, "cf_space_total_routes_quota");
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].1, 10.0);
        assert_eq!(value(&emitter, "cf_space_total_reserved_route_ports_quota"), Some(-1.0));
        assert!(emitter
            .describe()
            .iter()
            .all(|d| d.fq_name != "cf_space_total_private_domains_quota"));
        assert_eq!(value(&emitter, "cf_spaces_scrape_errors_total"), Some(0.0));
    }
}
