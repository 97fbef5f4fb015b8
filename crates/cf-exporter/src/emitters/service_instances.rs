use chrono::{DateTime, Utc};
use prometheus::core::Collector;
use prometheus::GaugeVec;

use super::{gauge_vec, Emitter, ScrapeMeta};
use crate::config::MetricsConfig;
use crate::error::Result;
use crate::filter::Family;
use crate::snapshot::Snapshot;

pub struct ServiceInstancesEmitter {
    meta: ScrapeMeta,
    info: GaugeVec,
}

impl ServiceInstancesEmitter {
    pub fn new(config: &MetricsConfig) -> Result<Self> {
        Ok(Self {
            meta: ScrapeMeta::new(config, Family::ServiceInstances)?,
            info: gauge_vec(
                config,
                "service_instance",
                "info",
                "Labeled Cloud Foundry Service Instance information with a constant '1' value.",
                &[
                    "service_instance_id",
                    "service_instance_name",
                    "service_plan_id",
                    "space_id",
                    "type",
                    "last_operation_type",
                    "last_operation_state",
                ],
            )?,
        })
    }
}

impl Emitter for ServiceInstancesEmitter {
    fn family(&self) -> Family {
        Family::ServiceInstances
    }

    fn meta(&self) -> &ScrapeMeta {
        &self.meta
    }

    fn metrics(&self) -> Vec<&dyn Collector> {
        vec![&self.info]
    }

    fn project(&self, snapshot: &Snapshot, _now: DateTime<Utc>) -> usize {
        for instance in snapshot.service_instances.values() {
            let rel = &instance.relationships;
            let (op_type, op_state) = instance
                .last_operation
                .as_ref()
                .map(|op| (op.kind.as_str(), op.state.as_str()))
                .unwrap_or(("", ""));
            self.info
                .with_label_values(&[
                    &instance.guid,
                    &instance.name,
                    rel.guid("service_plan").unwrap_or(""),
                    rel.guid("space").unwrap_or(""),
                    &instance.kind,
                    op_type,
                    op_state,
                ])
                .set(1.0);
        }
        0
    }

    fn reset(&self) {
        self.info.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emitters::testing::*;
    use cf_client::models::{LastOperation, Relationships, ServiceInstance};

    #[test]
    fn test_last_operation_labels() {
        let mut snapshot = Snapshot::new();
        snapshot.service_instances.insert(
            "si1".to_string(),
            ServiceInstance {
                guid: "si1".to_string(),
                name: "db".to_string(),
                kind: "managed".to_string(),
                last_operation: Some(LastOperation {
                    kind: "create".to_string(),
                    state: "succeeded".to_string(),
                }),
                relationships: Relationships::from_pairs([
                    ("service_plan", "plan1"),
                    ("space", "sp1"),
                ]),
            },
        );
        snapshot.service_instances.insert(
            "si2".to_string(),
            ServiceInstance {
                guid: "si2".to_string(),
                name: "logs".to_string(),
                kind: "user-provided".to_string(),
                ..ServiceInstance::default()
            },
        );
        let emitter = ServiceInstancesEmitter::new(&config()).unwrap();
        emitter.collect(&snapshot, Utc::now());
        let info = samples(&emitter, "cf_service_instance_info");
        assert_eq!(info.len(), 2);
        let db = info
            .iter()
            .find(|(l, _)| label(l, "service_instance_id") == "si1")
            .unwrap();
        assert_eq!(label(&db.0, "last_operation_type"), "create");
        assert_eq!(label(&db.0, "service_plan_id"), "plan1");
        let ups = info
            .iter()
            .find(|(l, _)| label(l, "service_instance_id") == "si2")
            .unwrap();
        assert_eq!(label(&ups.0, "last_operation_state"), "");
    }
}
