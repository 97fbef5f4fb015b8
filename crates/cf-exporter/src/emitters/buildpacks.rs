use chrono::{DateTime, Utc};
use prometheus::core::Collector;
use prometheus::GaugeVec;

use super::{gauge_vec, Emitter, ScrapeMeta};
use crate::config::MetricsConfig;
use crate::error::Result;
use crate::filter::Family;
use crate::snapshot::Snapshot;

pub struct BuildpacksEmitter {
    meta: ScrapeMeta,
    info: GaugeVec,
}

impl BuildpacksEmitter {
    pub fn new(config: &MetricsConfig) -> Result<Self> {
        Ok(Self {
            meta: ScrapeMeta::new(config, Family::Buildpacks)?,
            info: gauge_vec(
                config,
                "buildpack",
                "info",
                "Labeled Cloud Foundry Buildpack information with a constant '1' value.",
                &[
                    "buildpack_id",
                    "buildpack_name",
                    "buildpack_stack",
                    "buildpack_filename",
                    "buildpack_enabled",
                    "buildpack_locked",
                ],
            )?,
        })
    }
}

impl Emitter for BuildpacksEmitter {
    fn family(&self) -> Family {
        Family::Buildpacks
    }

    fn meta(&self) -> &ScrapeMeta {
        &self.meta
    }

    fn metrics(&self) -> Vec<&dyn Collector> {
        vec![&self.info]
    }

    fn project(&self, snapshot: &Snapshot, _now: DateTime<Utc>) -> usize {
        for bp in snapshot.buildpacks.values() {
            self.info
                .with_label_values(&[
                    &bp.guid,
                    &bp.name,
                    bp.stack.as_deref().unwrap_or(""),
                    bp.filename.as_deref().unwrap_or(""),
                    if bp.enabled { "true" } else { "false" },
                    if bp.locked { "true" } else { "false" },
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
    use cf_client::models::Buildpack;

    #[test]
    fn test_unset_stack_is_empty_label() {
        let mut snapshot = Snapshot::new();
        snapshot.buildpacks.insert(
            "bp1".to_string(),
            Buildpack {
                guid: "bp1".to_string(),
                name: "go_buildpack".to_string(),
                stack: None,
                filename: Some("go_buildpack-v1.10.zip".to_string()),
                position: 1,
                enabled: true,
                locked: false,
            },
        );
        let emitter = BuildpacksEmitter::new(&config()).unwrap();
        emitter.collect(&snapshot, Utc::now());
        let info = samples(&emitter, "cf_buildpack_info");
        assert_eq!(info.len(), 1);
        assert_eq!(label(&info[0].0, "buildpack_stack"), "");
        assert_eq!(label(&info[0].0, "buildpack_enabled"), "true");
        assert_eq!(label(&info[0].0, "buildpack_filename"), "go_buildpack-v1.10.zip");
    }
}
