use cf_client::models::{Application, DropletBuildpack};
use chrono::{DateTime, Utc};
use prometheus::core::Collector;
use prometheus::GaugeVec;
use tracing::warn;

use super::{gauge_vec, Emitter, ScrapeMeta};
use crate::config::MetricsConfig;
use crate::error::Result;
use crate::filter::Family;
use crate::snapshot::Snapshot;

const SCOPE_LABELS: [&str; 6] = [
    "application_id",
    "application_name",
    "organization_id",
    "organization_name",
    "space_id",
    "space_name",
];

pub struct ApplicationsEmitter {
    meta: ScrapeMeta,
    info: GaugeVec,
    buildpack: GaugeVec,
    instances: GaugeVec,
    instances_running: GaugeVec,
    memory_mb: GaugeVec,
    disk_quota_mb: GaugeVec,
}

/// An application with every cross reference resolved.
struct Resolved<'a> {
    org_guid: &'a str,
    org_name: &'a str,
    space_guid: &'a str,
    space_name: &'a str,
    stack_guid: &'a str,
}

fn buildpack_name(entry: &DropletBuildpack) -> &str {
    entry.buildpack_name.as_deref().unwrap_or("")
}

fn detected(entry: &DropletBuildpack) -> &str {
    entry.detect_output.as_deref().unwrap_or("")
}

impl ApplicationsEmitter {
    pub fn new(config: &MetricsConfig) -> Result<Self> {
        let with_state: Vec<&str> = SCOPE_LABELS.iter().copied().chain(["state"]).collect();
        Ok(Self {
            meta: ScrapeMeta::new(config, Family::Applications)?,
            info: gauge_vec(
                config,
                "application",
                "info",
                "Labeled Cloud Foundry Application information with a constant '1' value.",
                &[
                    "application_id",
                    "application_name",
                    "detected_buildpack",
                    "buildpack",
                    "organization_id",
                    "organization_name",
                    "space_id",
                    "space_name",
                    "stack_id",
                    "state",
                ],
            )?,
            buildpack: gauge_vec(
                config,
                "application",
                "buildpack",
                "Buildpacks used by a Cloud Foundry Application with a constant '1' value.",
                &[
                    "application_id",
                    "application_name",
                    "buildpack_name",
                    "detected_buildpack",
                ],
            )?,
            instances: gauge_vec(
                config,
                "application",
                "instances",
                "Number of desired Cloud Foundry Application Instances.",
                &with_state,
            )?,
            instances_running: gauge_vec(
                config,
                "application",
                "instances_running",
                "Number of running Cloud Foundry Application Instances.",
                &with_state,
            )?,
            memory_mb: gauge_vec(
                config,
                "application",
                "memory_mb",
                "Cloud Foundry Application Memory (Mb).",
                &SCOPE_LABELS,
            )?,
            disk_quota_mb: gauge_vec(
                config,
                "application",
                "disk_quota_mb",
                "Cloud Foundry Application Disk Quota (Mb).",
                &SCOPE_LABELS,
            )?,
        })
    }

    fn resolve<'a>(&self, snapshot: &'a Snapshot, app: &'a Application) -> Option<Resolved<'a>> {
        let Some(space_guid) = app.relationships.guid("space") else {
            warn!(app_guid = %app.guid, "application has no space relationship");
            return None;
        };
        let Some(space) = snapshot.spaces.get(space_guid) else {
            warn!(app_guid = %app.guid, space_guid, "application references unknown space");
            return None;
        };
        let org_guid = space.relationships.guid("organization").unwrap_or("");
        let Some(org) = snapshot.orgs.get(org_guid) else {
            warn!(app_guid = %app.guid, org_guid, "space references unknown organization");
            return None;
        };
        let stack_guid = match app.lifecycle.data.stack.as_deref() {
            Some(name) if !name.is_empty() && !snapshot.stacks.is_empty() => {
                match snapshot.stack_by_name(name) {
                    Some(stack) => stack.guid.as_str(),
                    None => {
                        warn!(app_guid = %app.guid, stack = name, "application references unknown stack");
                        return None;
                    }
                }
            }
            _ => "",
        };
        Some(Resolved {
            org_guid: &org.guid,
            org_name: &org.name,
            space_guid: &space.guid,
            space_name: &space.name,
            stack_guid,
        })
    }
}

impl Emitter for ApplicationsEmitter {
    fn family(&self) -> Family {
        Family::Applications
    }

    fn meta(&self) -> &ScrapeMeta {
        &self.meta
    }

    fn metrics(&self) -> Vec<&dyn Collector> {
        vec![
            &self.info,
            &self.buildpack,
            &self.instances,
            &self.instances_running,
            &self.memory_mb,
            &self.disk_quota_mb,
        ]
    }

    fn project(&self, snapshot: &Snapshot, _now: DateTime<Utc>) -> usize {
        let mut skipped = 0;
        for app in snapshot.apps.values() {
            let Some(process) = snapshot.web_process(&app.guid) else {
                warn!(app_guid = %app.guid, "application has no processes");
                skipped += 1;
                continue;
            };
            let Some(r) = self.resolve(snapshot, app) else {
                skipped += 1;
                continue;
            };
            let state = app.state.as_str();

            let entries = snapshot
                .app_droplets
                .get(&app.guid)
                .map(|d| d.buildpacks.as_slice())
                .unwrap_or_default();
            let (mut detected_bp, mut bp) = entries
                .first()
                .map(|e| (detected(e), buildpack_name(e)))
                .unwrap_or(("", ""));
            if detected_bp.is_empty() {
                detected_bp = bp;
            }
            if bp.is_empty() {
                bp = detected_bp;
            }

            self.info
                .with_label_values(&[
                    &app.guid,
                    &app.name,
                    detected_bp,
                    bp,
                    r.org_guid,
                    r.org_name,
                    r.space_guid,
                    r.space_name,
                    r.stack_guid,
                    state,
                ])
                .set(1.0);
            for entry in entries {
                self.buildpack
                    .with_label_values(&[&app.guid, &app.name, buildpack_name(entry), detected(entry)])
                    .set(1.0);
            }

            let scope = [
                app.guid.as_str(),
                app.name.as_str(),
                r.org_guid,
                r.org_name,
                r.space_guid,
                r.space_name,
            ];
            let with_state = [
                scope[0], scope[1], scope[2], scope[3], scope[4], scope[5], state,
            ];
            self.instances
                .with_label_values(&with_state)
                .set(process.instances as f64);
            self.instances_running
                .with_label_values(&with_state)
                .set(snapshot.running_instances(&app.guid, &process.guid) as f64);
            self.memory_mb
                .with_label_values(&scope)
                .set(process.memory_in_mb as f64);
            self.disk_quota_mb
                .with_label_values(&scope)
                .set(process.disk_in_mb as f64);
        }
        skipped
    }

    fn reset(&self) {
        for metric in [
            &self.info,
            &self.buildpack,
            &self.instances,
            &self.instances_running,
            &self.memory_mb,
            &self.disk_quota_mb,
        ] {
            metric.reset();
        }
    }
}
