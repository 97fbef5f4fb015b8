//! Per-scrape object graph of the platform inventory.

use std::collections::HashMap;
use std::fmt;

use cf_client::models::{
    ActualLrp, AppSummary, Application, Buildpack, Domain, Droplet, Event, Info,
    IsolationSegment, Organization, Process, Quota, Route, RouteBinding, SecurityGroup,
    ServiceBinding, ServiceBroker, ServiceInstance, ServiceOffering, ServicePlan, Space,
    SpaceSummary, Stack, Task, User,
};

/// Why a snapshot is unusable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The CF or BBS client could not be built.
    Connect,
    /// A planned job failed.
    Fetch,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotError {
    pub kind: FailureKind,
    pub message: String,
}

impl fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            FailureKind::Connect => write!(f, "connect: {}", self.message),
            FailureKind::Fetch => write!(f, "fetch: {}", self.message),
        }
    }
}

/// Everything fetched during one scrape, keyed by GUID.
///
/// Only the fetcher writes to a snapshot; emitters receive it by shared
/// reference once fetching is complete.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub info: Info,
    pub orgs: HashMap<String, Organization>,
    pub org_quotas: HashMap<String, Quota>,
    pub spaces: HashMap<String, Space>,
    pub space_quotas: HashMap<String, Quota>,
    pub apps: HashMap<String, Application>,
    pub processes: HashMap<String, Process>,
    pub tasks: HashMap<String, Task>,
    pub routes: HashMap<String, Route>,
    pub route_bindings: HashMap<String, RouteBinding>,
    pub service_route_bindings: HashMap<String, RouteBinding>,
    pub isolation_segments: HashMap<String, IsolationSegment>,
    pub service_instances: HashMap<String, ServiceInstance>,
    pub security_groups: HashMap<String, SecurityGroup>,
    pub stacks: HashMap<String, Stack>,
    pub buildpacks: HashMap<String, Buildpack>,
    pub domains: HashMap<String, Domain>,
    pub service_brokers: HashMap<String, ServiceBroker>,
    pub service_offerings: HashMap<String, ServiceOffering>,
    pub service_plans: HashMap<String, ServicePlan>,
    pub service_bindings: HashMap<String, ServiceBinding>,
    pub users: HashMap<String, User>,
    pub events: HashMap<String, Event>,

    /// Processes of each application, in listing order.
    pub app_processes: HashMap<String, Vec<Process>>,
    /// Newest staged droplet of each application.
    pub app_droplets: HashMap<String, Droplet>,
    pub space_summaries: HashMap<String, SpaceSummary>,
    pub app_summaries: HashMap<String, AppSummary>,
    /// ActualLRPs by CC process GUID.
    pub process_actual_lrps: HashMap<String, Vec<ActualLrp>>,
    /// Whether BBS was queried during this scrape.
    pub actual_lrps_loaded: bool,

    /// Seconds spent fetching.
    pub took: f64,
    pub error: Option<SnapshotError>,
}

/// Collects `(guid, value)` pairs into a GUID-keyed map.
pub fn by_guid<T>(items: Vec<T>, guid: impl Fn(&T) -> &str) -> HashMap<String, T> {
    items
        .into_iter()
        .map(|item| (guid(&item).to_string(), item))
        .collect()
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_processes(&mut self, processes: Vec<Process>) {
        for process in &processes {
            match process.app_guid() {
                Some(app_guid) => self
                    .app_processes
                    .entry(app_guid.to_string())
                    .or_default()
                    .push(process.clone()),
                None => tracing::warn!(process_guid = %process.guid, "process without app relationship"),
            }
        }
        self.processes = by_guid(processes, |p| &p.guid);
    }

    /// Keeps the most recently created staged droplet per application.
    pub fn set_droplets(&mut self, droplets: Vec<Droplet>) {
        for droplet in droplets {
            let Some(app_guid) = droplet.app_guid().map(str::to_string) else {
                continue;
            };
            match self.app_droplets.get(&app_guid) {
                Some(current) if current.created_at >= droplet.created_at => {}
                _ => {
                    self.app_droplets.insert(app_guid, droplet);
                }
            }
        }
    }

    pub fn add_space_summary(&mut self, summary: SpaceSummary) {
        for app in &summary.apps {
            self.app_summaries.insert(app.guid.clone(), app.clone());
        }
        self.space_summaries.insert(summary.guid.clone(), summary);
    }

    pub fn set_actual_lrps(&mut self, lrps: Vec<ActualLrp>) {
        self.process_actual_lrps.clear();
        self.actual_lrps_loaded = true;
        for lrp in lrps {
            self.process_actual_lrps
                .entry(lrp.cc_process_guid().to_string())
                .or_default()
                .push(lrp);
        }
    }

    /// The `web` process of an app, or its first process.
    pub fn web_process(&self, app_guid: &str) -> Option<&Process> {
        let processes = self.app_processes.get(app_guid)?;
        processes
            .iter()
            .find(|p| p.kind == "web")
            .or_else(|| processes.first())
    }

    pub fn stack_by_name(&self, name: &str) -> Option<&Stack> {
        self.stacks.values().find(|s| s.name == name)
    }

    /// Running instances of a process: RUNNING ActualLRPs when BBS data is
    /// present, otherwise the CC space summary count.
    pub fn running_instances(&self, app_guid: &str, process_guid: &str) -> i64 {
        if self.actual_lrps_loaded {
            return self
                .process_actual_lrps
                .get(process_guid)
                .map(|lrps| lrps.iter().filter(|l| l.is_running()).count() as i64)
                .unwrap_or(0);
        }
        self.app_summaries
            .get(app_guid)
            .map(|summary| summary.running_instances)
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cf_client::models::{ActualLrpKey, Link, Relationships};
    use chrono::{TimeZone, Utc};

    fn process(guid: &str, app: &str, kind: &str) -> Process {
        Process {
            guid: guid.to_string(),
            kind: kind.to_string(),
            relationships: Relationships::from_pairs([("app", app)]),
            ..Process::default()
        }
    }

    fn droplet(guid: &str, app: &str, secs: i64) -> Droplet {
        Droplet {
            guid: guid.to_string(),
            state: "STAGED".to_string(),
            created_at: Some(Utc.timestamp_opt(secs, 0).unwrap()),
            links: [(
                "app".to_string(),
                Link {
                    href: format!("https://api.example.com/v3/apps/{}", app),
                },
            )]
            .into_iter()
            .collect(),
            ..Droplet::default()
        }
    }

    fn lrp(process_guid: &str, state: &str) -> ActualLrp {
        ActualLrp {
            actual_lrp_key: ActualLrpKey {
                process_guid: process_guid.to_string(),
                ..ActualLrpKey::default()
            },
            state: state.to_string(),
        }
    }

    #[test]
    fn test_new_snapshot_is_empty() {
        let snapshot = Snapshot::new();
        assert!(snapshot.apps.is_empty());
        assert!(snapshot.app_processes.is_empty());
        assert!(snapshot.error.is_none());
        assert_eq!(snapshot.took, 0.0);
    }

    #[test]
    fn test_web_process_preferred() {
        let mut snapshot = Snapshot::new();
        snapshot.set_processes(vec![
            process("p1", "app1", "worker"),
            process("p2", "app1", "web"),
            process("p3", "app2", "worker"),
        ]);
        assert_eq!(snapshot.web_process("app1").unwrap().guid, "p2");
        assert_eq!(snapshot.web_process("app2").unwrap().guid, "p3");
        assert!(snapshot.web_process("app3").is_none());
        assert_eq!(snapshot.processes.len(), 3);
    }

    #[test]
    fn test_newest_droplet_wins() {
        let mut snapshot = Snapshot::new();
        snapshot.set_droplets(vec![
            droplet("d-old", "app1", 100),
            droplet("d-new", "app1", 200),
            droplet("d-mid", "app1", 150),
        ]);
        assert_eq!(snapshot.app_droplets["app1"].guid, "d-new");
    }

    #[test]
    fn test_running_instances_from_lrps() {
        let mut snapshot = Snapshot::new();
        let guid = "aaaaaaaa-bbbb-cccc-dddd-eeeeeeeeeeee";
        snapshot.set_actual_lrps(vec![
            lrp(&format!("{}-v1", guid), "RUNNING"),
            lrp(&format!("{}-v1", guid), "CRASHED"),
        ]);
        assert_eq!(snapshot.running_instances("app1", guid), 1);
        assert_eq!(snapshot.running_instances("app1", "unknown"), 0);
    }

    #[test]
    fn test_running_instances_falls_back_to_summary() {
        let mut snapshot = Snapshot::new();
        snapshot.add_space_summary(SpaceSummary {
            guid: "sp1".to_string(),
            name: "dev".to_string(),
            apps: vec![AppSummary {
                guid: "app1".to_string(),
                running_instances: 3,
                ..AppSummary::default()
            }],
        });
        assert_eq!(snapshot.running_instances("app1", "p1"), 3);
        assert!(snapshot.space_summaries.contains_key("sp1"));
    }
}
