#![allow(dead_code)]

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use cf_client::models::*;
use cf_client::session::{events_after, DEFAULT_TASK_STATES};
use cf_client::{BbsApi, CfApi, ClientError, Result};
use cf_exporter::{Clock, Connector, Fetcher, Filter, MetricsConfig, ScrapeComposer};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

/// In-memory Cloud Controller.
#[derive(Default)]
pub struct StubCf {
    pub info: Info,
    pub orgs: Vec<Organization>,
    pub org_quotas: Vec<Quota>,
    pub spaces: Vec<Space>,
    pub space_quotas: Vec<Quota>,
    pub apps: Vec<Application>,
    pub processes: Vec<Process>,
    pub droplets: Vec<Droplet>,
    pub domains: Vec<Domain>,
    pub routes: Vec<Route>,
    pub route_bindings: Vec<RouteBinding>,
    pub security_groups: Vec<SecurityGroup>,
    pub stacks: Vec<Stack>,
    pub buildpacks: Vec<Buildpack>,
    pub tasks: Vec<Task>,
    pub service_brokers: Vec<ServiceBroker>,
    pub service_offerings: Vec<ServiceOffering>,
    pub service_instances: Vec<ServiceInstance>,
    pub service_plans: Vec<ServicePlan>,
    pub service_bindings: Vec<ServiceBinding>,
    pub isolation_segments: Vec<IsolationSegment>,
    pub users: Vec<User>,
    pub events: Vec<Event>,
    /// Space GUIDs whose summary answers 404.
    pub stale_spaces: HashSet<String>,
    /// Endpoints answering 500.
    pub failing: HashSet<&'static str>,
    pub calls: Mutex<Vec<String>>,
}

impl StubCf {
    fn call<T: Clone>(&self, endpoint: &'static str, items: &[T]) -> Result<Vec<T>> {
        self.calls.lock().push(endpoint.to_string());
        if self.failing.contains(endpoint) {
            return Err(ClientError::Status {
                endpoint: endpoint.to_string(),
                status: 500,
            });
        }
        Ok(items.to_vec())
    }

    pub fn called(&self) -> Vec<String> {
        let mut calls = self.calls.lock().clone();
        calls.sort();
        calls.dedup();
        calls
    }
}

#[async_trait]
impl CfApi for StubCf {
    async fn get_info(&self) -> Result<Info> {
        self.call("/v3/info", &[self.info.clone()])
            .map(|mut v| v.remove(0))
    }
    async fn list_organizations(&self) -> Result<Vec<Organization>> {
        self.call("/v3/organizations", &self.orgs)
    }
    async fn list_organization_quotas(&self) -> Result<Vec<Quota>> {
        self.call("/v3/organization_quotas", &self.org_quotas)
    }
    async fn list_spaces(&self) -> Result<Vec<Space>> {
        self.call("/v3/spaces", &self.spaces)
    }
    async fn list_space_quotas(&self) -> Result<Vec<Quota>> {
        self.call("/v3/space_quotas", &self.space_quotas)
    }
    async fn list_applications(&self) -> Result<Vec<Application>> {
        self.call("/v3/apps", &self.apps)
    }
    async fn list_processes(&self) -> Result<Vec<Process>> {
        self.call("/v3/processes", &self.processes)
    }
    async fn list_droplets(&self) -> Result<Vec<Droplet>> {
        self.call("/v3/droplets", &self.droplets)
    }
    async fn list_domains(&self) -> Result<Vec<Domain>> {
        self.call("/v3/domains", &self.domains)
    }
    async fn list_routes(&self) -> Result<Vec<Route>> {
        self.call("/v3/routes", &self.routes)
    }
    async fn list_route_bindings(&self) -> Result<Vec<RouteBinding>> {
        self.call("/v3/service_route_bindings", &self.route_bindings)
    }
    async fn list_security_groups(&self) -> Result<Vec<SecurityGroup>> {
        self.call("/v3/security_groups", &self.security_groups)
    }
    async fn list_stacks(&self) -> Result<Vec<Stack>> {
        self.call("/v3/stacks", &self.stacks)
    }
    async fn list_buildpacks(&self) -> Result<Vec<Buildpack>> {
        self.call("/v3/buildpacks", &self.buildpacks)
    }
    async fn list_tasks(&self, states: &[String]) -> Result<Vec<Task>> {
        let wanted = |state: &str| {
            if states.is_empty() {
                DEFAULT_TASK_STATES.contains(&state)
            } else {
                states.iter().any(|s| s == state)
            }
        };
        let tasks: Vec<Task> = self
            .tasks
            .iter()
            .filter(|t| wanted(&t.state))
            .cloned()
            .collect();
        self.call("/v3/tasks", &tasks)
    }
    async fn list_service_brokers(&self) -> Result<Vec<ServiceBroker>> {
        self.call("/v3/service_brokers", &self.service_brokers)
    }
    async fn list_service_offerings(&self) -> Result<Vec<ServiceOffering>> {
        self.call("/v3/service_offerings", &self.service_offerings)
    }
    async fn list_service_instances(&self) -> Result<Vec<ServiceInstance>> {
        self.call("/v3/service_instances", &self.service_instances)
    }
    async fn list_service_plans(&self) -> Result<Vec<ServicePlan>> {
        self.call("/v3/service_plans", &self.service_plans)
    }
    async fn list_service_bindings(&self) -> Result<Vec<ServiceBinding>> {
        self.call("/v3/service_credential_bindings", &self.service_bindings)
    }
    async fn list_isolation_segments(&self) -> Result<Vec<IsolationSegment>> {
        self.call("/v3/isolation_segments", &self.isolation_segments)
    }
    async fn list_users(&self) -> Result<Vec<User>> {
        self.call("/v3/users", &self.users)
    }
    async fn list_events(&self, since: DateTime<Utc>) -> Result<Vec<Event>> {
        self.call("/v3/audit_events", &self.events)
            .map(|events| events_after(events, since))
    }
    async fn get_space_summary(&self, space_guid: &str) -> Result<Option<SpaceSummary>> {
        self.calls.lock().push("/v2/spaces/summary".to_string());
        if self.stale_spaces.contains(space_guid) {
            return Ok(None);
        }
        let apps = self
            .apps
            .iter()
            .filter(|a| a.relationships.guid("space") == Some(space_guid))
            .map(|a| AppSummary {
                guid: a.guid.clone(),
                name: a.name.clone(),
                ..AppSummary::default()
            })
            .collect();
        Ok(Some(SpaceSummary {
            guid: space_guid.to_string(),
            name: String::new(),
            apps,
        }))
    }
}

#[derive(Default)]
pub struct StubBbs {
    pub lrps: Vec<ActualLrp>,
}

#[async_trait]
impl BbsApi for StubBbs {
    async fn list_actual_lrps(&self) -> Result<Vec<ActualLrp>> {
        Ok(self.lrps.clone())
    }
}

pub struct StubConnector {
    pub cf: Arc<StubCf>,
    pub bbs: Option<Arc<StubBbs>>,
    pub bbs_fails: bool,
}

impl StubConnector {
    pub fn new(cf: StubCf, bbs: Option<StubBbs>) -> Self {
        Self {
            cf: Arc::new(cf),
            bbs: bbs.map(Arc::new),
            bbs_fails: false,
        }
    }
}

#[async_trait]
impl Connector for StubConnector {
    async fn connect_cf(&self) -> Result<Arc<dyn CfApi>> {
        let cf: Arc<dyn CfApi> = self.cf.clone();
        Ok(cf)
    }

    fn connect_bbs(&self) -> Result<Option<Arc<dyn BbsApi>>> {
        if self.bbs_fails {
            return Err(ClientError::Tls {
                reason: "certificate verify failed".to_string(),
            });
        }
        Ok(self.bbs.clone().map(|b| b as Arc<dyn BbsApi>))
    }
}

pub fn metrics_config() -> MetricsConfig {
    MetricsConfig {
        namespace: "cf".to_string(),
        environment: "test".to_string(),
        deployment: "cf-test".to_string(),
    }
}

pub fn composer(
    filter: &str,
    connector: Arc<StubConnector>,
    clock: Arc<dyn Clock>,
) -> ScrapeComposer {
    let filter = Filter::parse(filter).unwrap();
    let fetcher = Fetcher::new(filter, Vec::new(), connector, 4, Arc::clone(&clock));
    ScrapeComposer::new(fetcher, &metrics_config(), clock).unwrap()
}

/// One parsed exposition line.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub name: String,
    pub labels: BTreeMap<String, String>,
    pub value: f64,
}

impl Sample {
    pub fn label(&self, name: &str) -> &str {
        self.labels.get(name).map(String::as_str).unwrap_or("")
    }
}

pub fn parse(body: &str) -> Vec<Sample> {
    body.lines()
        .filter(|line| !line.starts_with('#') && !line.trim().is_empty())
        .map(|line| {
            let (series, value) = line.rsplit_once(' ').unwrap();
            let (name, labels) = match series.split_once('{') {
                Some((name, rest)) => (name, rest.trim_end_matches('}')),
                None => (series, ""),
            };
            let labels = labels
                .split("\",")
                .filter(|pair| !pair.is_empty())
                .map(|pair| {
                    let (k, v) = pair.split_once("=\"").unwrap();
                    (k.to_string(), v.trim_end_matches('"').to_string())
                })
                .collect();
            Sample {
                name: name.to_string(),
                labels,
                value: value.parse().unwrap(),
            }
        })
        .collect()
}

pub fn named<'a>(samples: &'a [Sample], name: &str) -> Vec<&'a Sample> {
    samples.iter().filter(|s| s.name == name).collect()
}

pub fn value(samples: &[Sample], name: &str) -> Option<f64> {
    named(samples, name).first().map(|s| s.value)
}

pub async fn scrape(composer: &ScrapeComposer) -> Vec<Sample> {
    let body = composer.scrape().await.unwrap();
    parse(&String::from_utf8(body).unwrap())
}

pub fn rel(pairs: &[(&str, &str)]) -> Relationships {
    Relationships::from_pairs(pairs.iter().copied())
}

/// Org `org1/Acme`, space `sp1/dev` with quota `sp_q/small`, app `app1/web`
/// with one web process and two ActualLRPs (one running), stack `st1/cflinux`.
pub fn single_app_platform() -> (StubCf, StubBbs) {
    let process_guid = "aaaaaaaa-0000-0000-0000-000000000001";
    let cf = StubCf {
        info: Info {
            name: "test-cf".to_string(),
            ..Info::default()
        },
        orgs: vec![Organization {
            guid: "org1".to_string(),
            name: "Acme".to_string(),
            suspended: false,
            relationships: rel(&[("quota", "org_q")]),
        }],
        org_quotas: vec![Quota {
            guid: "org_q".to_string(),
            name: "default".to_string(),
            apps: AppsQuota {
                total_memory_in_mb: Some(10240),
                per_process_memory_in_mb: None,
                total_instances: Some(100),
                per_app_tasks: None,
            },
            ..Quota::default()
        }],
        spaces: vec![Space {
            guid: "sp1".to_string(),
            name: "dev".to_string(),
            relationships: rel(&[("organization", "org1"), ("quota", "sp_q")]),
        }],
        space_quotas: vec![Quota {
            guid: "sp_q".to_string(),
            name: "small".to_string(),
            ..Quota::default()
        }],
        apps: vec![Application {
            guid: "app1".to_string(),
            name: "web".to_string(),
            state: AppState::Started,
            relationships: rel(&[("space", "sp1")]),
            lifecycle: Lifecycle {
                kind: "buildpack".to_string(),
                data: LifecycleData {
                    stack: Some("cflinux".to_string()),
                    buildpacks: vec!["go_buildpack".to_string()],
                },
            },
            ..Application::default()
        }],
        processes: vec![Process {
            guid: process_guid.to_string(),
            kind: "web".to_string(),
            instances: 2,
            memory_in_mb: 256,
            disk_in_mb: 1024,
            relationships: rel(&[("app", "app1")]),
        }],
        stacks: vec![Stack {
            guid: "st1".to_string(),
            name: "cflinux".to_string(),
            description: None,
        }],
        ..StubCf::default()
    };
    let lrp = |state: &str| ActualLrp {
        actual_lrp_key: ActualLrpKey {
            process_guid: format!("{}-9b7d1c2e", process_guid),
            index: 0,
            domain: "cf-apps".to_string(),
        },
        state: state.to_string(),
    };
    let bbs = StubBbs {
        lrps: vec![lrp("RUNNING"), lrp("CRASHED")],
    };
    (cf, bbs)
}

pub fn task(guid: &str, app: &str, state: &str, created_at: DateTime<Utc>) -> Task {
    Task {
        guid: guid.to_string(),
        state: state.to_string(),
        created_at,
        memory_in_mb: 128,
        disk_in_mb: 512,
        relationships: rel(&[("app", app)]),
    }
}

pub fn event(guid: &str, created_at: DateTime<Utc>) -> Event {
    Event {
        guid: guid.to_string(),
        created_at,
        kind: "audit.app.restage".to_string(),
        actor: EventParty {
            guid: "user1".to_string(),
            kind: "user".to_string(),
            name: "admin".to_string(),
        },
        target: EventParty {
            guid: "app1".to_string(),
            kind: "app".to_string(),
            name: "web".to_string(),
        },
        space: Some(GuidRef {
            guid: "sp1".to_string(),
        }),
        organization: Some(GuidRef {
            guid: "org1".to_string(),
        }),
    }
}

/// [`single_app_platform`] plus one resource of every other kind, with
/// tasks and events stamped after `now`.
pub fn full_platform(now: DateTime<Utc>) -> (StubCf, StubBbs) {
    let (mut cf, bbs) = single_app_platform();
    let later = now + chrono::Duration::seconds(1);
    cf.tasks = vec![
        task("t1", "app1", "RUNNING", now),
        task("t2", "app1", "PENDING", now),
    ];
    cf.droplets = vec![Droplet {
        guid: "dr1".to_string(),
        state: "STAGED".to_string(),
        created_at: Some(now),
        buildpacks: vec![DropletBuildpack {
            name: "go_buildpack".to_string(),
            buildpack_name: Some("go".to_string()),
            detect_output: Some("go".to_string()),
            version: Some("1.10.0".to_string()),
        }],
        links: BTreeMap::from([(
            "app".to_string(),
            Link {
                href: "https://api.example.com/v3/apps/app1".to_string(),
            },
        )]),
    }];
    cf.events = vec![event("e1", later)];
    cf.users = vec![User {
        guid: "user1".to_string(),
        username: Some("admin".to_string()),
        presentation_name: "admin".to_string(),
    }];
    cf.domains = vec![Domain {
        guid: "dom1".to_string(),
        name: "apps.example.com".to_string(),
        internal: false,
        supported_protocols: vec!["http".to_string(), "tcp".to_string()],
    }];
    cf.routes = vec![Route {
        guid: "rt1".to_string(),
        host: "web".to_string(),
        path: String::new(),
        relationships: rel(&[("domain", "dom1"), ("space", "sp1")]),
    }];
    cf.route_bindings = vec![RouteBinding {
        guid: "rb1".to_string(),
        route_service_url: Some("https://rs.example.com".to_string()),
        relationships: rel(&[("route", "rt1"), ("service_instance", "si1")]),
    }];
    cf.security_groups = vec![SecurityGroup {
        guid: "sg1".to_string(),
        name: "public_networks".to_string(),
    }];
    cf.buildpacks = vec![Buildpack {
        guid: "bp1".to_string(),
        name: "go_buildpack".to_string(),
        stack: Some("cflinux".to_string()),
        filename: Some("go_buildpack-v1.zip".to_string()),
        position: 1,
        enabled: true,
        locked: false,
    }];
    cf.isolation_segments = vec![IsolationSegment {
        guid: "is1".to_string(),
        name: "shared".to_string(),
    }];
    cf.service_brokers = vec![ServiceBroker {
        guid: "br1".to_string(),
        name: "db-broker".to_string(),
    }];
    cf.service_offerings = vec![ServiceOffering {
        guid: "so1".to_string(),
        name: "postgres".to_string(),
        available: true,
        relationships: rel(&[("service_broker", "br1")]),
    }];
    cf.service_plans = vec![ServicePlan {
        guid: "pl1".to_string(),
        name: "small".to_string(),
        free: true,
        relationships: rel(&[("service_offering", "so1")]),
    }];
    cf.service_instances = vec![ServiceInstance {
        guid: "si1".to_string(),
        name: "orders-db".to_string(),
        kind: "managed".to_string(),
        last_operation: Some(LastOperation {
            kind: "create".to_string(),
            state: "succeeded".to_string(),
        }),
        relationships: rel(&[("service_plan", "pl1"), ("space", "sp1")]),
    }];
    cf.service_bindings = vec![ServiceBinding {
        guid: "sb1".to_string(),
        name: Some("orders-db-binding".to_string()),
        kind: "app".to_string(),
        relationships: rel(&[("app", "app1"), ("service_instance", "si1")]),
    }];
    (cf, bbs)
}
