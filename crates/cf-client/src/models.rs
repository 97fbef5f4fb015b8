//! JSON resource models for the CC v3 API, the CC v2 space summary and BBS.
//!
//! Unknown fields are ignored and most fields default, so partial payloads
//! from older Cloud Controllers still decode.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One page of a CC v3 list response.
#[derive(Debug, Clone, Deserialize)]
pub struct Page<T> {
    /// Pagination cursor.
    #[serde(default)]
    pub pagination: Pagination,
    /// Resources on this page.
    #[serde(default = "Vec::new")]
    pub resources: Vec<T>,
}

/// CC v3 pagination block.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Pagination {
    /// Total number of results across all pages.
    #[serde(default)]
    pub total_results: u64,
    /// Total number of pages.
    #[serde(default)]
    pub total_pages: u64,
    /// Link to the next page, absent on the last page.
    #[serde(default)]
    pub next: Option<Link>,
}

/// A hypermedia link.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    /// Absolute URL.
    pub href: String,
}

/// GUID reference inside a relationship.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuidRef {
    /// Referenced GUID.
    pub guid: String,
}

/// Relationship payload: to-one or to-many.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RelationshipData {
    /// To-one relationship.
    One(GuidRef),
    /// To-many relationship.
    Many(Vec<GuidRef>),
}

/// A single named relationship; `data` is null when unset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    /// Relationship target(s).
    #[serde(default)]
    pub data: Option<RelationshipData>,
}

/// Named relationships of a resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Relationships(pub BTreeMap<String, Relationship>);

impl Relationships {
    /// GUID of a to-one relationship, `None` if missing, null or to-many.
    pub fn guid(&self, name: &str) -> Option<&str> {
        match self.0.get(name)?.data.as_ref()? {
            RelationshipData::One(r) if !r.guid.is_empty() => Some(r.guid.as_str()),
            _ => None,
        }
    }

    /// Builds a relationship set from `(name, guid)` pairs.
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Relationships(
            pairs
                .into_iter()
                .map(|(name, guid)| {
                    (
                        name.to_string(),
                        Relationship {
                            data: Some(RelationshipData::One(GuidRef {
                                guid: guid.to_string(),
                            })),
                        },
                    )
                })
                .collect(),
        )
    }
}

/// `GET /v3/info`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Info {
    /// Platform name.
    #[serde(default)]
    pub name: String,
    /// Build identifier.
    #[serde(default)]
    pub build: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
}

/// An organization.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Organization {
    /// GUID.
    pub guid: String,
    /// Name.
    #[serde(default)]
    pub name: String,
    /// Whether the org is suspended.
    #[serde(default)]
    pub suspended: bool,
    /// Relationships (`quota`).
    #[serde(default)]
    pub relationships: Relationships,
}

/// App limits of a quota.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AppsQuota {
    /// Total memory across all processes, MB.
    #[serde(default)]
    pub total_memory_in_mb: Option<i64>,
    /// Memory per process instance, MB.
    #[serde(default)]
    pub per_process_memory_in_mb: Option<i64>,
    /// Total app instances.
    #[serde(default)]
    pub total_instances: Option<i64>,
    /// Concurrent tasks per app.
    #[serde(default)]
    pub per_app_tasks: Option<i64>,
}

/// Service limits of a quota.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ServicesQuota {
    /// Whether paid service plans may be provisioned.
    #[serde(default)]
    pub paid_services_allowed: Option<bool>,
    /// Total service instances.
    #[serde(default)]
    pub total_service_instances: Option<i64>,
    /// Total service keys.
    #[serde(default)]
    pub total_service_keys: Option<i64>,
}

/// Route limits of a quota.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RoutesQuota {
    /// Total routes.
    #[serde(default)]
    pub total_routes: Option<i64>,
    /// Total reserved TCP ports.
    #[serde(default)]
    pub total_reserved_ports: Option<i64>,
}

/// Domain limits of an organization quota.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DomainsQuota {
    /// Total private domains.
    #[serde(default)]
    pub total_domains: Option<i64>,
}

/// Organization or space quota. A `None` limit means unlimited.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Quota {
    /// GUID.
    pub guid: String,
    /// Name.
    #[serde(default)]
    pub name: String,
    /// App limits.
    #[serde(default)]
    pub apps: AppsQuota,
    /// Service limits.
    #[serde(default)]
    pub services: ServicesQuota,
    /// Route limits.
    #[serde(default)]
    pub routes: RoutesQuota,
    /// Domain limits; always empty for space quotas.
    #[serde(default)]
    pub domains: DomainsQuota,
}

/// A space.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Space {
    /// GUID.
    pub guid: String,
    /// Name.
    #[serde(default)]
    pub name: String,
    /// Relationships (`organization`, `quota`).
    #[serde(default)]
    pub relationships: Relationships,
}

/// Desired state of an application.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AppState {
    /// Started.
    Started,
    /// Stopped.
    #[default]
    Stopped,
    /// Any state this client does not know.
    #[serde(other)]
    Unknown,
}

impl AppState {
    /// Label value as reported by CC.
    pub fn as_str(&self) -> &'static str {
        match self {
            AppState::Started => "STARTED",
            AppState::Stopped => "STOPPED",
            AppState::Unknown => "UNKNOWN",
        }
    }
}

/// Lifecycle data of an application.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LifecycleData {
    /// Stack name, absent for docker apps.
    #[serde(default)]
    pub stack: Option<String>,
    /// Requested buildpacks.
    #[serde(default)]
    pub buildpacks: Vec<String>,
}

/// Lifecycle of an application.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Lifecycle {
    /// `buildpack`, `cnb` or `docker`.
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Lifecycle data.
    #[serde(default)]
    pub data: LifecycleData,
}

/// An application.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Application {
    /// GUID.
    pub guid: String,
    /// Name.
    #[serde(default)]
    pub name: String,
    /// Desired state.
    #[serde(default)]
    pub state: AppState,
    /// Relationships (`space`, optionally `current_droplet`).
    #[serde(default)]
    pub relationships: Relationships,
    /// Lifecycle.
    #[serde(default)]
    pub lifecycle: Lifecycle,
    /// Links (`current_droplet`, `space`, ...).
    #[serde(default)]
    pub links: BTreeMap<String, Link>,
}

/// A process of an application.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Process {
    /// GUID.
    pub guid: String,
    /// Process type, e.g. `web`.
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Desired instance count.
    #[serde(default)]
    pub instances: i64,
    /// Memory per instance, MB.
    #[serde(default)]
    pub memory_in_mb: i64,
    /// Disk per instance, MB.
    #[serde(default)]
    pub disk_in_mb: i64,
    /// Relationships (`app`).
    #[serde(default)]
    pub relationships: Relationships,
}

impl Process {
    /// GUID of the owning application.
    pub fn app_guid(&self) -> Option<&str> {
        self.relationships.guid("app")
    }
}

/// A buildpack entry of a staged droplet.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DropletBuildpack {
    /// Admin buildpack name or URL.
    #[serde(default)]
    pub name: String,
    /// Name reported by the buildpack itself.
    #[serde(default)]
    pub buildpack_name: Option<String>,
    /// Output of the detect phase.
    #[serde(default)]
    pub detect_output: Option<String>,
    /// Buildpack version.
    #[serde(default)]
    pub version: Option<String>,
}

/// A droplet.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Droplet {
    /// GUID.
    pub guid: String,
    /// Staging state.
    #[serde(default)]
    pub state: String,
    /// Creation time.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Buildpacks used for staging.
    #[serde(default)]
    pub buildpacks: Vec<DropletBuildpack>,
    /// Links (`app`).
    #[serde(default)]
    pub links: BTreeMap<String, Link>,
}

impl Droplet {
    /// GUID of the owning application, taken from the last segment of the
    /// `app` link.
    pub fn app_guid(&self) -> Option<&str> {
        let href = self.links.get("app")?.href.trim_end_matches('/');
        href.rsplit('/').next().filter(|s| !s.is_empty())
    }
}

/// A task.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Task {
    /// GUID.
    pub guid: String,
    /// Task state.
    #[serde(default)]
    pub state: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Memory, MB.
    #[serde(default)]
    pub memory_in_mb: i64,
    /// Disk, MB.
    #[serde(default)]
    pub disk_in_mb: i64,
    /// Relationships (`app`).
    #[serde(default)]
    pub relationships: Relationships,
}

/// A domain.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Domain {
    /// GUID.
    pub guid: String,
    /// Name.
    #[serde(default)]
    pub name: String,
    /// Whether the domain is internal.
    #[serde(default)]
    pub internal: bool,
    /// Supported protocols (`http`, `tcp`).
    #[serde(default)]
    pub supported_protocols: Vec<String>,
}

/// A route.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Route {
    /// GUID.
    pub guid: String,
    /// Host part.
    #[serde(default)]
    pub host: String,
    /// Path part.
    #[serde(default)]
    pub path: String,
    /// Relationships (`domain`, `space`).
    #[serde(default)]
    pub relationships: Relationships,
}

/// Binding of a route to a route service instance.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RouteBinding {
    /// GUID.
    pub guid: String,
    /// External route service URL.
    #[serde(default)]
    pub route_service_url: Option<String>,
    /// Relationships (`route`, `service_instance`).
    #[serde(default)]
    pub relationships: Relationships,
}

/// An isolation segment.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IsolationSegment {
    /// GUID.
    pub guid: String,
    /// Name.
    #[serde(default)]
    pub name: String,
}

/// Last operation of a service instance.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LastOperation {
    /// Operation type (`create`, `update`, `delete`).
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Operation state (`in progress`, `succeeded`, `failed`).
    #[serde(default)]
    pub state: String,
}

/// A service instance.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceInstance {
    /// GUID.
    pub guid: String,
    /// Name.
    #[serde(default)]
    pub name: String,
    /// `managed` or `user-provided`.
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Last operation.
    #[serde(default)]
    pub last_operation: Option<LastOperation>,
    /// Relationships (`space`, `service_plan`).
    #[serde(default)]
    pub relationships: Relationships,
}

/// An application security group.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SecurityGroup {
    /// GUID.
    pub guid: String,
    /// Name.
    #[serde(default)]
    pub name: String,
}

/// A stack.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Stack {
    /// GUID.
    pub guid: String,
    /// Name.
    #[serde(default)]
    pub name: String,
    /// Description.
    #[serde(default)]
    pub description: Option<String>,
}

/// An admin buildpack.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Buildpack {
    /// GUID.
    pub guid: String,
    /// Name.
    #[serde(default)]
    pub name: String,
    /// Stack the buildpack is bound to.
    #[serde(default)]
    pub stack: Option<String>,
    /// Uploaded file name.
    #[serde(default)]
    pub filename: Option<String>,
    /// Detection order.
    #[serde(default)]
    pub position: i64,
    /// Whether the buildpack is enabled.
    #[serde(default)]
    pub enabled: bool,
    /// Whether the buildpack is locked.
    #[serde(default)]
    pub locked: bool,
}

/// A service broker.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceBroker {
    /// GUID.
    pub guid: String,
    /// Name.
    #[serde(default)]
    pub name: String,
}

/// A service offering.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceOffering {
    /// GUID.
    pub guid: String,
    /// Name.
    #[serde(default)]
    pub name: String,
    /// Whether the offering is available.
    #[serde(default)]
    pub available: bool,
    /// Relationships (`service_broker`).
    #[serde(default)]
    pub relationships: Relationships,
}

/// A service plan.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServicePlan {
    /// GUID.
    pub guid: String,
    /// Name.
    #[serde(default)]
    pub name: String,
    /// Whether the plan is free.
    #[serde(default)]
    pub free: bool,
    /// Relationships (`service_offering`).
    #[serde(default)]
    pub relationships: Relationships,
}

/// A service credential binding.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceBinding {
    /// GUID.
    pub guid: String,
    /// Optional binding name.
    #[serde(default)]
    pub name: Option<String>,
    /// `app` or `key`.
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Relationships (`app`, `service_instance`).
    #[serde(default)]
    pub relationships: Relationships,
}

/// A user.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct User {
    /// GUID.
    pub guid: String,
    /// UAA username, absent for clients.
    #[serde(default)]
    pub username: Option<String>,
    /// Display name.
    #[serde(default)]
    pub presentation_name: String,
}

/// Actor or target of an audit event.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct EventParty {
    /// GUID.
    #[serde(default)]
    pub guid: String,
    /// Kind (`user`, `app`, ...).
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Name.
    #[serde(default)]
    pub name: String,
}

/// An audit event.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Event {
    /// GUID.
    pub guid: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Event type, e.g. `audit.app.update`.
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Who acted.
    #[serde(default)]
    pub actor: EventParty,
    /// What was acted on.
    #[serde(default)]
    pub target: EventParty,
    /// Space scope.
    #[serde(default)]
    pub space: Option<GuidRef>,
    /// Organization scope.
    #[serde(default)]
    pub organization: Option<GuidRef>,
}

/// One application entry of a CC v2 space summary.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppSummary {
    /// Application GUID.
    pub guid: String,
    /// Application name.
    #[serde(default)]
    pub name: String,
    /// Running instances as seen by CC.
    #[serde(default)]
    pub running_instances: i64,
    /// Desired instances.
    #[serde(default)]
    pub instances: i64,
    /// Detected buildpack.
    #[serde(default)]
    pub detected_buildpack: Option<String>,
    /// Requested buildpack.
    #[serde(default)]
    pub buildpack: Option<String>,
}

/// `GET /v2/spaces/:guid/summary`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SpaceSummary {
    /// Space GUID.
    pub guid: String,
    /// Space name.
    #[serde(default)]
    pub name: String,
    /// Applications of the space.
    #[serde(default)]
    pub apps: Vec<AppSummary>,
}

/// Key of an ActualLRP.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActualLrpKey {
    /// Diego process GUID (`<cc process guid>-<version>`).
    #[serde(default)]
    pub process_guid: String,
    /// Instance index.
    #[serde(default)]
    pub index: i64,
    /// Diego domain.
    #[serde(default)]
    pub domain: String,
}

/// A single running (or scheduled) instance reported by BBS.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActualLrp {
    /// Key.
    #[serde(default)]
    pub actual_lrp_key: ActualLrpKey,
    /// `UNCLAIMED`, `CLAIMED`, `RUNNING` or `CRASHED`.
    #[serde(default)]
    pub state: String,
}

/// Length of a CC GUID.
const GUID_LEN: usize = 36;

impl ActualLrp {
    /// CC process GUID this instance belongs to.
    pub fn cc_process_guid(&self) -> &str {
        let guid = self.actual_lrp_key.process_guid.as_str();
        guid.get(..GUID_LEN).unwrap_or(guid)
    }

    /// Whether the instance counts as running.
    pub fn is_running(&self) -> bool {
        self.state == "RUNNING"
    }
}
