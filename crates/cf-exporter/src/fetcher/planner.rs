//! Decides which API listings a scrape needs.

use crate::filter::{Family, Filter};

/// One unit of fetch work.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Job {
    Info,
    Organizations,
    OrgQuotas,
    Spaces,
    SpaceQuotas,
    Applications,
    Domains,
    Processes,
    Droplets,
    Routes,
    RouteBindings,
    SecurityGroups,
    Stacks,
    Buildpacks,
    Tasks,
    ServiceBrokers,
    ServiceOfferings,
    ServiceInstances,
    ServicePlans,
    ServiceBindings,
    ServiceRouteBindings,
    IsolationSegments,
    Users,
    Events,
    ActualLrps,
    /// Per-space roll-up, enqueued by `Spaces` once spaces are known.
    SpaceSummary(String),
}

impl Job {
    /// Top-level jobs in planning order.
    pub fn table() -> [Job; 25] {
        [
            Job::Info,
            Job::Organizations,
            Job::OrgQuotas,
            Job::Spaces,
            Job::SpaceQuotas,
            Job::Applications,
            Job::Domains,
            Job::Processes,
            Job::Droplets,
            Job::Routes,
            Job::RouteBindings,
            Job::SecurityGroups,
            Job::Stacks,
            Job::Buildpacks,
            Job::Tasks,
            Job::ServiceBrokers,
            Job::ServiceOfferings,
            Job::ServiceInstances,
            Job::ServicePlans,
            Job::ServiceBindings,
            Job::ServiceRouteBindings,
            Job::IsolationSegments,
            Job::Users,
            Job::Events,
            Job::ActualLrps,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Job::Info => "info",
            Job::Organizations => "organizations",
            Job::OrgQuotas => "org_quotas",
            Job::Spaces => "spaces",
            Job::SpaceQuotas => "space_quotas",
            Job::Applications => "applications",
            Job::Domains => "domains",
            Job::Processes => "processes",
            Job::Droplets => "droplets",
            Job::Routes => "routes",
            Job::RouteBindings => "route_bindings",
            Job::SecurityGroups => "security_groups",
            Job::Stacks => "stacks",
            Job::Buildpacks => "buildpacks",
            Job::Tasks => "tasks",
            Job::ServiceBrokers => "service_brokers",
            Job::ServiceOfferings => "service_offerings",
            Job::ServiceInstances => "service_instances",
            Job::ServicePlans => "service_plans",
            Job::ServiceBindings => "service_bindings",
            Job::ServiceRouteBindings => "service_route_bindings",
            Job::IsolationSegments => "isolation_segments",
            Job::Users => "users",
            Job::Events => "events",
            Job::ActualLrps => "actual_lrps",
            Job::SpaceSummary(_) => "space_summary",
        }
    }

    /// Families of which at least one must be enabled for the job to run.
    /// Empty means the job always runs.
    pub fn required_by(&self) -> &'static [Family] {
        use Family::*;
        match self {
            Job::Info | Job::ActualLrps => &[],
            Job::Organizations => &[Applications, Organizations],
            Job::OrgQuotas => &[Organizations],
            Job::Spaces => &[Applications, Spaces],
            Job::SpaceQuotas => &[Spaces],
            Job::Applications | Job::Processes | Job::Droplets | Job::SpaceSummary(_) => {
                &[Applications]
            }
            Job::Domains => &[Domains],
            Job::Routes | Job::RouteBindings => &[Routes],
            Job::SecurityGroups => &[SecurityGroups],
            Job::Stacks => &[Stacks],
            Job::Buildpacks => &[Buildpacks],
            Job::Tasks => &[Tasks],
            Job::ServiceBrokers | Job::ServiceOfferings => &[Services],
            Job::ServiceInstances => &[ServiceInstances],
            Job::ServicePlans => &[ServicePlans],
            Job::ServiceBindings => &[ServiceBindings],
            Job::ServiceRouteBindings => &[ServiceRouteBindings],
            Job::IsolationSegments => &[IsolationSegments],
            Job::Users | Job::Events => &[Events],
        }
    }

    pub fn wanted(&self, filter: &Filter) -> bool {
        let families = self.required_by();
        families.is_empty() || filter.any(families)
    }
}

/// Top-level jobs the filter needs, in table order.
pub fn plan(filter: &Filter) -> Vec<Job> {
    Job::table()
        .into_iter()
        .filter(|job| job.wanted(filter))
        .collect()
}
