//! Allow-list of metric families.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::error::{ExporterError, Result};

/// A metric family the exporter can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Family {
    Applications,
    Buildpacks,
    Domains,
    Events,
    IsolationSegments,
    Organizations,
    Routes,
    SecurityGroups,
    ServiceBindings,
    ServiceRouteBindings,
    ServiceInstances,
    ServicePlans,
    Services,
    Spaces,
    Stacks,
    Tasks,
}

impl Family {
    pub const ALL: [Family; 16] = [
        Family::Applications,
        Family::Buildpacks,
        Family::Domains,
        Family::Events,
        Family::IsolationSegments,
        Family::Organizations,
        Family::Routes,
        Family::SecurityGroups,
        Family::ServiceBindings,
        Family::ServiceRouteBindings,
        Family::ServiceInstances,
        Family::ServicePlans,
        Family::Services,
        Family::Spaces,
        Family::Stacks,
        Family::Tasks,
    ];

    /// Token accepted on the command line.
    pub fn token(&self) -> &'static str {
        match self {
            Family::Applications => "applications",
            Family::Buildpacks => "buildpacks",
            Family::Domains => "domains",
            Family::Events => "events",
            Family::IsolationSegments => "isolationsegments",
            Family::Organizations => "organizations",
            Family::Routes => "routes",
            Family::SecurityGroups => "securitygroups",
            Family::ServiceBindings => "servicebindings",
            Family::ServiceRouteBindings => "serviceroutebindings",
            Family::ServiceInstances => "serviceinstances",
            Family::ServicePlans => "serviceplans",
            Family::Services => "services",
            Family::Spaces => "spaces",
            Family::Stacks => "stacks",
            Family::Tasks => "tasks",
        }
    }

    /// Name used inside self-observability metric names.
    pub fn subsystem(&self) -> &'static str {
        match self {
            Family::Applications => "applications",
            Family::Buildpacks => "buildpacks",
            Family::Domains => "domains",
            Family::Events => "events",
            Family::IsolationSegments => "isolation_segments",
            Family::Organizations => "organizations",
            Family::Routes => "routes",
            Family::SecurityGroups => "security_groups",
            Family::ServiceBindings => "service_bindings",
            Family::ServiceRouteBindings => "service_route_bindings",
            Family::ServiceInstances => "service_instances",
            Family::ServicePlans => "service_plans",
            Family::Services => "services",
            Family::Spaces => "spaces",
            Family::Stacks => "stacks",
            Family::Tasks => "tasks",
        }
    }

    /// Families enabled when no filter is given. Events and tasks are large and
    /// time-window dependent, so they are opt-in.
    pub fn is_default(&self) -> bool {
        !matches!(self, Family::Events | Family::Tasks)
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for Family {
    type Err = ExporterError;

    fn from_str(s: &str) -> Result<Self> {
        let token = s.trim().to_lowercase();
        Family::ALL
            .into_iter()
            .find(|f| f.token() == token)
            .ok_or_else(|| {
                ExporterError::Config(format!(
                    "unknown collector filter {:?}, expected one of: {}",
                    s.trim(),
                    Family::ALL.map(|f| f.token()).join(", ")
                ))
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    enabled: BTreeSet<Family>,
}

impl Filter {
    /// Builds a filter from case-insensitive tokens. Blank tokens are ignored;
    /// no tokens at all selects the default set.
    pub fn new<I, S>(tokens: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut enabled = BTreeSet::new();
        for token in tokens {
            let token = token.as_ref();
            if token.trim().is_empty() {
                continue;
            }
            enabled.insert(token.parse::<Family>()?);
        }

        if enabled.is_empty() {
            enabled = Family::ALL.into_iter().filter(Family::is_default).collect();
        }
        Ok(Self { enabled })
    }

    /// Parses a comma-separated list such as `applications,Spaces`.
    pub fn parse(list: &str) -> Result<Self> {
        Self::new(list.split(','))
    }

    pub fn enabled(&self, family: Family) -> bool {
        self.enabled.contains(&family)
    }

    /// Logical OR; `false` for an empty slice.
    pub fn any(&self, families: &[Family]) -> bool {
        families.iter().any(|f| self.enabled(*f))
    }

    /// Logical AND; `true` for an empty slice.
    pub fn all(&self, families: &[Family]) -> bool {
        families.iter().all(|f| self.enabled(*f))
    }

    /// Enabled families in stable order.
    pub fn families(&self) -> impl Iterator<Item = Family> + '_ {
        self.enabled.iter().copied()
    }
}

impl Default for Filter {
    fn default() -> Self {
        Self {
            enabled: Family::ALL.into_iter().filter(Family::is_default).collect(),
        }
    }
}
