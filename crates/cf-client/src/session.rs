//! Authenticated, paginated access to the Cloud Controller.
//!
//! Every request runs through the same ordered pipeline: attach a bearer token
//! (renewing it if stale), retry transient failures, log status and latency.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::auth::{Credentials, TokenSource};
use crate::error::{ClientError, Result};
use crate::models::{
    ActualLrp, Application, Buildpack, Domain, Droplet, Event, Info, IsolationSegment, Link,
    Organization, Page, Process, Quota, Route, RouteBinding, SecurityGroup, ServiceBinding,
    ServiceBroker, ServiceInstance, ServiceOffering, ServicePlan, Space, SpaceSummary, Stack,
    Task, User,
};
use crate::retry::RetryConfig;

/// Page size used for list requests; CC v3 caps `per_page` at 5000.
pub const DEFAULT_PAGE_SIZE: u32 = 5000;

/// Task states listed when no explicit filter is given.
pub const DEFAULT_TASK_STATES: &[&str] = &["PENDING", "RUNNING", "CANCELING"];

/// Read access to the Cloud Controller used by the fetcher.
///
/// Implementations must be safe to share between workers.
#[async_trait]
pub trait CfApi: Send + Sync {
    /// Platform identity.
    async fn get_info(&self) -> Result<Info>;
    /// All organizations.
    async fn list_organizations(&self) -> Result<Vec<Organization>>;
    /// All organization quotas.
    async fn list_organization_quotas(&self) -> Result<Vec<Quota>>;
    /// All spaces.
    async fn list_spaces(&self) -> Result<Vec<Space>>;
    /// All space quotas.
    async fn list_space_quotas(&self) -> Result<Vec<Quota>>;
    /// All applications.
    async fn list_applications(&self) -> Result<Vec<Application>>;
    /// All processes.
    async fn list_processes(&self) -> Result<Vec<Process>>;
    /// All staged droplets.
    async fn list_droplets(&self) -> Result<Vec<Droplet>>;
    /// All domains.
    async fn list_domains(&self) -> Result<Vec<Domain>>;
    /// All routes.
    async fn list_routes(&self) -> Result<Vec<Route>>;
    /// All route service bindings.
    async fn list_route_bindings(&self) -> Result<Vec<RouteBinding>>;
    /// All security groups.
    async fn list_security_groups(&self) -> Result<Vec<SecurityGroup>>;
    /// All stacks.
    async fn list_stacks(&self) -> Result<Vec<Stack>>;
    /// All admin buildpacks.
    async fn list_buildpacks(&self) -> Result<Vec<Buildpack>>;
    /// Tasks in the given states; empty means [`DEFAULT_TASK_STATES`].
    async fn list_tasks(&self, states: &[String]) -> Result<Vec<Task>>;
    /// All service brokers.
    async fn list_service_brokers(&self) -> Result<Vec<ServiceBroker>>;
    /// All service offerings.
    async fn list_service_offerings(&self) -> Result<Vec<ServiceOffering>>;
    /// All service instances.
    async fn list_service_instances(&self) -> Result<Vec<ServiceInstance>>;
    /// All service plans.
    async fn list_service_plans(&self) -> Result<Vec<ServicePlan>>;
    /// All service credential bindings.
    async fn list_service_bindings(&self) -> Result<Vec<ServiceBinding>>;
    /// All isolation segments.
    async fn list_isolation_segments(&self) -> Result<Vec<IsolationSegment>>;
    /// All users.
    async fn list_users(&self) -> Result<Vec<User>>;
    /// Audit events created strictly after `since`, newest first.
    async fn list_events(&self, since: DateTime<Utc>) -> Result<Vec<Event>>;
    /// App roll-up of one space; `Ok(None)` if the space no longer exists.
    async fn get_space_summary(&self, space_guid: &str) -> Result<Option<SpaceSummary>>;
}

/// Read access to Diego's BBS.
#[async_trait]
pub trait BbsApi: Send + Sync {
    /// Every ActualLRP currently known to BBS.
    async fn list_actual_lrps(&self) -> Result<Vec<ActualLrp>>;
}

/// Settings for [`CfSession::connect`].
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// CC base URL, e.g. `https://api.sys.example.com`.
    pub api_url: String,
    /// Grant used against UAA.
    pub credentials: Credentials,
    /// Disable TLS verification for CC and UAA.
    pub skip_ssl_verify: bool,
    /// Per-request timeout.
    pub timeout: Duration,
    /// `per_page` for list requests.
    pub page_size: u32,
    /// Retry policy for transient failures.
    pub retry: RetryConfig,
}

impl SessionConfig {
    /// Defaults for everything but the URL and credentials.
    pub fn new(api_url: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            api_url: api_url.into(),
            credentials,
            skip_ssl_verify: false,
            timeout: Duration::from_secs(30),
            page_size: DEFAULT_PAGE_SIZE,
            retry: RetryConfig::default(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct RootLinks {
    #[serde(default)]
    uaa: Option<Link>,
    #[serde(default)]
    login: Option<Link>,
}

#[derive(Debug, Default, Deserialize)]
struct Root {
    #[serde(default)]
    links: RootLinks,
}

/// A logged-in CC session.
#[derive(Debug)]
pub struct CfSession {
    client: reqwest::Client,
    api_url: String,
    tokens: TokenSource,
    page_size: u32,
    retry: RetryConfig,
}

impl CfSession {
    /// Builds the HTTP client, discovers UAA from the API root and obtains a
    /// first token.
    pub async fn connect(config: SessionConfig) -> Result<Self> {
        let api_url = config.api_url.trim_end_matches('/').to_string();
        Url::parse(&api_url).map_err(|e| ClientError::Config {
            reason: format!("invalid CF API URL {:?}: {}", config.api_url, e),
        })?;

        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(config.skip_ssl_verify)
            .timeout(config.timeout)
            .user_agent(concat!("cf_exporter/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ClientError::Config {
                reason: format!("failed to build HTTP client: {}", e),
            })?;

        let root_url = format!("{}/", api_url);
        let (client_ref, root_ref) = (&client, root_url.as_str());
        let root: Root = config
            .retry
            .run("/", move || async move {
                fetch_json(client_ref, "/", root_ref, None).await
            })
            .await?;

        let uaa_url = root
            .links
            .uaa
            .or(root.links.login)
            .map(|l| l.href)
            .ok_or_else(|| ClientError::Config {
                reason: format!("{} does not advertise a UAA endpoint", api_url),
            })?;

        let tokens = TokenSource::new(client.clone(), &uaa_url, config.credentials);
        tokens.token().await?;
        tracing::debug!(api_url = %api_url, uaa_url = %uaa_url, "connected to Cloud Controller");

        Ok(Self {
            client,
            api_url,
            tokens,
            page_size: config.page_size.max(1),
            retry: config.retry,
        })
    }

    fn url(&self, path: &str, query: &[(&str, String)]) -> Result<Url> {
        let mut url = Url::parse(&format!("{}{}", self.api_url, path)).map_err(|e| {
            ClientError::Config {
                reason: format!("invalid endpoint {}: {}", path, e),
            }
        })?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, endpoint: &str, url: &Url) -> Result<T> {
        self.retry
            .run(endpoint, move || async move {
                let token = self.tokens.token().await?;
                let result = fetch_json(&self.client, endpoint, url.as_str(), Some(&token)).await;
                if let Err(ClientError::Status { status: 401, .. }) = &result {
                    self.tokens.invalidate().await;
                }
                result
            })
            .await
    }

    /// Follows `pagination.next` until the last page and returns every resource.
    async fn list_all<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>> {
        let mut params = vec![("per_page", self.page_size.to_string())];
        params.extend(query.iter().cloned());

        let mut resources = Vec::new();
        let mut next = Some(self.url(path, &params)?);
        while let Some(url) = next.take() {
            let page: Page<T> = self.get_json(path, &url).await?;
            resources.extend(page.resources);
            if let Some(link) = page.pagination.next {
                next = Some(Url::parse(&link.href).map_err(|e| ClientError::Decode {
                    endpoint: path.to_string(),
                    reason: format!("invalid next link {:?}: {}", link.href, e),
                })?);
            }
        }
        tracing::debug!(endpoint = path, count = resources.len(), "listed resources");
        Ok(resources)
    }
}

/// One GET with optional bearer auth, logged, decoded as JSON.
async fn fetch_json<T: DeserializeOwned>(
    client: &reqwest::Client,
    endpoint: &str,
    url: &str,
    token: Option<&str>,
) -> Result<T> {
    let started = Instant::now();
    let mut request = client
        .get(url)
        .header(reqwest::header::ACCEPT, "application/json");
    if let Some(token) = token {
        request = request.bearer_auth(token);
    }

    let response = request.send().await.map_err(|source| ClientError::Http {
        endpoint: endpoint.to_string(),
        source,
    })?;
    let status = response.status();
    tracing::debug!(
        endpoint,
        status = status.as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "HTTP GET"
    );
    if !status.is_success() {
        return Err(ClientError::Status {
            endpoint: endpoint.to_string(),
            status: status.as_u16(),
        });
    }

    let body = response.bytes().await.map_err(|source| ClientError::Http {
        endpoint: endpoint.to_string(),
        source,
    })?;
    serde_json::from_slice(&body).map_err(|e| ClientError::Decode {
        endpoint: endpoint.to_string(),
        reason: e.to_string(),
    })
}

/// Keeps events strictly newer than `since`, newest first.
pub fn events_after(mut events: Vec<Event>, since: DateTime<Utc>) -> Vec<Event> {
    events.retain(|e| e.created_at > since);
    events.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    events
}

/// Normalizes a task state filter, falling back to [`DEFAULT_TASK_STATES`].
pub fn task_states_query(states: &[String]) -> String {
    if states.is_empty() {
        DEFAULT_TASK_STATES.join(",")
    } else {
        states
            .iter()
            .map(|s| s.trim().to_uppercase())
            .collect::<Vec<_>>()
            .join(",")
    }
}

#[async_trait]
impl CfApi for CfSession {
    async fn get_info(&self) -> Result<Info> {
        let url = self.url("/v3/info", &[])?;
        self.get_json("/v3/info", &url).await
    }

    async fn list_organizations(&self) -> Result<Vec<Organization>> {
        self.list_all("/v3/organizations", &[]).await
    }

    async fn list_organization_quotas(&self) -> Result<Vec<Quota>> {
        self.list_all("/v3/organization_quotas", &[]).await
    }

    async fn list_spaces(&self) -> Result<Vec<Space>> {
        self.list_all("/v3/spaces", &[]).await
    }

    async fn list_space_quotas(&self) -> Result<Vec<Quota>> {
        self.list_all("/v3/space_quotas", &[]).await
    }

    async fn list_applications(&self) -> Result<Vec<Application>> {
        self.list_all("/v3/apps", &[]).await
    }

    async fn list_processes(&self) -> Result<Vec<Process>> {
        self.list_all("/v3/processes", &[]).await
    }

    async fn list_droplets(&self) -> Result<Vec<Droplet>> {
        self.list_all("/v3/droplets", &[("states", "STAGED".to_string())])
            .await
    }

    async fn list_domains(&self) -> Result<Vec<Domain>> {
        self.list_all("/v3/domains", &[]).await
    }

    async fn list_routes(&self) -> Result<Vec<Route>> {
        self.list_all("/v3/routes", &[]).await
    }

    async fn list_route_bindings(&self) -> Result<Vec<RouteBinding>> {
        self.list_all("/v3/service_route_bindings", &[]).await
    }

    async fn list_security_groups(&self) -> Result<Vec<SecurityGroup>> {
        self.list_all("/v3/security_groups", &[]).await
    }

    async fn list_stacks(&self) -> Result<Vec<Stack>> {
        self.list_all("/v3/stacks", &[]).await
    }

    async fn list_buildpacks(&self) -> Result<Vec<Buildpack>> {
        self.list_all("/v3/buildpacks", &[]).await
    }

    async fn list_tasks(&self, states: &[String]) -> Result<Vec<Task>> {
        self.list_all("/v3/tasks", &[("states", task_states_query(states))])
            .await
    }

    async fn list_service_brokers(&self) -> Result<Vec<ServiceBroker>> {
        self.list_all("/v3/service_brokers", &[]).await
    }

    async fn list_service_offerings(&self) -> Result<Vec<ServiceOffering>> {
        self.list_all("/v3/service_offerings", &[]).await
    }

    async fn list_service_instances(&self) -> Result<Vec<ServiceInstance>> {
        self.list_all("/v3/service_instances", &[]).await
    }

    async fn list_service_plans(&self) -> Result<Vec<ServicePlan>> {
        self.list_all("/v3/service_plans", &[]).await
    }

    async fn list_service_bindings(&self) -> Result<Vec<ServiceBinding>> {
        self.list_all("/v3/service_credential_bindings", &[]).await
    }

    async fn list_isolation_segments(&self) -> Result<Vec<IsolationSegment>> {
        self.list_all("/v3/isolation_segments", &[]).await
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        self.list_all("/v3/users", &[]).await
    }

    async fn list_events(&self, since: DateTime<Utc>) -> Result<Vec<Event>> {
        let query = [
            (
                "created_ats[gt]",
                since.to_rfc3339_opts(SecondsFormat::Secs, true),
            ),
            ("order_by", "-created_at".to_string()),
        ];
        let events = self.list_all("/v3/audit_events", &query).await?;
        Ok(events_after(events, since))
    }

    async fn get_space_summary(&self, space_guid: &str) -> Result<Option<SpaceSummary>> {
        let path = format!("/v2/spaces/{}/summary", space_guid);
        let url = self.url(&path, &[])?;
        match self.get_json(&path, &url).await {
            Ok(summary) => Ok(Some(summary)),
            Err(e) if e.is_not_found() => {
                tracing::debug!(space_guid, "space disappeared before its summary was read");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}
