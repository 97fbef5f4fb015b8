use std::sync::Arc;

use cf_client::{BbsApi, CfApi, ClientError};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tracing::{debug, warn};

use super::planner::Job;
use super::pool::JobQueue;
use crate::error::{ExporterError, Result};
use crate::filter::Filter;
use crate::snapshot::{by_guid, Snapshot};

/// State shared by every job of one scrape.
pub(crate) struct JobContext {
    pub cf: Arc<dyn CfApi>,
    pub bbs: Option<Arc<dyn BbsApi>>,
    pub filter: Filter,
    pub task_states: Vec<String>,
    pub events_since: DateTime<Utc>,
    pub snapshot: Mutex<Snapshot>,
}

fn failed(job: &Job) -> impl FnOnce(ClientError) -> ExporterError {
    let job = job.name().to_string();
    move |source| ExporterError::Fetch { job, source }
}

/// Executes one job. The snapshot lock is only taken once the listing has
/// been received.
pub(crate) async fn run(ctx: Arc<JobContext>, job: Job, queue: JobQueue) -> Result<()> {
    let cf = ctx.cf.as_ref();
    match &job {
        Job::Info => {
            let info = cf.get_info().await.map_err(failed(&job))?;
            ctx.snapshot.lock().info = info;
        }
        Job::Organizations => {
            let orgs = cf.list_organizations().await.map_err(failed(&job))?;
            ctx.snapshot.lock().orgs = by_guid(orgs, |o| &o.guid);
        }
        Job::OrgQuotas => {
            let quotas = cf.list_organization_quotas().await.map_err(failed(&job))?;
            ctx.snapshot.lock().org_quotas = by_guid(quotas, |q| &q.guid);
        }
        Job::Spaces => {
            let spaces = cf.list_spaces().await.map_err(failed(&job))?;
            let children: Vec<Job> = spaces
                .iter()
                .map(|s| Job::SpaceSummary(s.guid.clone()))
                .filter(|child| child.wanted(&ctx.filter))
                .collect();
            ctx.snapshot.lock().spaces = by_guid(spaces, |s| &s.guid);
            for child in children {
                queue.push(child);
            }
        }
        Job::SpaceQuotas => {
            let quotas = cf.list_space_quotas().await.map_err(failed(&job))?;
            ctx.snapshot.lock().space_quotas = by_guid(quotas, |q| &q.guid);
        }
        Job::Applications => {
            let apps = cf.list_applications().await.map_err(failed(&job))?;
            ctx.snapshot.lock().apps = by_guid(apps, |a| &a.guid);
        }
        Job::Domains => {
            let domains = cf.list_domains().await.map_err(failed(&job))?;
            ctx.snapshot.lock().domains = by_guid(domains, |d| &d.guid);
        }
        Job::Processes => {
            let processes = cf.list_processes().await.map_err(failed(&job))?;
            ctx.snapshot.lock().set_processes(processes);
        }
        Job::Droplets => {
            let droplets = cf.list_droplets().await.map_err(failed(&job))?;
            ctx.snapshot.lock().set_droplets(droplets);
        }
        Job::Routes => {
            let routes = cf.list_routes().await.map_err(failed(&job))?;
            ctx.snapshot.lock().routes = by_guid(routes, |r| &r.guid);
        }
        Job::RouteBindings => {
            let bindings = cf.list_route_bindings().await.map_err(failed(&job))?;
            ctx.snapshot.lock().route_bindings = by_guid(bindings, |b| &b.guid);
        }
        Job::ServiceRouteBindings => {
            let bindings = cf.list_route_bindings().await.map_err(failed(&job))?;
            ctx.snapshot.lock().service_route_bindings = by_guid(bindings, |b| &b.guid);
        }
        Job::SecurityGroups => {
            let groups = cf.list_security_groups().await.map_err(failed(&job))?;
            ctx.snapshot.lock().security_groups = by_guid(groups, |g| &g.guid);
        }
        Job::Stacks => {
            let stacks = cf.list_stacks().await.map_err(failed(&job))?;
            ctx.snapshot.lock().stacks = by_guid(stacks, |s| &s.guid);
        }
        Job::Buildpacks => {
            let buildpacks = cf.list_buildpacks().await.map_err(failed(&job))?;
            ctx.snapshot.lock().buildpacks = by_guid(buildpacks, |b| &b.guid);
        }
        Job::Tasks => {
            let tasks = cf.list_tasks(&ctx.task_states).await.map_err(failed(&job))?;
            ctx.snapshot.lock().tasks = by_guid(tasks, |t| &t.guid);
        }
        Job::ServiceBrokers => {
            let brokers = cf.list_service_brokers().await.map_err(failed(&job))?;
            ctx.snapshot.lock().service_brokers = by_guid(brokers, |b| &b.guid);
        }
        Job::ServiceOfferings => {
            let offerings = cf.list_service_offerings().await.map_err(failed(&job))?;
            ctx.snapshot.lock().service_offerings = by_guid(offerings, |o| &o.guid);
        }
        Job::ServiceInstances => {
            let instances = cf.list_service_instances().await.map_err(failed(&job))?;
            ctx.snapshot.lock().service_instances = by_guid(instances, |i| &i.guid);
        }
        Job::ServicePlans => {
            let plans = cf.list_service_plans().await.map_err(failed(&job))?;
            ctx.snapshot.lock().service_plans = by_guid(plans, |p| &p.guid);
        }
        Job::ServiceBindings => {
            let bindings = cf.list_service_bindings().await.map_err(failed(&job))?;
            ctx.snapshot.lock().service_bindings = by_guid(bindings, |b| &b.guid);
        }
        Job::IsolationSegments => {
            let segments = cf.list_isolation_segments().await.map_err(failed(&job))?;
            ctx.snapshot.lock().isolation_segments = by_guid(segments, |s| &s.guid);
        }
        Job::Users => {
            let users = cf.list_users().await.map_err(failed(&job))?;
            ctx.snapshot.lock().users = by_guid(users, |u| &u.guid);
        }
        Job::Events => {
            let events = cf
                .list_events(ctx.events_since)
                .await
                .map_err(failed(&job))?;
            ctx.snapshot.lock().events = by_guid(events, |e| &e.guid);
        }
        Job::ActualLrps => {
            let Some(bbs) = ctx.bbs.as_ref() else {
                debug!("BBS not configured, skipping actual LRPs");
                return Ok(());
            };
            let lrps = bbs.list_actual_lrps().await.map_err(failed(&job))?;
            ctx.snapshot.lock().set_actual_lrps(lrps);
        }
        Job::SpaceSummary(space_guid) => {
            match cf.get_space_summary(space_guid).await.map_err(failed(&job))? {
                Some(summary) => ctx.snapshot.lock().add_space_summary(summary),
                None => warn!(space_guid = %space_guid, "space vanished before its summary was read"),
            }
        }
    }
    Ok(())
}
