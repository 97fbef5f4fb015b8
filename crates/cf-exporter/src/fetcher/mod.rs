//! Turns one scrape into a fully populated [`Snapshot`].

mod handlers;
pub mod planner;
pub mod pool;

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use cf_client::{BbsApi, BbsClient, BbsConfig, CfApi, CfSession, ClientError, SessionConfig};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tracing::{debug, error};

use crate::clock::Clock;
use crate::error::ExporterError;
use crate::filter::{Family, Filter};
use crate::snapshot::{FailureKind, Snapshot, SnapshotError};
use handlers::JobContext;
pub use planner::{plan, Job};
pub use pool::{JobQueue, WorkerPool, DEFAULT_WORKERS};

/// Builds the API clients used by a scrape.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect_cf(&self) -> Result<Arc<dyn CfApi>, ClientError>;

    /// `None` when BBS is not configured.
    fn connect_bbs(&self) -> Result<Option<Arc<dyn BbsApi>>, ClientError>;
}

/// Connects to the real Cloud Controller and BBS.
#[derive(Debug, Clone)]
pub struct CfConnector {
    session: SessionConfig,
    bbs: Option<BbsConfig>,
}

impl CfConnector {
    pub fn new(session: SessionConfig, bbs: Option<BbsConfig>) -> Self {
        Self { session, bbs }
    }
}

#[async_trait]
impl Connector for CfConnector {
    async fn connect_cf(&self) -> Result<Arc<dyn CfApi>, ClientError> {
        let session = CfSession::connect(self.session.clone()).await?;
        Ok(Arc::new(session))
    }

    fn connect_bbs(&self) -> Result<Option<Arc<dyn BbsApi>>, ClientError> {
        match &self.bbs {
            Some(config) => {
                let client = BbsClient::new(config.clone())?;
                Ok(Some(Arc::new(client)))
            }
            None => Ok(None),
        }
    }
}

/// Runs the planned jobs for every scrape.
pub struct Fetcher {
    filter: Filter,
    task_states: Vec<String>,
    connector: Arc<dyn Connector>,
    pool: WorkerPool,
    clock: Arc<dyn Clock>,
    events_since: Mutex<DateTime<Utc>>,
}

impl Fetcher {
    pub fn new(
        filter: Filter,
        task_states: Vec<String>,
        connector: Arc<dyn Connector>,
        workers: usize,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let events_since = Mutex::new(clock.now());
        Self {
            filter,
            task_states,
            connector,
            pool: WorkerPool::new(workers),
            clock,
            events_since,
        }
    }

    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    /// Lower bound used for the next events listing.
    pub fn events_since(&self) -> DateTime<Utc> {
        *self.events_since.lock()
    }

    /// Fetches everything the filter needs. Failures are reported through
    /// [`Snapshot::error`], never as an `Err`.
    pub async fn get_objects(&self) -> Snapshot {
        let started = Instant::now();
        let started_at = self.clock.now();

        let cf = match self.connector.connect_cf().await {
            Ok(cf) => cf,
            Err(source) => return connect_failure("cloud controller", source, started),
        };
        let bbs = match self.connector.connect_bbs() {
            Ok(bbs) => bbs,
            Err(source) => return connect_failure("bbs", source, started),
        };

        let jobs = plan(&self.filter);
        debug!(jobs = jobs.len(), workers = self.pool.workers(), "dispatching fetch jobs");

        let ctx = Arc::new(JobContext {
            cf,
            bbs,
            filter: self.filter.clone(),
            task_states: self.task_states.clone(),
            events_since: self.events_since(),
            snapshot: Mutex::new(Snapshot::new()),
        });
        let job_ctx = Arc::clone(&ctx);
        let failure = self
            .pool
            .run(jobs, move |job, queue| {
                handlers::run(Arc::clone(&job_ctx), job, queue)
            })
            .await;

        let mut snapshot = std::mem::take(&mut *ctx.snapshot.lock());
        snapshot.took = started.elapsed().as_secs_f64();
        match failure {
            Some(e) => {
                snapshot.error = Some(SnapshotError {
                    kind: FailureKind::Fetch,
                    message: e.to_string(),
                });
            }
            None => {
                if self.filter.enabled(Family::Events) {
                    *self.events_since.lock() = started_at;
                }
                debug!(took = snapshot.took, "fetch complete");
            }
        }
        snapshot
    }
}

fn connect_failure(target: &'static str, source: ClientError, started: Instant) -> Snapshot {
    let e = ExporterError::Connect { target, source };
    error!(error = %e, "unable to build API client");
    let mut snapshot = Snapshot::new();
    snapshot.took = started.elapsed().as_secs_f64();
    snapshot.error = Some(SnapshotError {
        kind: FailureKind::Connect,
        message: e.to_string(),
    });
    snapshot
}
