//! Fixed-size pool of tokio workers draining a shared job queue.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{mpsc, Notify};
use tracing::{debug, error, warn};

use super::planner::Job;
use crate::error::ExporterError;

pub const DEFAULT_WORKERS: usize = 10;

#[derive(Debug, Default)]
struct Queue {
    jobs: Mutex<VecDeque<Job>>,
    pending: AtomicUsize,
    notify: Notify,
}

/// Handle through which running jobs enqueue follow-up work.
#[derive(Debug, Clone, Default)]
pub struct JobQueue {
    inner: Arc<Queue>,
}

impl JobQueue {
    pub fn push(&self, job: Job) {
        self.inner.pending.fetch_add(1, Ordering::AcqRel);
        self.inner.jobs.lock().push_back(job);
        self.inner.notify.notify_waiters();
    }

    pub fn pending(&self) -> usize {
        self.inner.pending.load(Ordering::Acquire)
    }

    fn pop(&self) -> Option<Job> {
        self.inner.jobs.lock().pop_front()
    }

    fn finish(&self) {
        if self.inner.pending.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.inner.notify.notify_waiters();
        }
    }
}

/// Marks a popped job finished when dropped, including on panic.
struct Finish<'a>(&'a JobQueue);

impl Drop for Finish<'_> {
    fn drop(&mut self) {
        self.0.finish();
    }
}

#[derive(Debug, Clone)]
pub struct WorkerPool {
    workers: usize,
}

impl WorkerPool {
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Runs `jobs` and everything they enqueue to completion.
    ///
    /// A failing job never stops its siblings. Returns the first error
    /// reported, or [`ExporterError::Worker`] if a job panicked; later ones
    /// are only logged.
    pub async fn run<F, Fut>(&self, jobs: Vec<Job>, handler: F) -> Option<ExporterError>
    where
        F: Fn(Job, JobQueue) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), ExporterError>> + Send + 'static,
    {
        let queue = JobQueue::default();
        for job in jobs {
            queue.push(job);
        }

        let handler = Arc::new(handler);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handles: Vec<_> = (0..self.workers)
            .map(|worker| {
                let queue = queue.clone();
                let handler = Arc::clone(&handler);
                let tx = tx.clone();
                tokio::spawn(async move { work(worker, queue, handler, tx).await })
            })
            .collect();
        drop(tx);

        let mut aborted = None;
        for result in futures::future::join_all(handles).await {
            if let Err(e) = result {
                error!(error = %e, "worker task aborted");
                aborted.get_or_insert_with(|| ExporterError::Worker(e.to_string()));
            }
        }

        let first = rx.recv().await;
        while let Some(extra) = rx.recv().await {
            warn!(error = %extra, "additional job failure");
        }
        first.or(aborted)
    }
}

async fn work<F, Fut>(
    worker: usize,
    queue: JobQueue,
    handler: Arc<F>,
    errors: mpsc::UnboundedSender<ExporterError>,
) where
    F: Fn(Job, JobQueue) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), ExporterError>> + Send + 'static,
{
    loop {
        let notified = queue.inner.notify.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();

        if let Some(job) = queue.pop() {
            let _finish = Finish(&queue);
            let name = job.name();
            debug!(worker, job = name, "job started");
            match (*handler)(job, queue.clone()).await {
                Ok(()) => debug!(worker, job = name, "job finished"),
                Err(e) => {
                    error!(worker, job = name, error = %e, "job failed");
                    let _ = errors.send(e);
                }
            }
            continue;
        }

        if queue.pending() == 0 {
            break;
        }
        notified.await;
    }
}
