use std::sync::Arc;

use prometheus::{Encoder, Registry, TextEncoder};
use tokio::sync::Mutex;
use tracing::debug;

use crate::clock::Clock;
use crate::config::MetricsConfig;
use crate::emitters::{build_emitters, Emitter, EmitterCollector};
use crate::error::Result;
use crate::fetcher::Fetcher;

/// Owns the registry and turns each scrape into one fetch plus one pass over
/// the enabled emitters.
pub struct ScrapeComposer {
    fetcher: Fetcher,
    emitters: Vec<Arc<dyn Emitter>>,
    registry: Registry,
    clock: Arc<dyn Clock>,
    scrape_lock: Mutex<()>,
}

impl ScrapeComposer {
    pub fn new(fetcher: Fetcher, metrics: &MetricsConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        let emitters = build_emitters(fetcher.filter(), metrics, Arc::clone(&clock))?;
        let registry = Registry::new();
        for emitter in &emitters {
            registry.register(Box::new(EmitterCollector(Arc::clone(emitter))))?;
        }
        Ok(Self {
            fetcher,
            emitters,
            registry,
            clock,
            scrape_lock: Mutex::new(()),
        })
    }

    pub fn emitters(&self) -> &[Arc<dyn Emitter>] {
        &self.emitters
    }

    /// Runs one scrape and renders the text exposition format.
    pub async fn scrape(&self) -> Result<Vec<u8>> {
        let _serial = self.scrape_lock.lock().await;

        let snapshot = self.fetcher.get_objects().await;
        let now = self.clock.now();
        for emitter in &self.emitters {
            emitter.collect(&snapshot, now);
        }
        debug!(
            took = snapshot.took,
            failed = snapshot.error.is_some(),
            emitters = self.emitters.len(),
            "scrape collected"
        );

        let mut body = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut body)?;
        Ok(body)
    }
}

pub fn content_type() -> &'static str {
    prometheus::TEXT_FORMAT
}
