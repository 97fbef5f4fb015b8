use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use prometheus::core::Collector;
use prometheus::GaugeVec;

use super::{gauge_vec, Emitter, ScrapeMeta};
use crate::clock::Clock;
use crate::config::MetricsConfig;
use crate::error::Result;
use crate::filter::Family;
use crate::snapshot::Snapshot;

/// Audit events newer than a watermark carried across scrapes.
///
/// The watermark starts at construction time. After each successful scrape
/// it moves to the later of the scrape time and the newest emitted event,
/// so an event is reported at most once even when the Cloud Controller
/// clock runs ahead of ours. Skew in the other direction is not
/// compensated.
pub struct EventsEmitter {
    meta: ScrapeMeta,
    info: GaugeVec,
    watermark: Mutex<DateTime<Utc>>,
}

impl EventsEmitter {
    pub fn new(config: &MetricsConfig, clock: &dyn Clock) -> Result<Self> {
        Ok(Self {
            meta: ScrapeMeta::new(config, Family::Events)?,
            info: gauge_vec(
                config,
                "events",
                "info",
                "Labeled Cloud Foundry Event information with a constant '1' value.",
                &[
                    "type",
                    "actor_guid",
                    "actor_type",
                    "actor_name",
                    "actor_username",
                    "target_guid",
                    "target_type",
                    "target_name",
                    "space_id",
                    "organization_id",
                ],
            )?,
            watermark: Mutex::new(clock.now()),
        })
    }

    pub fn watermark(&self) -> DateTime<Utc> {
        *self.watermark.lock()
    }
}

impl Emitter for EventsEmitter {
    fn family(&self) -> Family {
        Family::Events
    }

    fn meta(&self) -> &ScrapeMeta {
        &self.meta
    }

    fn metrics(&self) -> Vec<&dyn Collector> {
        vec![&self.info]
    }

    fn project(&self, snapshot: &Snapshot, now: DateTime<Utc>) -> usize {
        let mut watermark = self.watermark.lock();
        let mut next = (*watermark).max(now);
        for event in snapshot.events.values() {
            if event.created_at <= *watermark {
                continue;
            }
            next = next.max(event.created_at);
            let username = snapshot
                .users
                .get(&event.actor.guid)
                .and_then(|u| u.username.as_deref())
                .unwrap_or("");
            self.info
                .with_label_values(&[
                    &event.kind,
                    &event.actor.guid,
                    &event.actor.kind,
                    &event.actor.name,
                    username,
                    &event.target.guid,
                    &event.target.kind,
                    &event.target.name,
                    event.space.as_ref().map(|s| s.guid.as_str()).unwrap_or(""),
                    event
                        .organization
                        .as_ref()
                        .map(|o| o.guid.as_str())
                        .unwrap_or(""),
                ])
                .set(1.0);
        }
        *watermark = next;
        0
    }

    fn reset(&self) {
        self.info.reset();
    }
}
