use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::warn;
use tokio::task::JoinHandle;

use crate::storage::Storage;

pub const REFRESH_INTERVAL: Duration = Duration::from_secs(15);
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Reported for a backend that is not configured or was never counted.
const UNSET: i64 = -1;

/// Event-count gauges, refreshed off the request path.
#[derive(Debug)]
pub struct Metrics {
    primary_events: AtomicI64,
    secondary_events: AtomicI64,
}

impl Default for Metrics {
    fn default() -> Self {
        Metrics {
            primary_events: AtomicI64::new(UNSET),
            secondary_events: AtomicI64::new(UNSET),
        }
    }
}

impl Metrics {
    pub fn primary_events(&self) -> i64 {
        self.primary_events.load(Ordering::Relaxed)
    }

    pub fn secondary_events(&self) -> i64 {
        self.secondary_events.load(Ordering::Relaxed)
    }

    /// A failed count keeps the previous value.
    pub async fn refresh(&self, storage: &dyn Storage) {
        match storage.count().await {
            Ok(count) => self.primary_events.store(count, Ordering::Relaxed),
            Err(err) => warn!("Failed to get primary event count: {}", err),
        }
        match storage.secondary_count().await {
            Some(Ok(count)) => self.secondary_events.store(count, Ordering::Relaxed),
            Some(Err(err)) => warn!("Failed to get secondary event count: {}", err),
            None => self.secondary_events.store(UNSET, Ordering::Relaxed),
        }
    }

    /// Refreshes now, then every `period`, until the handle is aborted.
    pub fn spawn_refresher(
        self: Arc<Self>,
        storage: Arc<dyn Storage>,
        period: Duration,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                self.refresh(storage.as_ref()).await;
            }
        })
    }

    pub fn render(&self) -> String {
        format!(
            "# HELP webhook_dispatcher_primary_events_total Total number of events stored in the primary store\n\
# TYPE webhook_dispatcher_primary_events_total gauge\n\
webhook_dispatcher_primary_events_total {}\n\
# HELP webhook_dispatcher_secondary_events_total Total number of events stored in the secondary store\n\
# TYPE webhook_dispatcher_secondary_events_total gauge\n\
webhook_dispatcher_secondary_events_total {}\n",
            self.primary_events(),
            self.secondary_events(),
        )
    }
}
