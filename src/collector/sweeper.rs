//! Periodic purge of expired events.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::persistence::EventStore;

/// Spawns a task that calls [`EventStore::purge_expired`] every `every`.
///
/// Failures are logged and retried on the next tick. The task exits when
/// `shutdown` flips to `true` or its sender is dropped.
pub fn spawn_expiry_sweeper(
    store: Arc<dyn EventStore>,
    every: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = interval.tick() => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
            }
            match store.purge_expired(Utc::now()).await {
                Ok(0) => {}
                Ok(removed) => tracing::info!(removed, "purged expired events"),
                Err(e) => tracing::warn!(error = %e, "expiry sweep failed"),
            }
        }
        tracing::debug!("expiry sweeper stopped");
    })
}
