//! Background feed collector.
//!
//! A single task drives the pipeline
//! `fetch -> normalize -> dedup -> store -> rate-limit gate` on a timer.
//! The loop is sequential: the next sleep starts only after the previous
//! pass returns, so ticks are never queued and passes never overlap. No
//! error ends the loop; feed and storage failures are logged and retried
//! on the next tick.

pub mod sweeper;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{RwLock, watch};
use tracing::{debug, error, info, warn};
use utoipa::ToSchema;

use crate::config::MonitorConfig;
use crate::domain::{RateLimitGate, RateLimitState, RecentIds, normalize};
use crate::error::MonitorError;
use crate::feed::{FeedSource, FeedTarget};
use crate::persistence::EventStore;

pub use sweeper::spawn_expiry_sweeper;

/// Collector state machine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CollectorState {
    /// Waiting for the next tick.
    #[default]
    Idle,
    /// A fetch/normalize/dedup/store pass is in progress.
    Polling,
}

/// Externally visible collector progress, served by the health endpoint.
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CollectorStatus {
    /// Current state.
    pub state: CollectorState,
    /// Passes completed since startup.
    pub polls_completed: u64,
    /// Events written to the store since startup.
    pub events_stored: u64,
    /// When the last pass finished.
    pub last_poll_at: Option<DateTime<Utc>>,
    /// The last pass's failure, if it had one.
    pub last_error: Option<String>,
    /// Delay chosen after the last pass, in seconds.
    pub next_delay_secs: u64,
}

/// Shared read handle on the collector's [`CollectorStatus`].
#[derive(Debug, Clone, Default)]
pub struct StatusHandle(Arc<RwLock<CollectorStatus>>);

impl StatusHandle {
    /// Returns a copy of the current status.
    pub async fn snapshot(&self) -> CollectorStatus {
        self.0.read().await.clone()
    }
}

/// Outcome of one collector pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollReport {
    /// Pages fetched successfully.
    pub pages_fetched: u32,
    /// Raw records received.
    pub records_seen: usize,
    /// Records the normalizer rejected.
    pub skipped: usize,
    /// Records suppressed by the dedup filter or the store's id key.
    pub duplicates: usize,
    /// New rows written.
    pub stored: usize,
    /// The feed reported an exhausted quota.
    pub throttled: bool,
    /// The first failure of the pass, if any.
    pub error: Option<String>,
    /// Delay before the next pass.
    pub next_delay: Duration,
}

/// Tuning knobs for [`Collector`].
#[derive(Debug, Clone)]
pub struct CollectorSettings {
    /// Feeds polled on every pass, in order.
    pub targets: Vec<FeedTarget>,
    /// Pages read per target per pass.
    pub pages_per_poll: u32,
    /// Records requested per page.
    pub per_page: u32,
    /// Delay policy.
    pub gate: RateLimitGate,
    /// Dedup filter capacity.
    pub dedup_capacity: usize,
    /// Dedup filter window.
    pub dedup_max_age: Duration,
}

impl CollectorSettings {
    /// Derives collector settings from the service configuration: the
    /// public feed first, then each watched repository.
    #[must_use]
    pub fn from_config(config: &MonitorConfig) -> Self {
        let targets = std::iter::once(FeedTarget::Public)
            .chain(config.watched_repos.iter().cloned().map(FeedTarget::Repo))
            .collect();
        Self {
            targets,
            pages_per_poll: config.pages_per_poll,
            per_page: config.per_page,
            gate: RateLimitGate::new(config.poll_interval(), config.rate_limit_threshold),
            dedup_capacity: config.dedup_capacity,
            dedup_max_age: Duration::from_secs(config.dedup_max_age_secs),
        }
    }
}

/// Timer-driven ingestion loop.
#[derive(Debug)]
pub struct Collector {
    feed: Arc<dyn FeedSource>,
    store: Arc<dyn EventStore>,
    settings: CollectorSettings,
    dedup: RecentIds,
    status: StatusHandle,
}

impl Collector {
    /// Creates an idle collector.
    #[must_use]
    pub fn new(
        feed: Arc<dyn FeedSource>,
        store: Arc<dyn EventStore>,
        settings: CollectorSettings,
    ) -> Self {
        let dedup = RecentIds::new(settings.dedup_capacity, settings.dedup_max_age);
        Self {
            feed,
            store,
            settings,
            dedup,
            status: StatusHandle::default(),
        }
    }

    /// Returns a handle for reading the collector's status.
    #[must_use]
    pub fn status(&self) -> StatusHandle {
        self.status.clone()
    }

    /// Runs until `shutdown` flips to `true` or its sender is dropped.
    ///
    /// The first pass starts immediately. Shutdown is observed between
    /// passes; a pass in progress always completes, and every insert is
    /// atomic per event.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!(
            targets = self.settings.targets.len(),
            interval_secs = self.settings.gate.interval().as_secs(),
            "collector started"
        );
        let mut delay = Duration::ZERO;
        loop {
            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
            }
            delay = self.poll_once().await.next_delay;
        }
        info!("collector stopped");
    }

    /// Runs one full pass over every target and returns what happened.
    pub async fn poll_once(&mut self) -> PollReport {
        self.set_state(CollectorState::Polling).await;

        let mut report = PollReport::default();
        let mut last_rate_limit: Option<RateLimitState> = None;
        let targets = self.settings.targets.clone();

        'targets: for target in &targets {
            for page in 1..=self.settings.pages_per_poll {
                let fetched = match self
                    .feed
                    .fetch_page(target, page, self.settings.per_page)
                    .await
                {
                    Ok(fetched) => fetched,
                    Err(e) => {
                        warn!(feed = %target, page, error = %e, "feed fetch failed");
                        report.error.get_or_insert_with(|| e.to_string());
                        continue 'targets;
                    }
                };
                last_rate_limit = Some(fetched.rate_limit);

                if fetched.throttled {
                    report.throttled = true;
                    break 'targets;
                }
                report.pages_fetched += 1;
                report.records_seen += fetched.records.len();
                let exhausted_page = fetched.records.is_empty();

                if let Err(e) = self.ingest(&fetched.records, &mut report).await {
                    error!(feed = %target, page, error = %e, "storing events failed");
                    report.error.get_or_insert_with(|| e.to_string());
                    break 'targets;
                }
                if exhausted_page || self.settings.gate.is_exhausted(&fetched.rate_limit) {
                    break;
                }
            }
        }

        let gate = &self.settings.gate;
        report.next_delay = match &last_rate_limit {
            Some(state) if report.throttled => gate.throttled_delay(state, Utc::now()),
            Some(state) => gate.next_delay(state, Utc::now()),
            None => gate.interval(),
        };

        info!(
            pages = report.pages_fetched,
            seen = report.records_seen,
            stored = report.stored,
            duplicates = report.duplicates,
            skipped = report.skipped,
            throttled = report.throttled,
            next_poll_secs = report.next_delay.as_secs(),
            "poll complete"
        );
        self.finish(&report).await;
        report
    }

    /// Normalizes, dedups and stores one page of records.
    ///
    /// Stops at the first storage failure; the failed id is released from
    /// the dedup filter so it is retried on the next pass.
    async fn ingest(
        &mut self,
        records: &[serde_json::Value],
        report: &mut PollReport,
    ) -> Result<(), MonitorError> {
        for raw in records {
            let event = match normalize(raw) {
                Ok(event) => event,
                Err(reason) => {
                    debug!(%reason, "record skipped");
                    report.skipped += 1;
                    continue;
                }
            };
            if !self.dedup.observe(&event.id) {
                report.duplicates += 1;
                continue;
            }
            match self.store.insert(&event).await {
                Ok(true) => report.stored += 1,
                Ok(false) => report.duplicates += 1,
                Err(e) => {
                    self.dedup.forget(&event.id);
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    async fn set_state(&self, state: CollectorState) {
        self.status.0.write().await.state = state;
    }

    async fn finish(&self, report: &PollReport) {
        let mut status = self.status.0.write().await;
        status.state = CollectorState::Idle;
        status.polls_completed += 1;
        status.events_stored += report.stored as u64;
        status.last_poll_at = Some(Utc::now());
        status.last_error.clone_from(&report.error);
        status.next_delay_secs = report.next_delay.as_secs();
    }
}
