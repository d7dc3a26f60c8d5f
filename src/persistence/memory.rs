//! In-process event store.
//!
//! Partitions events by repository; each partition is a `BTreeMap` keyed
//! by `(created_at, id)`, so range scans come out in time order for free.
//! A separate id set enforces uniqueness across partitions.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::ops::Bound;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{EventStore, RetentionPolicy};
use crate::domain::{Event, EventCounts, RepoName};
use crate::error::MonitorError;

type Partition = BTreeMap<(DateTime<Utc>, String), Event>;

#[derive(Debug, Default)]
struct Inner {
    partitions: HashMap<RepoName, Partition>,
    ids: HashSet<String>,
}

/// Event store held entirely in memory.
///
/// Used when PostgreSQL persistence is disabled, and by tests. Contents are
/// lost on restart.
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    inner: RwLock<Inner>,
    retention: RetentionPolicy,
}

impl InMemoryEventStore {
    /// Creates an empty store that keeps events indefinitely.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty store applying `retention` to every insert.
    #[must_use]
    pub fn with_retention(retention: RetentionPolicy) -> Self {
        Self {
            inner: RwLock::default(),
            retention,
        }
    }
}

fn partition_range(
    partition: &Partition,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> impl Iterator<Item = &Event> {
    // `String::new()` sorts before every id, so these bounds select
    // exactly `start <= created_at < end`.
    let lower = Bound::Included((start, String::new()));
    let upper = Bound::Excluded((end, String::new()));
    let range = if start < end {
        Some(partition.range((lower, upper)))
    } else {
        None
    };
    range.into_iter().flatten().map(|(_, event)| event)
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn insert(&self, event: &Event) -> Result<bool, MonitorError> {
        let mut inner = self.inner.write().await;
        if !inner.ids.insert(event.id.clone()) {
            return Ok(false);
        }
        let mut stored = event.clone();
        stored.expire_at = self.retention.expire_at(Utc::now());
        inner
            .partitions
            .entry(stored.repo_name.clone())
            .or_default()
            .insert((stored.created_at, stored.id.clone()), stored);
        Ok(true)
    }

    async fn query_range(
        &self,
        repo: &RepoName,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Event>, MonitorError> {
        let now = Utc::now();
        let inner = self.inner.read().await;
        let Some(partition) = inner.partitions.get(repo) else {
            return Ok(Vec::new());
        };
        Ok(partition_range(partition, start, end)
            .filter(|event| !event.is_expired(now))
            .cloned()
            .collect())
    }

    async fn count_by_type(
        &self,
        repo: &RepoName,
        since: DateTime<Utc>,
    ) -> Result<EventCounts, MonitorError> {
        let now = Utc::now();
        let inner = self.inner.read().await;
        let mut counts = EventCounts::zeroed();
        if let Some(partition) = inner.partitions.get(repo) {
            let live = partition
                .range((Bound::Included((since, String::new())), Bound::Unbounded))
                .map(|(_, event)| event)
                .filter(|event| !event.is_expired(now));
            for event in live {
                counts.add(event.event_type, 1);
            }
        }
        Ok(counts)
    }

    async fn count_by_type_all(&self, since: DateTime<Utc>) -> Result<EventCounts, MonitorError> {
        let now = Utc::now();
        let inner = self.inner.read().await;
        let mut counts = EventCounts::zeroed();
        let live = inner
            .partitions
            .values()
            .flat_map(|partition| {
                partition.range((Bound::Included((since, String::new())), Bound::Unbounded))
            })
            .map(|(_, event)| event)
            .filter(|event| !event.is_expired(now));
        for event in live {
            counts.add(event.event_type, 1);
        }
        Ok(counts)
    }

    async fn count_all(&self) -> Result<u64, MonitorError> {
        let now = Utc::now();
        let inner = self.inner.read().await;
        let live = inner
            .partitions
            .values()
            .flat_map(BTreeMap::values)
            .filter(|event| !event.is_expired(now))
            .count();
        Ok(live as u64)
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, MonitorError> {
        let mut guard = self.inner.write().await;
        let Inner { partitions, ids } = &mut *guard;
        let mut removed = 0_u64;
        for partition in partitions.values_mut() {
            partition.retain(|_, event| {
                if event.is_expired(now) {
                    ids.remove(&event.id);
                    removed += 1;
                    false
                } else {
                    true
                }
            });
        }
        partitions.retain(|_, partition| !partition.is_empty());
        Ok(removed)
    }
}
