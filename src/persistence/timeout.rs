//! Deadline decorator for event stores.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::EventStore;
use crate::domain::{Event, EventCounts, RepoName};
use crate::error::MonitorError;

/// Wraps an [`EventStore`] so that no call can hang longer than `limit`.
///
/// An elapsed deadline is reported as [`MonitorError::StorageUnavailable`],
/// the same as any other backend failure.
#[derive(Debug)]
pub struct TimeoutStore {
    inner: Arc<dyn EventStore>,
    limit: Duration,
}

impl TimeoutStore {
    /// Bounds every call on `inner` by `limit`.
    #[must_use]
    pub fn new(inner: Arc<dyn EventStore>, limit: Duration) -> Self {
        Self { inner, limit }
    }

    async fn bounded<T>(
        &self,
        operation: &'static str,
        fut: impl Future<Output = Result<T, MonitorError>> + Send,
    ) -> Result<T, MonitorError> {
        tokio::time::timeout(self.limit, fut).await.map_err(|_| {
            MonitorError::StorageUnavailable(format!(
                "{operation} timed out after {} ms",
                self.limit.as_millis()
            ))
        })?
    }
}

#[async_trait]
impl EventStore for TimeoutStore {
    async fn insert(&self, event: &Event) -> Result<bool, MonitorError> {
        self.bounded("insert", self.inner.insert(event)).await
    }

    async fn query_range(
        &self,
        repo: &RepoName,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Event>, MonitorError> {
        self.bounded("query_range", self.inner.query_range(repo, start, end))
            .await
    }

    async fn count_by_type(
        &self,
        repo: &RepoName,
        since: DateTime<Utc>,
    ) -> Result<EventCounts, MonitorError> {
        self.bounded("count_by_type", self.inner.count_by_type(repo, since))
            .await
    }

    async fn count_by_type_all(&self, since: DateTime<Utc>) -> Result<EventCounts, MonitorError> {
        self.bounded("count_by_type_all", self.inner.count_by_type_all(since))
            .await
    }

    async fn count_all(&self) -> Result<u64, MonitorError> {
        self.bounded("count_all", self.inner.count_all()).await
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, MonitorError> {
        self.bounded("purge_expired", self.inner.purge_expired(now))
            .await
    }
}
