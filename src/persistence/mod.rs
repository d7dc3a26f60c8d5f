//! Persistence layer: the event store interface and its backends.
//!
//! [`EventStore`] is the narrow seam between ingestion and querying. The
//! collector only inserts, the services only read, and neither knows which
//! backend is behind the trait object. The store's primary key on the event
//! id is the authority on uniqueness.

pub mod memory;
pub mod models;
pub mod postgres;
pub mod timeout;

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::domain::{Event, EventCounts, RepoName};
use crate::error::MonitorError;

pub use memory::InMemoryEventStore;
pub use postgres::PostgresEventStore;
pub use timeout::TimeoutStore;

/// Time-indexed store of normalized events.
///
/// Implementations must give read-after-write consistency per id and
/// must never return rows whose expiry marker has passed.
#[async_trait]
pub trait EventStore: Send + Sync + fmt::Debug {
    /// Inserts `event`, stamping its expiry from the retention policy.
    ///
    /// Returns `true` if a row was written and `false` if a row with the
    /// same id already existed (the existing row is left untouched).
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::StorageUnavailable`] on backend failure.
    async fn insert(&self, event: &Event) -> Result<bool, MonitorError>;

    /// Returns the repo's events with `start <= created_at < end`, ordered
    /// by `created_at` ascending (ties by id). Empty when nothing matches.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::StorageUnavailable`] on backend failure.
    async fn query_range(
        &self,
        repo: &RepoName,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Event>, MonitorError>;

    /// Counts the repo's events with `created_at >= since`, by type.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::StorageUnavailable`] on backend failure.
    async fn count_by_type(
        &self,
        repo: &RepoName,
        since: DateTime<Utc>,
    ) -> Result<EventCounts, MonitorError>;

    /// Counts events of every repository with `created_at >= since`, by
    /// type.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::StorageUnavailable`] on backend failure.
    async fn count_by_type_all(&self, since: DateTime<Utc>) -> Result<EventCounts, MonitorError>;

    /// Total number of stored, unexpired events across all repositories.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::StorageUnavailable`] on backend failure.
    async fn count_all(&self) -> Result<u64, MonitorError>;

    /// Deletes events whose expiry marker is at or before `now`; returns
    /// how many were removed.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::StorageUnavailable`] on backend failure.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, MonitorError>;
}

/// How long stored events live.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetentionPolicy {
    ttl: Option<Duration>,
}

impl RetentionPolicy {
    /// Events are never expired.
    #[must_use]
    pub const fn unlimited() -> Self {
        Self { ttl: None }
    }

    /// Events expire `ttl` after they are stored.
    #[must_use]
    pub const fn ttl(ttl: Duration) -> Self {
        Self { ttl: Some(ttl) }
    }

    /// Builds a policy from a minute count, where `0` means unlimited.
    #[must_use]
    pub fn from_minutes(minutes: u64) -> Self {
        match i64::try_from(minutes).ok().and_then(Duration::try_minutes) {
            Some(ttl) if minutes > 0 => Self::ttl(ttl),
            _ => Self::unlimited(),
        }
    }

    /// Returns `true` if rows ever expire.
    #[must_use]
    pub const fn is_limited(&self) -> bool {
        self.ttl.is_some()
    }

    /// Expiry marker for a row stored at `stored_at`.
    #[must_use]
    pub fn expire_at(&self, stored_at: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.ttl.and_then(|ttl| stored_at.checked_add_signed(ttl))
    }
}

/// Lower bound for "whole history" queries.
#[must_use]
pub fn history_start() -> DateTime<Utc> {
    DateTime::UNIX_EPOCH
}

/// Upper bound for "whole history" queries (end of year 9999).
///
/// Representable by every backend, unlike [`DateTime::MAX_UTC`].
#[must_use]
pub fn history_end() -> DateTime<Utc> {
    DateTime::from_timestamp(253_402_300_799, 0).unwrap_or(DateTime::<Utc>::MAX_UTC)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_minutes_means_unlimited() {
        let policy = RetentionPolicy::from_minutes(0);
        assert!(!policy.is_limited());
        assert_eq!(policy.expire_at(Utc::now()), None);
    }

    #[test]
    fn ttl_is_added_to_store_time() {
        let policy = RetentionPolicy::from_minutes(90);
        let now = Utc::now();
        assert_eq!(policy.expire_at(now), Some(now + Duration::minutes(90)));
    }

    #[test]
    fn history_bounds_are_ordered() {
        assert!(history_start() < history_end());
    }
}
