//! PostgreSQL implementation of the event store.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use super::models::EventRow;
use super::{EventStore, RetentionPolicy};
use crate::config::MonitorConfig;
use crate::domain::{Event, EventCounts, EventType, RepoName};
use crate::error::MonitorError;

fn storage_error(e: impl std::fmt::Display) -> MonitorError {
    MonitorError::StorageUnavailable(e.to_string())
}

/// PostgreSQL-backed event store using `sqlx::PgPool`.
///
/// Uniqueness is enforced by the `id` primary key; inserts use
/// `ON CONFLICT (id) DO NOTHING`. PostgreSQL has no native row TTL, so
/// `expire_at` is filtered on read and purged by the expiry sweeper.
#[derive(Debug, Clone)]
pub struct PostgresEventStore {
    pool: PgPool,
    retention: RetentionPolicy,
}

impl PostgresEventStore {
    /// Creates a store over an existing connection pool.
    #[must_use]
    pub fn new(pool: PgPool, retention: RetentionPolicy) -> Self {
        Self { pool, retention }
    }

    /// Connects using the database settings in `config` and applies the
    /// embedded migrations.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::StorageUnavailable`] if the database cannot
    /// be reached or a migration fails.
    pub async fn connect(config: &MonitorConfig) -> Result<Self, MonitorError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .min_connections(config.database_min_connections)
            .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
            .connect(&config.database_url)
            .await
            .map_err(storage_error)?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(storage_error)?;

        tracing::info!(
            max_connections = config.database_max_connections,
            "connected to postgres event store"
        );
        Ok(Self::new(pool, config.retention()))
    }
}

#[async_trait]
impl EventStore for PostgresEventStore {
    async fn insert(&self, event: &Event) -> Result<bool, MonitorError> {
        let result = sqlx::query(
            "INSERT INTO github_events \
             (id, repo_name, event_type, action, actor, created_at, expire_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT (id) DO NOTHING",
        )
        .bind(&event.id)
        .bind(event.repo_name.as_str())
        .bind(event.event_type.as_str())
        .bind(event.action.as_deref())
        .bind(event.actor.as_deref())
        .bind(event.created_at)
        .bind(self.retention.expire_at(Utc::now()))
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;

        Ok(result.rows_affected() == 1)
    }

    async fn query_range(
        &self,
        repo: &RepoName,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Event>, MonitorError> {
        let rows = sqlx::query_as::<_, EventRow>(
            "SELECT id, repo_name, event_type, action, actor, created_at, expire_at \
             FROM github_events \
             WHERE repo_name = $1 AND created_at >= $2 AND created_at < $3 \
               AND (expire_at IS NULL OR expire_at > $4) \
             ORDER BY created_at ASC, id ASC",
        )
        .bind(repo.as_str())
        .bind(start)
        .bind(end)
        .bind(Utc::now())
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;

        let mut events = Vec::with_capacity(rows.len());
        for row in rows {
            match Event::try_from(row) {
                Ok(event) => events.push(event),
                Err(e) => tracing::warn!(error = %e, "skipping unreadable event row"),
            }
        }
        Ok(events)
    }

    async fn count_by_type(
        &self,
        repo: &RepoName,
        since: DateTime<Utc>,
    ) -> Result<EventCounts, MonitorError> {
        let rows = sqlx::query_as::<_, (String, i64)>(
            "SELECT event_type, COUNT(*) FROM github_events \
             WHERE repo_name = $1 AND created_at >= $2 \
               AND (expire_at IS NULL OR expire_at > $3) \
             GROUP BY event_type",
        )
        .bind(repo.as_str())
        .bind(since)
        .bind(Utc::now())
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;

        Ok(counts_from_rows(rows))
    }

    async fn count_by_type_all(&self, since: DateTime<Utc>) -> Result<EventCounts, MonitorError> {
        let rows = sqlx::query_as::<_, (String, i64)>(
            "SELECT event_type, COUNT(*) FROM github_events \
             WHERE created_at >= $1 \
               AND (expire_at IS NULL OR expire_at > $2) \
             GROUP BY event_type",
        )
        .bind(since)
        .bind(Utc::now())
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;

        Ok(counts_from_rows(rows))
    }

    async fn count_all(&self) -> Result<u64, MonitorError> {
        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM github_events WHERE expire_at IS NULL OR expire_at > $1",
        )
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(storage_error)?;

        Ok(u64::try_from(total).unwrap_or(0))
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, MonitorError> {
        let result = sqlx::query("DELETE FROM github_events WHERE expire_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(storage_error)?;

        Ok(result.rows_affected())
    }
}

/// Folds `(event_type, count)` rows into zero-filled counts; unknown type
/// names are ignored.
fn counts_from_rows(rows: Vec<(String, i64)>) -> EventCounts {
    let mut counts = EventCounts::zeroed();
    for (name, count) in rows {
        if let Some(event_type) = EventType::from_feed_name(&name) {
            counts.add(event_type, u64::try_from(count).unwrap_or(0));
        }
    }
    counts
}
