//! Database row models for the `github_events` table.

use chrono::{DateTime, Utc};
use sqlx::FromRow;

use crate::domain::{Event, EventType};
use crate::error::MonitorError;

/// A stored row from the `github_events` table.
#[derive(Debug, Clone, FromRow)]
pub struct EventRow {
    /// Feed event id (primary key).
    pub id: String,
    /// Lowercase `owner/repo`.
    pub repo_name: String,
    /// Feed type name (e.g. `"WatchEvent"`).
    pub event_type: String,
    /// `payload.action`, if any.
    pub action: Option<String>,
    /// Actor login, if any.
    pub actor: Option<String>,
    /// Feed creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Expiry marker; `NULL` when retained indefinitely.
    pub expire_at: Option<DateTime<Utc>>,
}

impl TryFrom<EventRow> for Event {
    type Error = MonitorError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        let event_type = EventType::from_feed_name(&row.event_type).ok_or_else(|| {
            MonitorError::Internal(format!(
                "row {} has unknown event type {}",
                row.id, row.event_type
            ))
        })?;
        Ok(Self {
            repo_name: row.repo_name.parse()?,
            id: row.id,
            event_type,
            created_at: row.created_at,
            action: row.action,
            actor: row.actor,
            expire_at: row.expire_at,
        })
    }
}
