//! Raw feed record to [`Event`] normalization.
//!
//! The feed returns loosely typed JSON. [`normalize`] extracts the fields
//! the monitor stores and rejects anything it cannot trust. A rejected
//! record never fails the batch it arrived in; the caller counts it and
//! moves on.

use chrono::{DateTime, Utc};
use serde_json::Value;

use super::event::{Event, EventType, RepoName};

/// Why a raw record was not turned into an [`Event`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SkipReason {
    /// The record's `type` is outside the tracked set.
    #[error("untracked event type {0}")]
    UntrackedType(String),
    /// A required field is absent or has the wrong JSON type.
    #[error("missing field {0}")]
    MissingField(&'static str),
    /// `created_at` is present but not an RFC 3339 timestamp.
    #[error("invalid timestamp {0:?}")]
    InvalidTimestamp(String),
    /// `repo.name` is not of the form `owner/repo`.
    #[error("invalid repository name {0:?}")]
    InvalidRepoName(String),
}

/// Maps one raw feed record into an [`Event`].
///
/// Required: `type` (tracked), `id` (string or integer), `repo.name`,
/// `created_at`. Optional: `payload.action`, `actor.login`. Timestamps in
/// any offset are normalized to UTC. The returned event has no expiry
/// marker; the store stamps it on insert.
///
/// # Errors
///
/// Returns the [`SkipReason`] for records that must not be stored.
pub fn normalize(raw: &Value) -> Result<Event, SkipReason> {
    let type_name = raw
        .get("type")
        .and_then(Value::as_str)
        .ok_or(SkipReason::MissingField("type"))?;
    let event_type = EventType::from_feed_name(type_name)
        .ok_or_else(|| SkipReason::UntrackedType(type_name.to_string()))?;

    let id = match raw.get("id") {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => return Err(SkipReason::MissingField("id")),
    };

    let repo_raw = raw
        .get("repo")
        .and_then(|r| r.get("name"))
        .and_then(Value::as_str)
        .ok_or(SkipReason::MissingField("repo.name"))?;
    let repo_name: RepoName = repo_raw
        .parse()
        .map_err(|_| SkipReason::InvalidRepoName(repo_raw.to_string()))?;

    let created_raw = raw
        .get("created_at")
        .and_then(Value::as_str)
        .ok_or(SkipReason::MissingField("created_at"))?;
    let created_at = DateTime::parse_from_rfc3339(created_raw)
        .map_err(|_| SkipReason::InvalidTimestamp(created_raw.to_string()))?
        .with_timezone(&Utc);

    let action = raw
        .get("payload")
        .and_then(|p| p.get("action"))
        .and_then(Value::as_str)
        .map(str::to_string);
    let actor = raw
        .get("actor")
        .and_then(|a| a.get("login"))
        .and_then(Value::as_str)
        .map(str::to_string);

    Ok(Event {
        id,
        repo_name,
        event_type,
        created_at,
        action,
        actor,
        expire_at: None,
    })
}
