//! Stored event model: repository names, tracked event types, and counts.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::MonitorError;

/// Action carried by a `PullRequestEvent` that opens a pull request.
pub const PR_OPENED_ACTION: &str = "opened";

/// Repository identifier in `owner/repo` form.
///
/// Always lowercase: GitHub treats repository names case-insensitively,
/// so `Rust-Lang/Rust` and `rust-lang/rust` share one partition.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
#[serde(try_from = "String", into = "String")]
#[schema(value_type = String, example = "rust-lang/rust")]
pub struct RepoName(String);

impl RepoName {
    /// Builds a repository name from its owner and repository parts.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::InvalidParameter`] if either part is empty
    /// or contains a `/` or whitespace.
    pub fn new(owner: &str, repo: &str) -> Result<Self, MonitorError> {
        validate_part("owner", owner)?;
        validate_part("repo", repo)?;
        Ok(Self(format!("{owner}/{repo}").to_lowercase()))
    }

    /// Returns the normalized `owner/repo` string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the owner part.
    #[must_use]
    pub fn owner(&self) -> &str {
        self.0.split_once('/').map_or("", |(owner, _)| owner)
    }

    /// Returns the repository part.
    #[must_use]
    pub fn repo(&self) -> &str {
        self.0.split_once('/').map_or("", |(_, repo)| repo)
    }
}

fn validate_part(label: &str, part: &str) -> Result<(), MonitorError> {
    if part.is_empty() || part.contains('/') || part.chars().any(char::is_whitespace) {
        return Err(MonitorError::InvalidParameter(format!(
            "invalid repository {label}: {part:?}"
        )));
    }
    Ok(())
}

impl FromStr for RepoName {
    type Err = MonitorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (owner, repo) = s.trim().split_once('/').ok_or_else(|| {
            MonitorError::InvalidParameter(format!("repository must be owner/repo: {s:?}"))
        })?;
        Self::new(owner, repo)
    }
}

impl TryFrom<String> for RepoName {
    type Error = MonitorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RepoName> for String {
    fn from(name: RepoName) -> Self {
        name.0
    }
}

impl fmt::Display for RepoName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Feed event types the monitor tracks. Everything else is skipped.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
pub enum EventType {
    /// Someone starred the repository.
    WatchEvent,
    /// Pull request activity (opened, closed, ...).
    PullRequestEvent,
    /// Issue activity (opened, closed, ...).
    IssuesEvent,
}

impl EventType {
    /// All tracked types, in reporting order.
    pub const ALL: [Self; 3] = [Self::WatchEvent, Self::PullRequestEvent, Self::IssuesEvent];

    /// Returns the feed's name for this type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::WatchEvent => "WatchEvent",
            Self::PullRequestEvent => "PullRequestEvent",
            Self::IssuesEvent => "IssuesEvent",
        }
    }

    /// Looks up a tracked type by its feed name; `None` for untracked types.
    #[must_use]
    pub fn from_feed_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == name)
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A normalized feed event as persisted by the event store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Feed-assigned identifier, unique across the whole feed.
    pub id: String,
    /// Repository the event belongs to.
    pub repo_name: RepoName,
    /// Tracked event type.
    pub event_type: EventType,
    /// Creation time reported by the feed, in UTC.
    pub created_at: DateTime<Utc>,
    /// `payload.action` (e.g. `opened`, `started`), when present.
    pub action: Option<String>,
    /// Login of the actor that triggered the event, when present.
    pub actor: Option<String>,
    /// Expiry marker stamped by the store; `None` means retained indefinitely.
    pub expire_at: Option<DateTime<Utc>>,
}

impl Event {
    /// Returns `true` if this event records a pull request being opened.
    #[must_use]
    pub fn is_pr_opened(&self) -> bool {
        self.event_type == EventType::PullRequestEvent
            && self.action.as_deref() == Some(PR_OPENED_ACTION)
    }

    /// Returns `true` if the event's expiry marker is at or before `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expire_at.is_some_and(|at| at <= now)
    }
}

/// Event counts per tracked type.
///
/// Every tracked type is always present; types with no matching events
/// report zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct EventCounts(BTreeMap<EventType, u64>);

impl EventCounts {
    /// Creates counts with every tracked type set to zero.
    #[must_use]
    pub fn zeroed() -> Self {
        Self(EventType::ALL.into_iter().map(|t| (t, 0)).collect())
    }

    /// Adds `n` to the count for `event_type`.
    pub fn add(&mut self, event_type: EventType, n: u64) {
        let slot = self.0.entry(event_type).or_insert(0);
        *slot = slot.saturating_add(n);
    }

    /// Returns the count for `event_type`.
    #[must_use]
    pub fn get(&self, event_type: EventType) -> u64 {
        self.0.get(&event_type).copied().unwrap_or(0)
    }

    /// Returns the sum over all types.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.0.values().sum()
    }
}

impl Default for EventCounts {
    fn default() -> Self {
        Self::zeroed()
    }
}
