//! Raw event listing DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::Event;

/// Query parameters for `GET /events/{owner}/{repo}`.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct EventRangeQuery {
    /// Inclusive lower bound (RFC 3339). Defaults to 24 hours before `until`.
    #[param(value_type = Option<String>, format = DateTime)]
    pub since: Option<DateTime<Utc>>,
    /// Exclusive upper bound (RFC 3339). Defaults to now.
    #[param(value_type = Option<String>, format = DateTime)]
    pub until: Option<DateTime<Utc>>,
}

/// Response body for `GET /events/{owner}/{repo}`.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EventListResponse {
    /// Repository, `owner/repo`.
    pub repo: String,
    /// Inclusive lower bound applied.
    pub since: DateTime<Utc>,
    /// Exclusive upper bound applied.
    pub until: DateTime<Utc>,
    /// Number of events returned.
    pub count: usize,
    /// Events in creation order.
    pub events: Vec<Event>,
}

/// Response body for `GET /github/events`.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FeedEventsResponse {
    /// Page that was fetched.
    pub page: u32,
    /// Page size that was requested.
    pub per_page: u32,
    /// Records on the page that are not tracked or are malformed.
    pub skipped: usize,
    /// Tracked events on the page, in feed order.
    pub events: Vec<Event>,
}
