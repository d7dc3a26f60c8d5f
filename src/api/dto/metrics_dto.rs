//! Metric and chart DTOs.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::{EventCounts, EventType};
use crate::error::MonitorError;

/// Query parameters for the event-counts endpoints.
#[derive(Debug, Clone, Copy, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct OffsetQuery {
    /// Look-back window in minutes; must be a positive integer.
    #[param(required = true, minimum = 1, example = 10)]
    pub offset: Option<i64>,
}

impl OffsetQuery {
    /// Returns the offset, which the endpoints require.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::InvalidParameter`] if `offset` was omitted.
    pub fn required(self) -> Result<i64, MonitorError> {
        self.offset
            .ok_or_else(|| MonitorError::InvalidParameter("offset is required".to_string()))
    }
}

/// Query parameters for `GET /viz/{owner}/{repo}/pr-intervals.png`.
#[derive(Debug, Clone, Copy, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ChartQuery {
    /// Look-back window in days (1..=365). Defaults to 10.
    #[param(minimum = 1, maximum = 365, example = 10)]
    pub days: Option<u32>,
}

/// Response body for the event-counts endpoint.
///
/// Every tracked type is present, zero when nothing matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct EventCountsResponse {
    /// Stars.
    #[serde(rename = "WatchEvent")]
    pub watch_event: u64,
    /// Pull request activity of any action.
    #[serde(rename = "PullRequestEvent")]
    pub pull_request_event: u64,
    /// Issue activity of any action.
    #[serde(rename = "IssuesEvent")]
    pub issues_event: u64,
}

impl From<&EventCounts> for EventCountsResponse {
    fn from(counts: &EventCounts) -> Self {
        Self {
            watch_event: counts.get(EventType::WatchEvent),
            pull_request_event: counts.get(EventType::PullRequestEvent),
            issues_event: counts.get(EventType::IssuesEvent),
        }
    }
}
