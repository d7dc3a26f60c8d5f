//! Visualization service: PNG charts of repository activity.

use std::sync::Arc;

use chrono::{Duration, Utc};

use super::chart::{ChartSize, render_pr_chart};
use crate::domain::RepoName;
use crate::error::MonitorError;
use crate::persistence::EventStore;

/// Longest look-back window accepted for a chart, in days.
pub const MAX_CHART_DAYS: u32 = 365;

/// Renders charts from the event store.
#[derive(Debug, Clone)]
pub struct VisualizationService {
    store: Arc<dyn EventStore>,
    size: ChartSize,
}

impl VisualizationService {
    /// Creates a service rendering `size` charts from `store`.
    #[must_use]
    pub fn new(store: Arc<dyn EventStore>, size: ChartSize) -> Self {
        Self { store, size }
    }

    /// PNG of the repo's opened pull requests over the last `days` days.
    ///
    /// # Errors
    ///
    /// - [`MonitorError::InvalidParameter`] unless `1 <= days <= 365`.
    /// - [`MonitorError::NoData`] with fewer than two PRs in the window.
    /// - [`MonitorError::StorageUnavailable`] if the store fails.
    pub async fn pr_interval_chart(
        &self,
        repo: &RepoName,
        days: u32,
    ) -> Result<Vec<u8>, MonitorError> {
        if !(1..=MAX_CHART_DAYS).contains(&days) {
            return Err(MonitorError::InvalidParameter(format!(
                "days must be between 1 and {MAX_CHART_DAYS}, got {days}"
            )));
        }

        let now = Utc::now();
        let start = now - Duration::days(i64::from(days));
        let timestamps: Vec<_> = self
            .store
            .query_range(repo, start, now + Duration::seconds(1))
            .await?
            .into_iter()
            .filter(|e| e.is_pr_opened())
            .map(|e| e.created_at)
            .collect();

        if timestamps.len() < 2 {
            return Err(MonitorError::NoData(format!(
                "{repo} has {} opened pull request(s) in the last {days} day(s)",
                timestamps.len()
            )));
        }

        let size = self.size;
        tokio::task::spawn_blocking(move || render_pr_chart(&timestamps, size))
            .await
            .map_err(|e| MonitorError::Internal(format!("chart task failed: {e}")))?
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{Event, EventType, PR_OPENED_ACTION};
    use crate::persistence::InMemoryEventStore;

    fn repo() -> RepoName {
        let Ok(repo) = RepoName::new("acme", "widgets") else {
            panic!("valid repo");
        };
        repo
    }

    fn pr(id: &str, hours_ago: i64) -> Event {
        Event {
            id: id.to_string(),
            repo_name: repo(),
            event_type: EventType::PullRequestEvent,
            created_at: Utc::now() - Duration::hours(hours_ago),
            action: Some(PR_OPENED_ACTION.to_string()),
            actor: None,
            expire_at: None,
        }
    }

    async fn service_with(events: &[Event]) -> VisualizationService {
        let store = Arc::new(InMemoryEventStore::new());
        for e in events {
            let _ = store.insert(e).await;
        }
        VisualizationService::new(store, ChartSize { width: 320, height: 160 })
    }

    #[tokio::test]
    async fn renders_chart_within_window() {
        let service = service_with(&[pr("1", 50), pr("2", 20), pr("3", 2)]).await;
        let Ok(png) = service.pr_interval_chart(&repo(), 10).await else {
            panic!("chart should render");
        };
        assert!(png.starts_with(b"\x89PNG"));
    }

    #[tokio::test]
    async fn prs_outside_window_are_ignored() {
        // only one PR inside the last day
        let service = service_with(&[pr("1", 72), pr("2", 48), pr("3", 3)]).await;
        assert!(matches!(
            service.pr_interval_chart(&repo(), 1).await,
            Err(MonitorError::NoData(_))
        ));
    }

    #[tokio::test]
    async fn days_out_of_range_is_invalid() {
        let service = service_with(&[]).await;
        for days in [0, 366] {
            assert!(matches!(
                service.pr_interval_chart(&repo(), days).await,
                Err(MonitorError::InvalidParameter(_))
            ));
        }
    }
}
