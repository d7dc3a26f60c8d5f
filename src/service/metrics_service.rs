//! Metrics service: derived repository metrics over the event store.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::domain::{EventCounts, IntervalSummary, RepoName};
use crate::error::MonitorError;
use crate::persistence::{EventStore, history_end, history_start};

/// Stateless calculator for repository activity metrics.
#[derive(Debug, Clone)]
pub struct MetricsService {
    store: Arc<dyn EventStore>,
}

impl MetricsService {
    /// Creates a service reading from `store`.
    #[must_use]
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self { store }
    }

    /// Average time between consecutive pull request creations over the
    /// repo's full retained history.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::NoData`] when fewer than two pull requests
    /// were opened, or [`MonitorError::StorageUnavailable`] if the store
    /// fails.
    pub async fn avg_pr_interval(&self, repo: &RepoName) -> Result<IntervalSummary, MonitorError> {
        let timestamps: Vec<_> = self
            .store
            .query_range(repo, history_start(), history_end())
            .await?
            .into_iter()
            .filter(|e| e.is_pr_opened())
            .map(|e| e.created_at)
            .collect();

        IntervalSummary::from_timestamps(&timestamps).ok_or_else(|| {
            MonitorError::NoData(format!(
                "{repo} has {} opened pull request(s); at least 2 are needed",
                timestamps.len()
            ))
        })
    }

    /// Events per type for `repo` created in the last `offset_minutes`.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::InvalidParameter`] unless `offset_minutes`
    /// is a positive, representable minute count, or
    /// [`MonitorError::StorageUnavailable`] if the store fails.
    pub async fn event_counts(
        &self,
        repo: &RepoName,
        offset_minutes: i64,
    ) -> Result<EventCounts, MonitorError> {
        let since = since_offset(offset_minutes)?;
        self.store.count_by_type(repo, since).await
    }

    /// Events per type across every repository created in the last
    /// `offset_minutes`.
    ///
    /// # Errors
    ///
    /// Same as [`MetricsService::event_counts`].
    pub async fn event_counts_all(&self, offset_minutes: i64) -> Result<EventCounts, MonitorError> {
        let since = since_offset(offset_minutes)?;
        self.store.count_by_type_all(since).await
    }
}

fn since_offset(offset_minutes: i64) -> Result<DateTime<Utc>, MonitorError> {
    (offset_minutes > 0)
        .then(|| Duration::try_minutes(offset_minutes))
        .flatten()
        .and_then(|offset| Utc::now().checked_sub_signed(offset))
        .ok_or_else(|| {
            MonitorError::InvalidParameter(format!(
                "offset must be a positive number of minutes, got {offset_minutes}"
            ))
        })
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{Event, EventType, PR_OPENED_ACTION};
    use crate::persistence::InMemoryEventStore;

    fn repo() -> RepoName {
        let Ok(repo) = "acme/widgets".parse() else {
            panic!("valid repo");
        };
        repo
    }

    fn event(id: &str, event_type: EventType, action: Option<&str>, at: DateTime<Utc>) -> Event {
        Event {
            id: id.to_string(),
            repo_name: repo(),
            event_type,
            created_at: at,
            action: action.map(str::to_string),
            actor: None,
            expire_at: None,
        }
    }

    async fn service_with(events: &[Event]) -> MetricsService {
        let store = Arc::new(InMemoryEventStore::new());
        for e in events {
            let _ = store.insert(e).await;
        }
        MetricsService::new(store)
    }

    #[tokio::test]
    async fn average_interval_over_three_prs() {
        let t0 = Utc::now() - Duration::days(1);
        let service = service_with(&[
            event("p1", EventType::PullRequestEvent, Some(PR_OPENED_ACTION), t0),
            event(
                "p2",
                EventType::PullRequestEvent,
                Some(PR_OPENED_ACTION),
                t0 + Duration::seconds(100),
            ),
            event(
                "p3",
                EventType::PullRequestEvent,
                Some(PR_OPENED_ACTION),
                t0 + Duration::seconds(300),
            ),
            // closing a PR or starring the repo is not a PR creation
            event("c1", EventType::PullRequestEvent, Some("closed"), t0 + Duration::seconds(50)),
            event("w1", EventType::WatchEvent, Some("started"), t0 + Duration::seconds(20)),
        ])
        .await;

        let Ok(summary) = service.avg_pr_interval(&repo()).await else {
            panic!("three PRs give an average");
        };
        assert!((summary.average_seconds - 150.0).abs() < 1e-9);
        assert_eq!(summary.pr_count, 3);
    }

    #[tokio::test]
    async fn fewer_than_two_prs_is_no_data() {
        let empty = service_with(&[]).await;
        assert!(matches!(
            empty.avg_pr_interval(&repo()).await,
            Err(MonitorError::NoData(_))
        ));

        let single = service_with(&[event(
            "p1",
            EventType::PullRequestEvent,
            Some(PR_OPENED_ACTION),
            Utc::now(),
        )])
        .await;
        assert!(matches!(
            single.avg_pr_interval(&repo()).await,
            Err(MonitorError::NoData(_))
        ));
    }

    #[tokio::test]
    async fn event_counts_within_offset() {
        let now = Utc::now();
        let service = service_with(&[
            event("w1", EventType::WatchEvent, None, now - Duration::minutes(1)),
            event("w2", EventType::WatchEvent, None, now - Duration::minutes(3)),
            event("w3", EventType::WatchEvent, None, now - Duration::minutes(8)),
            event("p1", EventType::PullRequestEvent, None, now - Duration::minutes(4)),
            event("w-old", EventType::WatchEvent, None, now - Duration::minutes(20)),
        ])
        .await;

        let Ok(counts) = service.event_counts(&repo(), 10).await else {
            panic!("counts should succeed");
        };
        assert_eq!(counts.get(EventType::WatchEvent), 3);
        assert_eq!(counts.get(EventType::PullRequestEvent), 1);
        assert_eq!(counts.get(EventType::IssuesEvent), 0);
    }

    #[tokio::test]
    async fn event_counts_all_spans_repositories() {
        let now = Utc::now();
        let mut elsewhere = event("i1", EventType::IssuesEvent, None, now - Duration::minutes(2));
        let Ok(other) = "other/repo".parse() else {
            panic!("valid repo");
        };
        elsewhere.repo_name = other;
        let service = service_with(&[
            event("w1", EventType::WatchEvent, None, now - Duration::minutes(1)),
            event("w-old", EventType::WatchEvent, None, now - Duration::minutes(20)),
            elsewhere,
        ])
        .await;

        let Ok(counts) = service.event_counts_all(10).await else {
            panic!("counts should succeed");
        };
        assert_eq!(counts.get(EventType::WatchEvent), 1);
        assert_eq!(counts.get(EventType::IssuesEvent), 1);
        assert!(matches!(
            service.event_counts_all(0).await,
            Err(MonitorError::InvalidParameter(_))
        ));
    }

    #[tokio::test]
    async fn non_positive_offset_is_invalid() {
        let service = service_with(&[]).await;
        for offset in [0, -5, i64::MAX] {
            assert!(matches!(
                service.event_counts(&repo(), offset).await,
                Err(MonitorError::InvalidParameter(_))
            ));
        }
    }
}
