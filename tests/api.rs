//! HTTP-level tests: the full router over an in-memory store.

#![allow(clippy::panic)]

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use chrono::{DateTime, Duration, Utc};
use serde_json::{Value, json};
use tower::ServiceExt;

use github_events_monitor::api;
use github_events_monitor::app_state::AppState;
use github_events_monitor::collector::StatusHandle;
use github_events_monitor::domain::{
    Event, EventCounts, EventType, PR_OPENED_ACTION, RateLimitState, RepoName,
};
use github_events_monitor::error::MonitorError;
use github_events_monitor::feed::{FeedPage, FeedSource, FeedTarget};
use github_events_monitor::persistence::{EventStore, InMemoryEventStore};
use github_events_monitor::service::{ChartSize, MetricsService, VisualizationService};

#[derive(Debug, Clone)]
struct StaticFeed(FeedPage);

#[async_trait]
impl FeedSource for StaticFeed {
    async fn fetch_page(
        &self,
        _target: &FeedTarget,
        _page: u32,
        _per_page: u32,
    ) -> Result<FeedPage, MonitorError> {
        Ok(self.0.clone())
    }
}

/// Store whose every call fails, as an unreachable database would.
#[derive(Debug)]
struct BrokenStore;

fn down<T>() -> Result<T, MonitorError> {
    Err(MonitorError::StorageUnavailable("connection refused".to_string()))
}

#[async_trait]
impl EventStore for BrokenStore {
    async fn insert(&self, _event: &Event) -> Result<bool, MonitorError> {
        down()
    }
    async fn query_range(
        &self,
        _repo: &RepoName,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
    ) -> Result<Vec<Event>, MonitorError> {
        down()
    }
    async fn count_by_type(
        &self,
        _repo: &RepoName,
        _since: DateTime<Utc>,
    ) -> Result<EventCounts, MonitorError> {
        down()
    }
    async fn count_by_type_all(&self, _since: DateTime<Utc>) -> Result<EventCounts, MonitorError> {
        down()
    }
    async fn count_all(&self) -> Result<u64, MonitorError> {
        down()
    }
    async fn purge_expired(&self, _now: DateTime<Utc>) -> Result<u64, MonitorError> {
        down()
    }
}

fn event(id: &str, event_type: EventType, action: Option<&str>, at: DateTime<Utc>) -> Event {
    event_in("acme/widgets", id, event_type, action, at)
}

fn event_in(
    repo: &str,
    id: &str,
    event_type: EventType,
    action: Option<&str>,
    at: DateTime<Utc>,
) -> Event {
    let Ok(repo_name) = repo.parse() else {
        panic!("valid repo");
    };
    Event {
        id: id.to_string(),
        repo_name,
        event_type,
        created_at: at,
        action: action.map(str::to_string),
        actor: Some("octocat".to_string()),
        expire_at: None,
    }
}

async fn app_with(events: &[Event], feed: FeedPage) -> Router {
    let store: Arc<dyn EventStore> = Arc::new(InMemoryEventStore::new());
    for e in events {
        let Ok(true) = store.insert(e).await else {
            panic!("insert {}", e.id);
        };
    }
    app_over(store, feed)
}

fn app_over(store: Arc<dyn EventStore>, feed: FeedPage) -> Router {
    let state = AppState {
        metrics: Arc::new(MetricsService::new(Arc::clone(&store))),
        viz: Arc::new(VisualizationService::new(
            Arc::clone(&store),
            ChartSize {
                width: 320,
                height: 160,
            },
        )),
        store,
        feed: Arc::new(StaticFeed(feed)),
        collector: StatusHandle::default(),
        viz_default_days: 10,
    };
    api::build_router().with_state(state)
}

async fn get(app: Router, uri: &str) -> (StatusCode, Option<String>, Vec<u8>) {
    let Ok(request) = Request::builder().uri(uri).body(Body::empty()) else {
        panic!("valid request");
    };
    let Ok(response) = app.oneshot(request).await else {
        panic!("router is infallible");
    };
    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let Ok(body) = to_bytes(response.into_body(), usize::MAX).await else {
        panic!("body should be readable");
    };
    (status, content_type, body.to_vec())
}

fn json_body(body: &[u8]) -> Value {
    let Ok(value) = serde_json::from_slice(body) else {
        panic!("body is not JSON: {}", String::from_utf8_lossy(body));
    };
    value
}

fn pr_history() -> Vec<Event> {
    let t0 = Utc::now() - Duration::days(2);
    vec![
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
    ]
}

#[tokio::test]
async fn event_counts_are_zero_filled() {
    let now = Utc::now();
    let app = app_with(
        &[
            event("w1", EventType::WatchEvent, Some("started"), now - Duration::minutes(2)),
            event("w2", EventType::WatchEvent, Some("started"), now - Duration::minutes(30)),
        ],
        FeedPage::default(),
    )
    .await;

    let (status, _, body) = get(app, "/metrics/acme/widgets/event-counts?offset=10").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json_body(&body),
        json!({"WatchEvent": 1, "PullRequestEvent": 0, "IssuesEvent": 0})
    );
}

#[tokio::test]
async fn event_counts_reject_bad_offset() {
    for uri in [
        "/metrics/acme/widgets/event-counts",
        "/metrics/acme/widgets/event-counts?offset=abc",
        "/metrics/acme/widgets/event-counts?offset=0",
        "/metrics/acme/widgets/event-counts?offset=-3",
    ] {
        let app = app_with(&[], FeedPage::default()).await;
        let (status, _, body) = get(app, uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(json_body(&body)["error"]["code"], json!(1001), "{uri}");
    }
}

#[tokio::test]
async fn event_counts_without_repo_span_every_repository() {
    let now = Utc::now();
    let app = app_with(
        &[
            event("w1", EventType::WatchEvent, Some("started"), now - Duration::minutes(2)),
            event_in(
                "globex/gadgets",
                "w2",
                EventType::WatchEvent,
                Some("started"),
                now - Duration::minutes(3),
            ),
            event_in(
                "globex/gadgets",
                "i1",
                EventType::IssuesEvent,
                Some("opened"),
                now - Duration::minutes(4),
            ),
            event("old", EventType::PullRequestEvent, Some(PR_OPENED_ACTION), now - Duration::hours(2)),
        ],
        FeedPage::default(),
    )
    .await;

    let (status, _, body) = get(app.clone(), "/metrics/event-counts?offset=10").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json_body(&body),
        json!({"WatchEvent": 2, "PullRequestEvent": 0, "IssuesEvent": 1})
    );

    let (status, _, body) = get(app, "/metrics/event-counts").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json_body(&body)["error"]["code"], json!(1001));
}

#[tokio::test]
async fn event_counts_surface_store_outage_as_503() {
    let app = app_over(Arc::new(BrokenStore), FeedPage::default());
    for uri in [
        "/metrics/acme/widgets/event-counts?offset=10",
        "/metrics/event-counts?offset=10",
    ] {
        let (status, _, body) = get(app.clone(), uri).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE, "{uri}");
        assert_eq!(json_body(&body)["error"]["code"], json!(3001), "{uri}");
    }
}

#[tokio::test]
async fn avg_pr_interval_reports_statistics() {
    let app = app_with(&pr_history(), FeedPage::default()).await;
    let (status, _, body) = get(app, "/metrics/acme/widgets/avg-pr-interval").await;
    assert_eq!(status, StatusCode::OK);
    let body = json_body(&body);
    assert_eq!(body["averageSeconds"], json!(150.0));
    assert_eq!(body["medianSeconds"], json!(150.0));
    assert_eq!(body["prCount"], json!(3));
    assert_eq!(body["intervalCount"], json!(2));
}

#[tokio::test]
async fn avg_pr_interval_without_history_is_not_found() {
    let app = app_with(&[], FeedPage::default()).await;
    let (status, _, body) = get(app, "/metrics/acme/widgets/avg-pr-interval").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json_body(&body)["error"]["code"], json!(2001));
}

#[tokio::test]
async fn repo_names_are_case_insensitive() {
    let app = app_with(&pr_history(), FeedPage::default()).await;
    let (status, _, _) = get(app, "/metrics/ACME/Widgets/avg-pr-interval").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn chart_is_served_as_png() {
    let app = app_with(&pr_history(), FeedPage::default()).await;
    let (status, content_type, body) = get(app, "/viz/acme/widgets/pr-intervals.png?days=5").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("image/png"));
    assert!(body.starts_with(b"\x89PNG"));
}

#[tokio::test]
async fn chart_rejects_bad_days() {
    for uri in [
        "/viz/acme/widgets/pr-intervals.png?days=0",
        "/viz/acme/widgets/pr-intervals.png?days=366",
        "/viz/acme/widgets/pr-intervals.png?days=ten",
    ] {
        let app = app_with(&pr_history(), FeedPage::default()).await;
        let (status, _, body) = get(app, uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(json_body(&body)["error"]["code"], json!(1001), "{uri}");
    }
}

#[tokio::test]
async fn chart_without_prs_is_not_found() {
    let app = app_with(&[], FeedPage::default()).await;
    let (status, _, _) = get(app, "/viz/acme/widgets/pr-intervals.png").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn stored_events_default_to_last_day() {
    let now = Utc::now();
    let app = app_with(
        &[
            event("recent", EventType::IssuesEvent, Some("opened"), now - Duration::hours(1)),
            event("stale", EventType::IssuesEvent, Some("opened"), now - Duration::hours(30)),
        ],
        FeedPage::default(),
    )
    .await;

    let (status, _, body) = get(app, "/events/acme/widgets").await;
    assert_eq!(status, StatusCode::OK);
    let body = json_body(&body);
    assert_eq!(body["count"], json!(1));
    assert_eq!(body["events"][0]["id"], json!("recent"));
}

#[tokio::test]
async fn stored_events_reject_inverted_range() {
    let app = app_with(&[], FeedPage::default()).await;
    let (status, _, _) = get(
        app,
        "/events/acme/widgets?since=2024-01-02T00:00:00Z&until=2024-01-01T00:00:00Z",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn stored_events_reject_malformed_timestamps() {
    let app = app_with(&[], FeedPage::default()).await;
    let (status, content_type, body) = get(app, "/events/acme/widgets?since=yesterday").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(content_type.as_deref(), Some("application/json"));
    assert_eq!(json_body(&body)["error"]["code"], json!(1001));
}

#[tokio::test]
async fn live_feed_keeps_tracked_events() {
    let page = FeedPage {
        records: vec![
            json!({
                "id": "1",
                "type": "WatchEvent",
                "repo": {"name": "acme/widgets"},
                "payload": {"action": "started"},
                "created_at": "2024-05-01T12:00:00Z"
            }),
            json!({
                "id": "2",
                "type": "PushEvent",
                "repo": {"name": "acme/widgets"},
                "payload": {},
                "created_at": "2024-05-01T12:00:01Z"
            }),
        ],
        rate_limit: RateLimitState::default(),
        throttled: false,
    };
    let app = app_with(&[], page).await;

    let (status, _, body) = get(app, "/github/events?per_page=2").await;
    assert_eq!(status, StatusCode::OK);
    let body = json_body(&body);
    assert_eq!(body["skipped"], json!(1));
    assert_eq!(body["events"][0]["id"], json!("1"));
}

#[tokio::test]
async fn live_feed_throttling_is_429() {
    let page = FeedPage {
        records: Vec::new(),
        rate_limit: RateLimitState {
            remaining: Some(0),
            reset_at: Some(Utc::now() + Duration::seconds(90)),
            poll_interval_hint: None,
        },
        throttled: true,
    };
    let app = app_with(&[], page).await;
    let (status, _, body) = get(app, "/github/events").await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(json_body(&body)["error"]["code"], json!(4290));
}

#[tokio::test]
async fn live_feed_rejects_oversized_pages() {
    let app = app_with(&[], FeedPage::default()).await;
    for uri in [
        "/github/events?per_page=101",
        "/github/events?per_page=0",
        "/github/events?page=0",
        "/github/events?per_page=many",
    ] {
        let (status, _, body) = get(app.clone(), uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(json_body(&body)["error"]["code"], json!(1001), "{uri}");
    }
}

#[tokio::test]
async fn health_reports_store_totals() {
    let app = app_with(&pr_history(), FeedPage::default()).await;
    let (status, _, body) = get(app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    let body = json_body(&body);
    assert_eq!(body["status"], json!("healthy"));
    assert_eq!(body["totalEvents"], json!(3));
    assert_eq!(body["collector"]["state"], json!("idle"));
}
