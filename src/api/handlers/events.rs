//! Event listing handlers: stored events per repo and the live feed.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{Duration, Utc};

use crate::api::dto::{EventListResponse, EventRangeQuery, FeedEventsResponse, PaginationParams};
use crate::app_state::AppState;
use crate::domain::{RepoName, normalize};
use crate::error::{ErrorResponse, MonitorError};
use crate::feed::FeedTarget;

const DEFAULT_WINDOW_HOURS: i64 = 24;

/// Wait suggested to clients when the feed gives no reset time.
const FALLBACK_RETRY_SECS: u64 = 60;

/// `GET /events/{owner}/{repo}` — Stored events in a time range.
///
/// # Errors
///
/// Returns [`MonitorError::InvalidParameter`] for malformed timestamps or
/// `since >= until`.
#[utoipa::path(
    get,
    path = "/events/{owner}/{repo}",
    tag = "Events",
    summary = "List stored events",
    description = "Stored events for a repository with `since <= createdAt < until`, oldest first. Defaults to the last 24 hours.",
    params(
        ("owner" = String, Path, description = "Repository owner"),
        ("repo" = String, Path, description = "Repository name"),
        EventRangeQuery,
    ),
    responses(
        (status = 200, description = "Events in range", body = EventListResponse),
        (status = 400, description = "Invalid range", body = ErrorResponse),
        (status = 503, description = "Event store unavailable", body = ErrorResponse),
    )
)]
pub async fn list_repo_events(
    State(state): State<AppState>,
    Path((owner, repo)): Path<(String, String)>,
    query: Result<Query<EventRangeQuery>, QueryRejection>,
) -> Result<impl IntoResponse, MonitorError> {
    let repo = RepoName::new(&owner, &repo)?;
    let Query(query) = query?;
    let until = query.until.unwrap_or_else(Utc::now);
    let since = query
        .since
        .unwrap_or(until - Duration::hours(DEFAULT_WINDOW_HOURS));
    if since >= until {
        return Err(MonitorError::InvalidParameter(
            "since must be earlier than until".to_string(),
        ));
    }

    let events = state.store.query_range(&repo, since, until).await?;
    Ok(Json(EventListResponse {
        repo: repo.to_string(),
        since,
        until,
        count: events.len(),
        events,
    }))
}

/// `GET /github/events` — One page of the live public feed.
///
/// Records are normalized the same way the collector does; untracked
/// types are dropped and counted in `skipped`. Nothing is stored.
///
/// # Errors
///
/// Returns [`MonitorError::RateLimited`] while the feed quota is exhausted
/// and [`MonitorError::FeedUnavailable`] if the feed fails.
#[utoipa::path(
    get,
    path = "/github/events",
    tag = "Events",
    summary = "Live public feed",
    description = "Fetches one page of the public GitHub event feed and returns the tracked events on it.",
    params(PaginationParams),
    responses(
        (status = 200, description = "Tracked events on the page", body = FeedEventsResponse),
        (status = 400, description = "Invalid paging", body = ErrorResponse),
        (status = 429, description = "Feed quota exhausted", body = ErrorResponse),
        (status = 502, description = "Feed unavailable", body = ErrorResponse),
    )
)]
pub async fn live_feed(
    State(state): State<AppState>,
    query: Result<Query<PaginationParams>, QueryRejection>,
) -> Result<impl IntoResponse, MonitorError> {
    let Query(paging) = query?;
    let PaginationParams { page, per_page } = paging.validated()?;

    let feed_page = state
        .feed
        .fetch_page(&FeedTarget::Public, page, per_page)
        .await?;
    if feed_page.throttled {
        let retry_after_secs = feed_page
            .rate_limit
            .reset_at
            .and_then(|at| u64::try_from((at - Utc::now()).num_seconds()).ok())
            .map_or(FALLBACK_RETRY_SECS, |secs| secs.max(1));
        return Err(MonitorError::RateLimited { retry_after_secs });
    }

    let total = feed_page.records.len();
    let events: Vec<_> = feed_page
        .records
        .iter()
        .filter_map(|raw| normalize(raw).ok())
        .collect();

    Ok(Json(FeedEventsResponse {
        page,
        per_page,
        skipped: total - events.len(),
        events,
    }))
}

/// Event listing routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/events/{owner}/{repo}", get(list_repo_events))
        .route("/github/events", get(live_feed))
}
