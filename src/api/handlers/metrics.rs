//! Metric handlers: PR interval statistics and per-type event counts.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::dto::{EventCountsResponse, OffsetQuery};
use crate::app_state::AppState;
use crate::domain::{IntervalSummary, RepoName};
use crate::error::{ErrorResponse, MonitorError};

/// `GET /metrics/{owner}/{repo}/avg-pr-interval` — Time between PRs.
///
/// # Errors
///
/// Returns [`MonitorError::NoData`] with fewer than two opened PRs on
/// record, or [`MonitorError::StorageUnavailable`] if the store fails.
#[utoipa::path(
    get,
    path = "/metrics/{owner}/{repo}/avg-pr-interval",
    tag = "Metrics",
    summary = "Average pull request interval",
    description = "Average and median seconds between consecutive opened pull requests over the repository's retained history.",
    params(
        ("owner" = String, Path, description = "Repository owner"),
        ("repo" = String, Path, description = "Repository name"),
    ),
    responses(
        (status = 200, description = "Interval statistics", body = IntervalSummary),
        (status = 400, description = "Malformed repository name", body = ErrorResponse),
        (status = 404, description = "Fewer than two pull requests", body = ErrorResponse),
        (status = 503, description = "Event store unavailable", body = ErrorResponse),
    )
)]
pub async fn avg_pr_interval(
    State(state): State<AppState>,
    Path((owner, repo)): Path<(String, String)>,
) -> Result<impl IntoResponse, MonitorError> {
    let repo = RepoName::new(&owner, &repo)?;
    let summary = state.metrics.avg_pr_interval(&repo).await?;
    Ok(Json(summary))
}

/// `GET /metrics/{owner}/{repo}/event-counts?offset=N` — Recent activity.
///
/// # Errors
///
/// Returns [`MonitorError::InvalidParameter`] if `offset` is missing,
/// non-numeric or not positive.
#[utoipa::path(
    get,
    path = "/metrics/{owner}/{repo}/event-counts",
    tag = "Metrics",
    summary = "Event counts by type",
    description = "Number of events of each tracked type created in the last `offset` minutes. Types with no events report zero.",
    params(
        ("owner" = String, Path, description = "Repository owner"),
        ("repo" = String, Path, description = "Repository name"),
        OffsetQuery,
    ),
    responses(
        (status = 200, description = "Counts per event type", body = EventCountsResponse),
        (status = 400, description = "Missing or invalid offset", body = ErrorResponse),
        (status = 503, description = "Event store unavailable", body = ErrorResponse),
    )
)]
pub async fn event_counts(
    State(state): State<AppState>,
    Path((owner, repo)): Path<(String, String)>,
    query: Result<Query<OffsetQuery>, QueryRejection>,
) -> Result<impl IntoResponse, MonitorError> {
    let repo = RepoName::new(&owner, &repo)?;
    let Query(query) = query?;
    let counts = state.metrics.event_counts(&repo, query.required()?).await?;
    Ok(Json(EventCountsResponse::from(&counts)))
}

/// `GET /metrics/event-counts?offset=N` — Recent activity across every
/// tracked repository.
///
/// # Errors
///
/// Returns [`MonitorError::InvalidParameter`] if `offset` is missing,
/// non-numeric or not positive.
#[utoipa::path(
    get,
    path = "/metrics/event-counts",
    tag = "Metrics",
    summary = "Event counts by type across repositories",
    description = "Number of events of each tracked type created in the last `offset` minutes, summed over every repository in the store.",
    params(OffsetQuery),
    responses(
        (status = 200, description = "Counts per event type", body = EventCountsResponse),
        (status = 400, description = "Missing or invalid offset", body = ErrorResponse),
        (status = 503, description = "Event store unavailable", body = ErrorResponse),
    )
)]
pub async fn event_counts_all(
    State(state): State<AppState>,
    query: Result<Query<OffsetQuery>, QueryRejection>,
) -> Result<impl IntoResponse, MonitorError> {
    let Query(query) = query?;
    let counts = state.metrics.event_counts_all(query.required()?).await?;
    Ok(Json(EventCountsResponse::from(&counts)))
}

/// Metric routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/metrics/{owner}/{repo}/avg-pr-interval", get(avg_pr_interval))
        .route("/metrics/{owner}/{repo}/event-counts", get(event_counts))
        .route("/metrics/event-counts", get(event_counts_all))
}
