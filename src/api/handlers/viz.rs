//! Chart handlers.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;

use crate::api::dto::ChartQuery;
use crate::app_state::AppState;
use crate::domain::RepoName;
use crate::error::{ErrorResponse, MonitorError};

/// `GET /viz/{owner}/{repo}/pr-intervals.png?days=N` — PR activity chart.
///
/// # Errors
///
/// Returns [`MonitorError::InvalidParameter`] for a bad `days`, or
/// [`MonitorError::NoData`] with fewer than two PRs in the window.
#[utoipa::path(
    get,
    path = "/viz/{owner}/{repo}/pr-intervals.png",
    tag = "Visualization",
    summary = "Pull request interval chart",
    description = "PNG with the PR timeline and a histogram of the intervals between PRs over the last `days` days.",
    params(
        ("owner" = String, Path, description = "Repository owner"),
        ("repo" = String, Path, description = "Repository name"),
        ChartQuery,
    ),
    responses(
        (status = 200, description = "PNG image", content_type = "image/png", body = Vec<u8>),
        (status = 400, description = "Invalid days", body = ErrorResponse),
        (status = 404, description = "Fewer than two pull requests in the window", body = ErrorResponse),
    )
)]
pub async fn pr_intervals_png(
    State(state): State<AppState>,
    Path((owner, repo)): Path<(String, String)>,
    query: Result<Query<ChartQuery>, QueryRejection>,
) -> Result<impl IntoResponse, MonitorError> {
    let repo = RepoName::new(&owner, &repo)?;
    let Query(query) = query?;
    let days = query.days.unwrap_or(state.viz_default_days);
    let png = state.viz.pr_interval_chart(&repo, days).await?;
    Ok(([(CONTENT_TYPE, "image/png"), (CACHE_CONTROL, "no-store")], png))
}

/// Visualization routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/viz/{owner}/{repo}/pr-intervals.png", get(pr_intervals_png))
}
