//! REST API layer: route handlers, DTOs, and router composition.
//!
//! Routes are mounted at the root. With the `swagger-ui` feature the
//! OpenAPI document is served at `/api-docs/openapi.json` and browsable
//! at `/swagger-ui`.

pub mod dto;
pub mod handlers;

use axum::Router;
use utoipa::OpenApi;

use crate::app_state::AppState;

/// OpenAPI document covering every REST endpoint.
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "GitHub Events Monitor",
        description = "Collects GitHub events and serves repository activity metrics."
    ),
    paths(
        handlers::metrics::avg_pr_interval,
        handlers::metrics::event_counts,
        handlers::metrics::event_counts_all,
        handlers::viz::pr_intervals_png,
        handlers::events::list_repo_events,
        handlers::events::live_feed,
        handlers::system::health_handler,
    ),
    tags(
        (name = "Metrics", description = "Derived repository metrics"),
        (name = "Visualization", description = "Rendered charts"),
        (name = "Events", description = "Stored and live events"),
        (name = "System", description = "Service status"),
    )
)]
pub struct ApiDoc;

/// Builds the complete API router with all REST endpoints.
pub fn build_router() -> Router<AppState> {
    let router = Router::new()
        .merge(handlers::routes())
        .merge(handlers::system::routes());

    #[cfg(feature = "swagger-ui")]
    let router = router.merge(
        utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
            .url("/api-docs/openapi.json", ApiDoc::openapi()),
    );

    router
}
