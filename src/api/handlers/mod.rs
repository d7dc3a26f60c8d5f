//! REST endpoint handlers organized by resource.

pub mod events;
pub mod metrics;
pub mod system;
pub mod viz;

use axum::Router;

use crate::app_state::AppState;

/// Composes all resource routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(metrics::routes())
        .merge(viz::routes())
        .merge(events::routes())
}
