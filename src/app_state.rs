//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::collector::StatusHandle;
use crate::feed::FeedSource;
use crate::persistence::EventStore;
use crate::service::{MetricsService, VisualizationService};

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Metric calculations.
    pub metrics: Arc<MetricsService>,
    /// Chart rendering.
    pub viz: Arc<VisualizationService>,
    /// Event store, for raw event listings and health.
    pub store: Arc<dyn EventStore>,
    /// Live feed, for the public-feed passthrough.
    pub feed: Arc<dyn FeedSource>,
    /// Background collector progress.
    pub collector: StatusHandle,
    /// Chart window used when `days` is omitted.
    pub viz_default_days: u32,
}
