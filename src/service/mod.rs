//! Service layer: read-side computations over the event store.
//!
//! [`MetricsService`] derives numeric metrics and [`VisualizationService`]
//! renders charts. Both hold only an `Arc<dyn EventStore>` and are safe to
//! share across handlers.

pub mod chart;
pub mod metrics_service;
pub mod viz_service;

pub use chart::ChartSize;
pub use metrics_service::MetricsService;
pub use viz_service::{MAX_CHART_DAYS, VisualizationService};
