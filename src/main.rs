//! github-events-monitor server entry point.
//!
//! Starts the event collector and the Axum HTTP server, and stops both on
//! Ctrl-C or SIGTERM.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::watch;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use github_events_monitor::api;
use github_events_monitor::app_state::AppState;
use github_events_monitor::collector::{Collector, CollectorSettings, spawn_expiry_sweeper};
use github_events_monitor::config::{LogFormat, MonitorConfig};
use github_events_monitor::feed::{FeedSource, GithubFeed};
use github_events_monitor::persistence::{
    EventStore, InMemoryEventStore, PostgresEventStore, TimeoutStore,
};
use github_events_monitor::service::{ChartSize, MetricsService, VisualizationService};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = MonitorConfig::from_env()
        .map_err(|e| anyhow::anyhow!("invalid configuration: {e}"))?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt().with_env_filter(filter).json().init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
    tracing::info!(addr = %config.listen_addr, "starting github-events-monitor");

    // Build persistence layer
    let backend: Arc<dyn EventStore> = if config.persistence_enabled {
        Arc::new(PostgresEventStore::connect(&config).await?)
    } else {
        tracing::info!("persistence disabled; events are kept in memory");
        Arc::new(InMemoryEventStore::with_retention(config.retention()))
    };
    let store: Arc<dyn EventStore> = Arc::new(TimeoutStore::new(
        backend,
        Duration::from_secs(config.store_timeout_secs),
    ));

    // Start background tasks
    let feed: Arc<dyn FeedSource> = Arc::new(GithubFeed::new(&config)?);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let collector = Collector::new(
        Arc::clone(&feed),
        Arc::clone(&store),
        CollectorSettings::from_config(&config),
    );
    let collector_status = collector.status();
    let collector_task = tokio::spawn(collector.run(shutdown_rx.clone()));

    let sweeper_task = config.retention().is_limited().then(|| {
        spawn_expiry_sweeper(
            Arc::clone(&store),
            Duration::from_secs(config.retention_sweep_secs),
            shutdown_rx,
        )
    });

    // Build application state
    let app_state = AppState {
        metrics: Arc::new(MetricsService::new(Arc::clone(&store))),
        viz: Arc::new(VisualizationService::new(
            Arc::clone(&store),
            ChartSize::default(),
        )),
        store,
        feed,
        collector: collector_status,
        viz_default_days: config.viz_default_days,
    };

    // Build router
    let app = api::build_router()
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.request_timeout_secs,
        )))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Stop background tasks
    let _ = shutdown_tx.send(true);
    if let Err(e) = collector_task.await {
        tracing::error!(error = %e, "collector task failed");
    }
    if let Some(task) = sweeper_task {
        if let Err(e) = task.await {
            tracing::error!(error = %e, "expiry sweeper task failed");
        }
    }

    tracing::info!("shutdown complete");
    Ok(())
}

/// Resolves on Ctrl-C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "cannot listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received ctrl-c"),
        () = terminate => tracing::info!("received SIGTERM"),
    }
}
