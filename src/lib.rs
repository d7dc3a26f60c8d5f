//! # github-events-monitor
//!
//! Collects GitHub events and serves repository activity metrics.
//!
//! A background collector polls the public event feed (and optionally a
//! set of watched repositories), keeps `WatchEvent`, `PullRequestEvent`
//! and `IssuesEvent` records, and writes them to an event store. The HTTP
//! API computes metrics and charts from whatever the store holds.
//!
//! ## Architecture
//!
//! ```text
//! GitHub REST API
//!     │
//!     ├── GithubFeed (feed/)
//!     │
//!     ├── Collector (collector/)
//!     │     normalize -> dedup -> store -> rate-limit gate
//!     │
//!     ├── EventStore (persistence/)
//!     │     in-memory | PostgreSQL, behind a timeout wrapper
//!     │
//!     ├── MetricsService, VisualizationService (service/)
//!     │
//!     └── REST Handlers (api/)
//!           │
//!         Clients (HTTP)
//! ```

pub mod api;
pub mod app_state;
pub mod collector;
pub mod config;
pub mod domain;
pub mod error;
pub mod feed;
pub mod persistence;
pub mod service;
