//! Domain layer: event model and the pure ingestion building blocks.
//!
//! Everything here is free of I/O: the normalizer, the dedup filter, the
//! rate-limit gate and the interval statistics are plain values and
//! functions that the collector and services compose.

pub mod dedup;
pub mod event;
pub mod intervals;
pub mod normalizer;
pub mod rate_limit;

pub use dedup::RecentIds;
pub use event::{Event, EventCounts, EventType, PR_OPENED_ACTION, RepoName};
pub use intervals::IntervalSummary;
pub use normalizer::{SkipReason, normalize};
pub use rate_limit::{RateLimitGate, RateLimitState};
