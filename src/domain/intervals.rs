//! Pull request interval statistics.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

/// Seconds between each pair of consecutive timestamps, after sorting.
#[must_use]
pub fn consecutive_deltas(timestamps: &[DateTime<Utc>]) -> Vec<f64> {
    let mut sorted = timestamps.to_vec();
    sorted.sort_unstable();
    sorted
        .windows(2)
        .filter_map(|pair| match pair {
            [a, b] => Some((*b - *a).num_milliseconds() as f64 / 1000.0),
            _ => None,
        })
        .collect()
}

/// Summary of the gaps between consecutive pull request creations.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IntervalSummary {
    /// Arithmetic mean of the intervals, in seconds.
    pub average_seconds: f64,
    /// Median interval in seconds (mean of the middle pair for even counts).
    pub median_seconds: f64,
    /// Number of pull requests the intervals were computed from.
    pub pr_count: usize,
    /// Number of intervals (`pr_count - 1`).
    pub interval_count: usize,
}

impl IntervalSummary {
    /// Summarizes the intervals between `timestamps`.
    ///
    /// Returns `None` for fewer than two timestamps.
    #[must_use]
    pub fn from_timestamps(timestamps: &[DateTime<Utc>]) -> Option<Self> {
        let deltas = consecutive_deltas(timestamps);
        let average_seconds = mean(&deltas)?;
        let median_seconds = median(&deltas)?;
        Some(Self {
            average_seconds,
            median_seconds,
            pr_count: timestamps.len(),
            interval_count: deltas.len(),
        })
    }
}

/// Arithmetic mean; `None` for an empty slice.
#[must_use]
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Median; `None` for an empty slice.
#[must_use]
pub fn median(values: &[f64]) -> Option<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        sorted.get(mid).copied()
    } else {
        let lower = sorted.get(mid.checked_sub(1)?)?;
        let upper = sorted.get(mid)?;
        Some((lower + upper) / 2.0)
    }
}
