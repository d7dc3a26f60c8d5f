//! Feed quota tracking and poll delay policy.

use std::time::Duration;

use chrono::{DateTime, Utc};

/// Quota signals reported by the feed with its last response.
///
/// Every field is optional: anonymous, failed, or proxied responses may
/// omit any of the headers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RateLimitState {
    /// Requests left in the current quota window (`X-RateLimit-Remaining`).
    pub remaining: Option<u32>,
    /// When the quota window resets (`X-RateLimit-Reset`).
    pub reset_at: Option<DateTime<Utc>>,
    /// Minimum poll spacing requested by the feed (`X-Poll-Interval`).
    pub poll_interval_hint: Option<Duration>,
}

/// Decides how long the collector waits before its next poll.
///
/// Pure: a function of the last [`RateLimitState`] and the current time.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitGate {
    interval: Duration,
    threshold: u32,
}

impl RateLimitGate {
    /// Creates a gate with the configured poll `interval` and the quota
    /// `threshold` at or below which the gate waits for the reset.
    #[must_use]
    pub const fn new(interval: Duration, threshold: u32) -> Self {
        Self {
            interval,
            threshold,
        }
    }

    /// The configured poll interval.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Returns `true` if the remaining quota is known and at or below the
    /// threshold.
    #[must_use]
    pub fn is_exhausted(&self, state: &RateLimitState) -> bool {
        state.remaining.is_some_and(|r| r <= self.threshold)
    }

    /// Delay before the next permitted poll.
    ///
    /// Never shorter than the configured interval or the feed's poll hint.
    /// When the quota is exhausted, waits until the reset time if that is
    /// later still.
    #[must_use]
    pub fn next_delay(&self, state: &RateLimitState, now: DateTime<Utc>) -> Duration {
        if self.is_exhausted(state) {
            self.throttled_delay(state, now)
        } else {
            self.base_delay(state)
        }
    }

    /// Delay after the feed refused a request outright.
    ///
    /// Waits until the reset time whatever the remaining count says; a
    /// secondary-limit refusal carries only `Retry-After`.
    #[must_use]
    pub fn throttled_delay(&self, state: &RateLimitState, now: DateTime<Utc>) -> Duration {
        let until_reset = state
            .reset_at
            .and_then(|reset| (reset - now).to_std().ok())
            .unwrap_or(Duration::ZERO);
        self.base_delay(state).max(until_reset)
    }

    fn base_delay(&self, state: &RateLimitState) -> Duration {
        state
            .poll_interval_hint
            .map_or(self.interval, |hint| hint.max(self.interval))
    }
}
