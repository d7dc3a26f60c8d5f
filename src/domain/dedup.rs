//! Bounded recent-id filter.
//!
//! The feed returns overlapping pages across polls, so most ids arrive more
//! than once. [`RecentIds`] suppresses repeats cheaply before they reach
//! the store. It is bounded both by count and by age; once an id is
//! evicted it may be reported as new again, and the store's primary key
//! turns the second insert into a no-op.

use std::time::Duration;

use moka::sync::Cache;

/// Size- and age-bounded set of recently observed event ids.
///
/// Backed by a `moka` cache: ids expire `max_age` after they were first
/// observed, and the least valuable ids are evicted once `capacity` is
/// exceeded.
#[derive(Debug)]
pub struct RecentIds {
    ids: Cache<String, ()>,
}

impl RecentIds {
    /// Creates a filter holding at most `capacity` ids for at most `max_age`.
    ///
    /// A capacity of zero is raised to one.
    #[must_use]
    pub fn new(capacity: usize, max_age: Duration) -> Self {
        let capacity = u64::try_from(capacity.max(1)).unwrap_or(u64::MAX);
        let ids = Cache::builder()
            .max_capacity(capacity)
            .time_to_live(max_age)
            .build();
        Self { ids }
    }

    /// Records `id` and returns `true` if it was not seen inside the window.
    pub fn observe(&self, id: &str) -> bool {
        self.ids.entry(id.to_string()).or_insert(()).is_fresh()
    }

    /// Drops `id` so the next observation reports it as new again.
    ///
    /// Used when the store write for a freshly observed id failed.
    pub fn forget(&self, id: &str) {
        self.ids.invalidate(id);
    }

    /// Number of ids currently held, after pending evictions are applied.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.run_pending_tasks();
        usize::try_from(self.ids.entry_count()).unwrap_or(usize::MAX)
    }

    /// Returns `true` if no ids are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
