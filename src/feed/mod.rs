//! Event feed client.
//!
//! [`FeedSource`] is the collector's view of the third-party feed: one
//! page of raw records plus the quota signals that came with it. The
//! concrete [`GithubFeed`] talks to the GitHub REST API; tests substitute
//! scripted sources.

pub mod github;

use std::fmt;

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::{RateLimitState, RepoName};
use crate::error::MonitorError;

pub use github::GithubFeed;

/// Which feed to read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedTarget {
    /// The global public event stream.
    Public,
    /// The event stream of a single repository.
    Repo(RepoName),
}

impl fmt::Display for FeedTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Public => f.write_str("public"),
            Self::Repo(name) => write!(f, "repo:{name}"),
        }
    }
}

/// One page of raw feed records.
#[derive(Debug, Clone, Default)]
pub struct FeedPage {
    /// Raw, unvalidated records in feed order.
    pub records: Vec<Value>,
    /// Quota signals from the response headers.
    pub rate_limit: RateLimitState,
    /// The feed refused the request because the quota is exhausted.
    /// `records` is empty when this is set.
    pub throttled: bool,
}

/// Source of raw feed pages.
#[async_trait]
pub trait FeedSource: Send + Sync + fmt::Debug {
    /// Fetches page `page` (1-based) of `target` with `per_page` records.
    ///
    /// Throttling is reported through [`FeedPage::throttled`], not as an
    /// error.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::FeedUnavailable`] on network failure,
    /// timeout, unexpected status, or an unreadable body.
    async fn fetch_page(
        &self,
        target: &FeedTarget,
        page: u32,
        per_page: u32,
    ) -> Result<FeedPage, MonitorError>;
}
