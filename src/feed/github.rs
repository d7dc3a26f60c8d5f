//! GitHub REST API implementation of [`FeedSource`].

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, RETRY_AFTER};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use super::{FeedPage, FeedSource, FeedTarget};
use crate::config::MonitorConfig;
use crate::domain::RateLimitState;
use crate::error::MonitorError;

const USER_AGENT: &str = concat!("github-events-monitor/", env!("CARGO_PKG_VERSION"));
const API_VERSION: &str = "2022-11-28";

/// Client for the GitHub events endpoints.
///
/// Sends an `Authorization: Bearer` header when a token is configured;
/// anonymous callers get a much smaller quota.
#[derive(Debug, Clone)]
pub struct GithubFeed {
    client: reqwest::Client,
    base_url: String,
}

impl GithubFeed {
    /// Builds a client from the feed settings in `config`.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::Internal`] if the token is not a valid
    /// header value or the HTTP client cannot be constructed.
    pub fn new(config: &MonitorConfig) -> Result<Self, MonitorError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert("x-github-api-version", HeaderValue::from_static(API_VERSION));
        if let Some(token) = &config.github_token {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token.trim()))
                .map_err(|_| MonitorError::Internal("GITHUB_TOKEN is not a valid header".into()))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(Duration::from_secs(config.feed_timeout_secs))
            .build()
            .map_err(|e| MonitorError::Internal(format!("http client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.github_api_url.clone(),
        })
    }

    fn url_for(&self, target: &FeedTarget) -> String {
        match target {
            FeedTarget::Public => format!("{}/events", self.base_url),
            FeedTarget::Repo(name) => format!(
                "{}/repos/{}/{}/events",
                self.base_url,
                name.owner(),
                name.repo()
            ),
        }
    }
}

#[async_trait]
impl FeedSource for GithubFeed {
    #[instrument(skip(self, target), fields(feed = %target))]
    async fn fetch_page(
        &self,
        target: &FeedTarget,
        page: u32,
        per_page: u32,
    ) -> Result<FeedPage, MonitorError> {
        let url = self.url_for(target);
        let response = self
            .client
            .get(&url)
            .query(&[("per_page", per_page), ("page", page)])
            .send()
            .await
            .map_err(|e| MonitorError::FeedUnavailable(format!("{target} page {page}: {e}")))?;

        let status = response.status();
        let rate_limit = rate_limit_from_headers(response.headers(), Utc::now());
        debug!(
            status = status.as_u16(),
            remaining = ?rate_limit.remaining,
            "feed responded"
        );

        if is_throttled(status, &rate_limit) {
            warn!(status = status.as_u16(), reset_at = ?rate_limit.reset_at, "feed quota exhausted");
            return Ok(FeedPage {
                records: Vec::new(),
                rate_limit,
                throttled: true,
            });
        }
        if status == StatusCode::NOT_FOUND && matches!(target, FeedTarget::Repo(_)) {
            warn!("repository feed not found");
            return Ok(FeedPage {
                records: Vec::new(),
                rate_limit,
                throttled: false,
            });
        }
        if !status.is_success() {
            return Err(MonitorError::FeedUnavailable(format!(
                "{target} page {page}: HTTP {status}"
            )));
        }

        let records = response.json::<Vec<Value>>().await.map_err(|e| {
            MonitorError::FeedUnavailable(format!("{target} page {page}: invalid body: {e}"))
        })?;

        Ok(FeedPage {
            records,
            rate_limit,
            throttled: false,
        })
    }
}

/// GitHub answers an exhausted quota with 403 (primary limit, remaining 0)
/// or 429 (secondary limit).
fn is_throttled(status: StatusCode, rate_limit: &RateLimitState) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS
        || (status == StatusCode::FORBIDDEN && rate_limit.remaining == Some(0))
}

/// Reads the quota headers. `Retry-After` stands in for a missing reset
/// time.
fn rate_limit_from_headers(headers: &HeaderMap, now: DateTime<Utc>) -> RateLimitState {
    let number = |name: &str| -> Option<u64> {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse().ok())
    };

    let remaining = number("x-ratelimit-remaining").and_then(|r| u32::try_from(r).ok());
    let reset_at = number("x-ratelimit-reset")
        .and_then(|epoch| i64::try_from(epoch).ok())
        .and_then(|epoch| DateTime::from_timestamp(epoch, 0))
        .or_else(|| {
            number(RETRY_AFTER.as_str())
                .and_then(|secs| i64::try_from(secs).ok())
                .and_then(chrono::Duration::try_seconds)
                .and_then(|wait| now.checked_add_signed(wait))
        });
    let poll_interval_hint = number("x-poll-interval").map(Duration::from_secs);

    RateLimitState {
        remaining,
        reset_at,
        poll_interval_hint,
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn feed_for(server: &MockServer, token: Option<&str>) -> GithubFeed {
        let base = server.uri();
        let token = token.map(str::to_string);
        let Ok(config) = MonitorConfig::from_lookup(|key| match key {
            "GITHUB_API_URL" => Some(base.clone()),
            "GITHUB_TOKEN" => token.clone(),
            _ => None,
        }) else {
            panic!("config must load");
        };
        let Ok(feed) = GithubFeed::new(&config) else {
            panic!("client must build");
        };
        feed
    }

    #[tokio::test]
    async fn fetches_public_page_with_quota_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/events"))
            .and(query_param("page", "2"))
            .and(query_param("per_page", "50"))
            .and(header("authorization", "Bearer secret"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([{"id": "1", "type": "WatchEvent"}]))
                    .insert_header("x-ratelimit-remaining", "4999")
                    .insert_header("x-ratelimit-reset", "1700000000")
                    .insert_header("x-poll-interval", "60"),
            )
            .mount(&server)
            .await;

        let feed = feed_for(&server, Some("secret"));
        let Ok(page) = feed.fetch_page(&FeedTarget::Public, 2, 50).await else {
            panic!("page should be fetched");
        };
        assert_eq!(page.records.len(), 1);
        assert!(!page.throttled);
        assert_eq!(page.rate_limit.remaining, Some(4999));
        assert_eq!(page.rate_limit.reset_at, DateTime::from_timestamp(1_700_000_000, 0));
        assert_eq!(page.rate_limit.poll_interval_hint, Some(Duration::from_secs(60)));
    }

    #[tokio::test]
    async fn exhausted_quota_is_a_throttled_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/events"))
            .respond_with(
                ResponseTemplate::new(403)
                    .set_body_json(json!({"message": "API rate limit exceeded"}))
                    .insert_header("x-ratelimit-remaining", "0")
                    .insert_header("x-ratelimit-reset", "1700000000"),
            )
            .mount(&server)
            .await;

        let feed = feed_for(&server, None);
        let Ok(page) = feed.fetch_page(&FeedTarget::Public, 1, 100).await else {
            panic!("throttling is not an error");
        };
        assert!(page.throttled);
        assert!(page.records.is_empty());
        assert_eq!(page.rate_limit.remaining, Some(0));
    }

    #[tokio::test]
    async fn server_errors_are_feed_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let feed = feed_for(&server, None);
        let result = feed.fetch_page(&FeedTarget::Public, 1, 100).await;
        assert!(matches!(result, Err(MonitorError::FeedUnavailable(_))));
    }

    #[tokio::test]
    async fn missing_repo_feed_is_an_empty_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/ghost/gone/events"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let feed = feed_for(&server, None);
        let Ok(repo) = "ghost/gone".parse() else {
            panic!("valid repo");
        };
        let Ok(page) = feed.fetch_page(&FeedTarget::Repo(repo), 1, 100).await else {
            panic!("404 on a repo feed is not an error");
        };
        assert!(page.records.is_empty());
        assert!(!page.throttled);
    }

    #[test]
    fn retry_after_fills_missing_reset() {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static("30"));
        let now = Utc::now();
        let state = rate_limit_from_headers(&headers, now);
        assert_eq!(state.reset_at, Some(now + chrono::Duration::seconds(30)));
        assert_eq!(state.remaining, None);
    }
}
