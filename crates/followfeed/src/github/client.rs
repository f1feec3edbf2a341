//! GitHub API client and response metadata parsing.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;

use super::error::{GitHubError, Result};
use crate::clock::{Clock, SystemClock};
use crate::http::{HttpRequest, HttpResponse, HttpTransport};
use crate::rate_limit::{RateLimitGate, RateLimitInfo};

/// Public GitHub REST API root.
pub const GITHUB_API_URL: &str = "https://api.github.com";

/// Page size requested from the events endpoint.
pub const EVENTS_PER_PAGE: u32 = 100;

const USER_AGENT: &str = "followfeed";
const ACCEPT: &str = "application/vnd.github+json";

/// Pagination links extracted from GitHub's Link header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkPagination {
    /// URL of the next page (rel="next").
    pub next: Option<String>,
}

/// Parse the Link header to extract the next-page link.
///
/// GitHub Link headers look like:
/// `<https://api.github.com/user/following?page=2>; rel="next", <...?page=5>; rel="last"`
pub fn parse_link_header(link_header: &str) -> LinkPagination {
    let mut info = LinkPagination::default();

    for part in link_header.split(',') {
        let part = part.trim();

        let mut url = None;
        let mut rel = None;

        for segment in part.split(';') {
            let segment = segment.trim();
            if segment.starts_with('<') && segment.ends_with('>') {
                url = Some(&segment[1..segment.len() - 1]);
            } else if let Some(rel_value) = segment.strip_prefix("rel=") {
                rel = Some(rel_value.trim_matches('"'));
            }
        }

        if let (Some(url), Some(rel_type)) = (url, rel) {
            // A rel may carry several space-separated relation types.
            if rel_type.split_whitespace().any(|rel| rel == "next") {
                info.next = Some(url.to_string());
            }
        }
    }

    info
}

/// One decoded page of a paginated endpoint.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub links: LinkPagination,
}

/// GitHub API client.
///
/// Cheap to clone: the transport, clock and rate-limit gate are shared.
#[derive(Clone)]
pub struct GitHubClient {
    transport: Arc<dyn HttpTransport>,
    /// Credential sent as `Authorization: token <credential>`.
    token: Arc<String>,
    api_url: Arc<String>,
    clock: Arc<dyn Clock>,
    gate: RateLimitGate,
}

impl GitHubClient {
    /// Create a client talking to the public API with the system clock.
    pub fn new(token: &str, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            transport,
            token: Arc::new(token.to_string()),
            api_url: Arc::new(GITHUB_API_URL.to_string()),
            clock: Arc::new(SystemClock),
            gate: RateLimitGate::new(),
        }
    }

    /// Use a different API root (e.g. GitHub Enterprise `https://host/api/v3`).
    #[must_use]
    pub fn with_api_url(mut self, api_url: &str) -> Self {
        self.api_url = Arc::new(api_url.trim_end_matches('/').to_string());
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn with_rate_limit_gate(mut self, gate: RateLimitGate) -> Self {
        self.gate = gate;
        self
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.clock)
    }

    /// First page of the authenticated user's following list.
    pub fn following_url(&self) -> String {
        format!("{}/user/following", self.api_url)
    }

    /// First page of an account's public events.
    pub fn events_url(&self, login: &str) -> String {
        format!(
            "{}/users/{}/events?per_page={}",
            self.api_url, login, EVENTS_PER_PAGE
        )
    }

    /// Issue an authenticated GET without interpreting the response.
    ///
    /// Waits on the shared rate-limit gate first.
    pub async fn fetch(&self, url: &str) -> Result<HttpResponse> {
        self.gate.ready().await;

        let request = HttpRequest::get(url)
            .header("Authorization", format!("token {}", self.token.as_str()))
            .header("Accept", ACCEPT)
            .header("User-Agent", USER_AGENT);

        tracing::debug!(url, "GET");
        let response = self.transport.send(request).await?;
        Ok(response)
    }

    /// Pause if the response reports an exhausted quota.
    ///
    /// `before_pause` receives the wait before the sleep starts.
    pub async fn observe_rate_limit<F>(
        &self,
        response: &HttpResponse,
        before_pause: F,
    ) -> Option<Duration>
    where
        F: FnOnce(Duration),
    {
        let now = self.clock.now();
        let info = RateLimitInfo::from_headers(&response.headers, now);
        let wait = self.gate.record(&info, now)?;

        before_pause(wait);
        self.gate.resume().await;

        Some(wait)
    }

    /// Check the status and decode a JSON array page.
    pub fn decode_page<T: DeserializeOwned>(
        &self,
        url: &str,
        response: &HttpResponse,
    ) -> Result<Page<T>> {
        if !response.is_success() {
            return Err(GitHubError::from_status(response.status, url));
        }

        let items: Vec<T> =
            serde_json::from_slice(&response.body).map_err(|source| GitHubError::Decode {
                url: url.to_string(),
                source,
            })?;

        let links = response
            .header("link")
            .map(parse_link_header)
            .unwrap_or_default();

        Ok(Page { items, links })
    }
}

#[cfg(test)]
mod tests {
    use chrono::DateTime;

    use super::*;
    use crate::clock::FixedClock;
    use crate::github::types::FollowedUser;
    use crate::http::MockTransport;

    fn response(status: u16, headers: &[(&str, &str)], body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: headers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            body: body.as_bytes().to_vec(),
        }
    }

    #[test]
    fn test_parse_link_header_full() {
        let header = r#"<https://api.github.com/user/following?page=2>; rel="next", <https://api.github.com/user/following?page=3>; rel="last""#;

        let info = parse_link_header(header);
        assert_eq!(
            info.next.as_deref(),
            Some("https://api.github.com/user/following?page=2")
        );
    }

    #[test]
    fn test_parse_link_header_multi_valued_rel() {
        let header = r#"<https://api.github.com/user/following?page=4>; rel="last next""#;
        assert_eq!(
            parse_link_header(header).next.as_deref(),
            Some("https://api.github.com/user/following?page=4")
        );
    }

    #[test]
    fn test_parse_link_header_only_prev_and_first() {
        let header = r#"<https://api.github.com/user/following?page=1>; rel="prev", <https://api.github.com/user/following?page=1>; rel="first""#;

        assert_eq!(parse_link_header(header), LinkPagination::default());
    }

    #[test]
    fn test_parse_link_header_keeps_query_string() {
        let header =
            r#"<https://api.github.com/user/42/events?per_page=100&page=2>; rel="next""#;
        let info = parse_link_header(header);
        assert_eq!(
            info.next.as_deref(),
            Some("https://api.github.com/user/42/events?per_page=100&page=2")
        );
    }

    #[test]
    fn test_parse_link_header_empty() {
        assert_eq!(parse_link_header(""), LinkPagination::default());
    }

    #[test]
    fn test_urls() {
        let client = GitHubClient::new("t", Arc::new(MockTransport::new()));
        assert_eq!(client.following_url(), "https://api.github.com/user/following");
        assert_eq!(
            client.events_url("octocat"),
            "https://api.github.com/users/octocat/events?per_page=100"
        );

        let enterprise = client.with_api_url("https://ghe.example.com/api/v3/");
        assert_eq!(
            enterprise.following_url(),
            "https://ghe.example.com/api/v3/user/following"
        );
    }

    #[tokio::test]
    async fn test_fetch_sends_token_header() {
        let transport = MockTransport::new();
        let url = "https://api.github.com/user/following";
        transport.push_response(url, response(200, &[], "[]"));

        let client = GitHubClient::new("s3cret", Arc::new(transport.clone()));
        client.fetch(url).await.unwrap();

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(
            crate::http::header_get(&requests[0].headers, "authorization"),
            Some("token s3cret")
        );
        assert_eq!(
            crate::http::header_get(&requests[0].headers, "user-agent"),
            Some("followfeed")
        );
    }

    #[test]
    fn test_decode_page_reads_items_and_next_link() {
        let client = GitHubClient::new("t", Arc::new(MockTransport::new()));
        let resp = response(
            200,
            &[(
                "Link",
                r#"<https://api.github.com/user/following?page=2>; rel="next""#,
            )],
            r#"[{"login": "alice"}, {"login": "bob"}]"#,
        );

        let page: Page<FollowedUser> = client
            .decode_page("https://api.github.com/user/following", &resp)
            .unwrap();
        let logins: Vec<_> = page.items.iter().map(|u| u.login.as_str()).collect();
        assert_eq!(logins, vec!["alice", "bob"]);
        assert_eq!(
            page.links.next.as_deref(),
            Some("https://api.github.com/user/following?page=2")
        );
    }

    #[test]
    fn test_decode_page_rejects_non_success() {
        let client = GitHubClient::new("t", Arc::new(MockTransport::new()));
        let resp = response(500, &[], "oops");
        let err = client
            .decode_page::<FollowedUser>("https://api.github.com/user/following", &resp)
            .unwrap_err();
        assert_eq!(err.status(), Some(500));
    }

    #[test]
    fn test_decode_page_reports_bad_json() {
        let client = GitHubClient::new("t", Arc::new(MockTransport::new()));
        let resp = response(200, &[], "{not json");
        let err = client
            .decode_page::<FollowedUser>("https://api.github.com/user/following", &resp)
            .unwrap_err();
        assert!(matches!(err, GitHubError::Decode { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_observe_rate_limit_reports_before_sleeping() {
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let client = GitHubClient::new("t", Arc::new(MockTransport::new()))
            .with_clock(Arc::new(FixedClock::new(now)));

        let resp = response(
            200,
            &[
                ("X-RateLimit-Remaining", "1"),
                ("X-RateLimit-Reset", "1700000005"),
            ],
            "[]",
        );
        let start = tokio::time::Instant::now();
        let mut reported = None;
        let waited = client
            .observe_rate_limit(&resp, |wait| reported = Some((wait, start.elapsed())))
            .await;

        assert_eq!(waited, Some(Duration::from_secs(15)));
        assert_eq!(reported, Some((Duration::from_secs(15), Duration::ZERO)));
        assert!(start.elapsed() >= Duration::from_secs(15));

        let plenty = response(
            200,
            &[
                ("X-RateLimit-Remaining", "4000"),
                ("X-RateLimit-Reset", "1700000005"),
            ],
            "[]",
        );
        let mut called = false;
        assert_eq!(
            client.observe_rate_limit(&plenty, |_| called = true).await,
            None
        );
        assert!(!called);
    }
}
