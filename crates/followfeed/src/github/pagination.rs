//! Link-header pagination over the following list and per-account events.
//!
//! Both walks follow the `rel="next"` URL verbatim. They differ in how they
//! stop:
//!
//! - The following list is walked exhaustively. It has no page cap, no
//!   early stop and no rate-limit pause.
//! - The event walk pauses on an exhausted quota, keeps only events accepted
//!   by the caller's predicate, and stops when the page counter reaches the
//!   page cap or a page keeps nothing. The page that triggers the stop does
//!   not contribute to the result.

use super::client::{GitHubClient, Page};
use super::error::Result;
use super::types::{Event, FollowedUser};
use crate::collect::{CollectProgress, ProgressCallback, emit};

/// Result of a paginated fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginatedFetchResult<T> {
    /// Accumulated items in page order.
    pub items: Vec<T>,
    /// Number of requests issued.
    pub pages_fetched: u32,
    /// Number of rate-limit pauses taken.
    pub rate_limit_waits: u32,
}

impl GitHubClient {
    /// Fetch the login of every account the authenticated user follows.
    pub async fn fetch_following(
        &self,
        on_progress: Option<&ProgressCallback>,
    ) -> Result<PaginatedFetchResult<String>> {
        let mut logins = Vec::new();
        let mut pages_fetched = 0u32;
        let mut url = Some(self.following_url());

        emit(on_progress, CollectProgress::FetchingFollowing);

        while let Some(current) = url {
            pages_fetched += 1;

            let response = self.fetch(&current).await?;
            let Page { items, links } = self.decode_page::<FollowedUser>(&current, &response)?;
            let count = items.len();
            logins.extend(items.into_iter().map(|u| u.login));

            emit(
                on_progress,
                CollectProgress::FetchedFollowingPage {
                    page: pages_fetched,
                    count,
                },
            );

            url = links.next;
        }

        Ok(PaginatedFetchResult {
            items: logins,
            pages_fetched,
            rate_limit_waits: 0,
        })
    }

    /// Fetch an account's recent events, newest first.
    ///
    /// `keep` decides which events of a page are retained; an error from it
    /// aborts the walk. `page_limit` of 0 behaves like 1.
    pub async fn fetch_recent_events<F>(
        &self,
        login: &str,
        page_limit: u32,
        keep: F,
        on_progress: Option<&ProgressCallback>,
    ) -> Result<PaginatedFetchResult<Event>>
    where
        F: Fn(&Event) -> Result<bool>,
    {
        let page_limit = page_limit.max(1);
        let mut events = Vec::new();
        let mut page = 0u32;
        let mut rate_limit_waits = 0u32;
        let mut url = Some(self.events_url(login));

        while let Some(current) = url {
            page += 1;

            let response = self.fetch(&current).await?;

            // The pause happens before the status check, so a failing
            // response still honours an exhausted quota.
            let paused = self
                .observe_rate_limit(&response, |wait| {
                    emit(
                        on_progress,
                        CollectProgress::RateLimitPause {
                            namespace: login.to_string(),
                            wait_secs: wait.as_secs(),
                        },
                    );
                })
                .await;
            if paused.is_some() {
                rate_limit_waits += 1;
            }

            let Page { items, links } = self.decode_page::<Event>(&current, &response)?;
            let count = items.len();

            let mut kept = Vec::with_capacity(count);
            for event in items {
                if keep(&event)? {
                    kept.push(event);
                }
            }

            emit(
                on_progress,
                CollectProgress::FetchedPage {
                    namespace: login.to_string(),
                    page,
                    count,
                    kept: kept.len(),
                },
            );

            if page >= page_limit || kept.is_empty() {
                tracing::debug!(
                    login,
                    page,
                    page_limit,
                    kept = kept.len(),
                    "Stopping event pagination"
                );
                break;
            }

            events.extend(kept);
            url = links.next;
        }

        Ok(PaginatedFetchResult {
            items: events,
            pages_fetched: page,
            rate_limit_waits,
        })
    }
}
