//! GitHub REST API access.
//!
//! # Module Structure
//!
//! - [`error`] - Error types for GitHub API operations
//! - [`types`] - Response payloads (`FollowedUser`, `Event`)
//! - [`client`] - Authenticated client and Link header parsing
//! - [`pagination`] - Following-list and event pagination walks
//!
//! ```ignore
//! use std::sync::Arc;
//! use followfeed::github::GitHubClient;
//! use followfeed::http::ReqwestTransport;
//!
//! let transport = ReqwestTransport::with_timeout(Duration::from_secs(30))?;
//! let client = GitHubClient::new(&token, Arc::new(transport));
//! let following = client.fetch_following(None).await?;
//! ```

mod client;
mod error;
mod pagination;
mod types;

pub use client::{
    EVENTS_PER_PAGE, GITHUB_API_URL, GitHubClient, LinkPagination, Page, parse_link_header,
};
pub use error::{GitHubError, Result};
pub use pagination::PaginatedFetchResult;
pub use types::{Event, EventRepo, FollowedUser};
