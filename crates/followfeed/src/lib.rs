//! Followfeed - recent activity of the accounts you follow on GitHub.
//!
//! The library walks the authenticated user's following list, fetches each
//! account's recent public events inside a trailing time window, reduces them
//! to unique `(repository, action type)` pairs and produces an ordered
//! [`Snapshot`] that can be written as JSON.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use followfeed::{CollectOptions, GitHubClient, ReqwestTransport, collect_snapshot, write_snapshot};
//!
//! let transport = ReqwestTransport::with_timeout(Duration::from_secs(30))?;
//! let client = GitHubClient::new(&token, Arc::new(transport));
//!
//! let result = collect_snapshot(&client, &CollectOptions::default(), None).await?;
//! write_snapshot("events.json", &result.snapshot)?;
//! ```

pub mod clock;
pub mod collect;
pub mod github;
pub mod http;
pub mod rate_limit;
pub mod snapshot;

pub use clock::{Clock, SystemClock};
pub use collect::{
    CollectError, CollectOptions, CollectProgress, CollectResult, CollectStats, DAYS_AGO,
    PAGE_LIMIT, ProgressCallback, collect_snapshot,
};
pub use github::{GitHubClient, GitHubError};
pub use http::{HttpError, HttpTransport, ReqwestTransport};
pub use rate_limit::{ApiRateLimiter, RateLimitGate, RateLimitInfo};
pub use snapshot::{AccountEvents, ProjectedEvent, Snapshot, SnapshotError, write_snapshot};
