//! Following-list event collection.
//!
//! # Module Structure
//!
//! - [`progress`] - Progress events and callback plumbing
//! - [`types`] - Options, defaults and run statistics
//! - [`filter`] - Trailing time window over event timestamps
//! - [`dedupe`] - Order-preserving deduplication
//! - [`engine`] - Orchestration of a full collection run

mod dedupe;
mod engine;
mod filter;
mod progress;
mod types;

pub use dedupe::dedupe;
pub use engine::{CollectError, CollectResult, collect_account, collect_snapshot};
pub use filter::{EVENT_TIMESTAMP_FORMAT, TimeWindow, WindowError, parse_event_timestamp};
pub use progress::{CollectProgress, ProgressCallback, emit};
pub use types::{
    CollectOptions, CollectStats, DAYS_AGO, DEFAULT_CONCURRENCY, MAX_CONCURRENCY, MAX_DAYS,
    PAGE_LIMIT,
};
