//! Collection options, constants and run statistics.

/// Maximum event pages requested per account.
pub const PAGE_LIMIT: u32 = 10;

/// Trailing time window, in days.
pub const DAYS_AGO: i64 = 30;

/// Longest accepted time window, in days.
pub const MAX_DAYS: i64 = 36_500;

/// Accounts fetched at once. 1 keeps the run strictly sequential.
pub const DEFAULT_CONCURRENCY: usize = 1;

/// Most accounts fetched at once.
pub const MAX_CONCURRENCY: usize = 64;

/// Options for a collection run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectOptions {
    /// Keep events newer than this many days.
    pub days: i64,
    /// Event page cap per account.
    pub page_limit: u32,
    /// Accounts fetched concurrently.
    pub concurrency: usize,
}

impl Default for CollectOptions {
    fn default() -> Self {
        Self {
            days: DAYS_AGO,
            page_limit: PAGE_LIMIT,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

/// Counters for a finished run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectStats {
    pub accounts: usize,
    /// Requests issued across both walks.
    pub pages_fetched: u32,
    /// Events inside the window before deduplication.
    pub events_seen: usize,
    /// Unique (repo, type) pairs in the snapshot.
    pub events_kept: usize,
    pub rate_limit_waits: u32,
}

impl CollectStats {
    pub(crate) fn absorb(&mut self, other: &CollectStats) {
        self.accounts += other.accounts;
        self.pages_fetched += other.pages_fetched;
        self.events_seen += other.events_seen;
        self.events_kept += other.events_kept;
        self.rate_limit_waits += other.rate_limit_waits;
    }
}
