//! Progress events emitted while collecting.

/// Progress events emitted during a collection run.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CollectProgress {
    /// Starting to walk the following list.
    FetchingFollowing,

    /// Following list fetched.
    FollowingFetched {
        /// Number of followed accounts.
        count: usize,
    },

    /// Fetched a page of the following list.
    FetchedFollowingPage {
        /// Page number (1-indexed).
        page: u32,
        /// Accounts on the page.
        count: usize,
    },

    /// Fetched a page of an account's events.
    FetchedPage {
        /// Account login.
        namespace: String,
        /// Page number (1-indexed).
        page: u32,
        /// Items on the page.
        count: usize,
        /// Items that passed the time window.
        kept: usize,
    },

    /// Paused because the remote quota is exhausted.
    RateLimitPause {
        /// Account whose fetch hit the limit.
        namespace: String,
        /// Seconds about to be paused.
        wait_secs: u64,
    },

    /// Starting an account.
    ProcessingAccount {
        /// 1-indexed position in the following list.
        index: usize,
        /// Number of accounts.
        total: usize,
        /// Account login.
        login: String,
    },

    /// Account finished.
    AccountComplete {
        /// Account login.
        login: String,
        /// Unique (repo, type) pairs kept.
        events: usize,
        /// Event pages requested.
        pages: u32,
    },

    /// All accounts finished.
    CollectComplete {
        /// Number of accounts in the snapshot.
        accounts: usize,
        /// Unique (repo, type) pairs across all accounts.
        events: usize,
    },
}

/// Callback for progress updates.
pub type ProgressCallback = Box<dyn Fn(CollectProgress) + Send + Sync>;

/// Emit a progress event if a callback is provided.
#[inline]
pub fn emit(on_progress: Option<&ProgressCallback>, event: CollectProgress) {
    if let Some(cb) = on_progress {
        cb(event);
    }
}
