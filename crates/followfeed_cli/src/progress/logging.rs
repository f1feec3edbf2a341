use followfeed::collect::CollectProgress;

use super::{found_message, processing_message};

/// Logging reporter using tracing for structured output.
pub struct LoggingReporter;

impl LoggingReporter {
    pub fn new() -> Self {
        Self
    }

    pub fn handle(&self, event: CollectProgress) {
        match event {
            CollectProgress::FetchingFollowing => {
                tracing::debug!("Fetching following list");
            }

            CollectProgress::FollowingFetched { count } => {
                tracing::info!(count, "{}", found_message(count));
            }

            CollectProgress::FetchedFollowingPage { page, count } => {
                tracing::debug!(page, count, "Fetched following page");
            }

            CollectProgress::FetchedPage {
                namespace,
                page,
                count,
                kept,
            } => {
                tracing::debug!(login = %namespace, page, count, kept, "Fetched events page");
            }

            CollectProgress::RateLimitPause {
                namespace,
                wait_secs,
            } => {
                tracing::warn!(namespace = %namespace, wait_secs, "Rate limit exhausted, pausing");
            }

            CollectProgress::ProcessingAccount {
                index,
                total,
                login,
            } => {
                tracing::info!(
                    index,
                    total,
                    login = %login,
                    "{}",
                    processing_message(index, total, &login)
                );
            }

            CollectProgress::AccountComplete {
                login,
                events,
                pages,
            } => {
                tracing::debug!(login = %login, events, pages, "Account complete");
            }

            CollectProgress::CollectComplete { accounts, events } => {
                tracing::info!(accounts, events, "Collection complete");
            }

            _ => {}
        }
    }
}

impl Default for LoggingReporter {
    fn default() -> Self {
        Self::new()
    }
}
