use std::sync::Mutex;
use std::time::Duration;

use followfeed::collect::CollectProgress;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use super::{found_message, processing_message};

/// Bars owned by the reporter, under a single lock.
#[derive(Default)]
struct ProgressState {
    /// Spinner shown while the following list is fetched.
    following_bar: Option<ProgressBar>,
    /// One tick per finished account.
    accounts_bar: Option<ProgressBar>,
}

/// Interactive progress reporter using indicatif.
pub struct InteractiveReporter {
    multi: MultiProgress,
    state: Mutex<ProgressState>,
}

impl InteractiveReporter {
    pub fn new() -> Self {
        Self::with_multi(MultiProgress::new())
    }

    /// Reporter that renders nothing.
    #[cfg(test)]
    pub fn hidden() -> Self {
        Self::with_multi(MultiProgress::with_draw_target(indicatif::ProgressDrawTarget::hidden()))
    }

    fn with_multi(multi: MultiProgress) -> Self {
        Self {
            multi,
            state: Mutex::new(ProgressState::default()),
        }
    }

    pub fn handle(&self, event: CollectProgress) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());

        match event {
            CollectProgress::FetchingFollowing => {
                let pb = self.multi.add(ProgressBar::new_spinner());
                pb.set_style(Self::spinner_style());
                pb.set_prefix(format!("{:12}", "Following"));
                pb.set_message("Fetching followed users...");
                pb.enable_steady_tick(Duration::from_millis(100));
                state.following_bar = Some(pb);
            }

            CollectProgress::FetchedFollowingPage { page, count } => {
                if let Some(ref pb) = state.following_bar {
                    pb.set_message(format!("Page {} ({} users)", page, count));
                }
            }

            CollectProgress::FetchedPage {
                namespace,
                page,
                count,
                kept,
            } => {
                if let Some(ref pb) = state.accounts_bar {
                    pb.set_message(format!("{}: page {} ({}/{} recent)", namespace, page, kept, count));
                }
            }

            CollectProgress::FollowingFetched { count } => {
                if let Some(pb) = state.following_bar.take() {
                    pb.finish_and_clear();
                }
                self.multi.println(found_message(count)).ok();

                let pb = self.multi.add(ProgressBar::new(count as u64));
                pb.set_style(Self::bar_style());
                pb.set_prefix(format!("{:12}", "Accounts"));
                state.accounts_bar = Some(pb);
            }

            CollectProgress::ProcessingAccount {
                index,
                total,
                login,
            } => {
                if let Some(ref pb) = state.accounts_bar {
                    pb.set_message(login.clone());
                }
                self.multi
                    .println(processing_message(index, total, &login))
                    .ok();
            }

            CollectProgress::RateLimitPause {
                namespace,
                wait_secs,
            } => {
                if let Some(ref pb) = state.accounts_bar {
                    pb.set_message(format!(
                        "⏳ {} rate limited, waiting {}s",
                        namespace, wait_secs
                    ));
                }
            }

            CollectProgress::AccountComplete { login, events, .. } => {
                if let Some(ref pb) = state.accounts_bar {
                    pb.inc(1);
                    pb.set_message(format!("✓ {} ({} events)", login, events));
                }
            }

            CollectProgress::CollectComplete { accounts, events } => {
                if let Some(ref pb) = state.accounts_bar {
                    pb.finish_with_message(format!("✓ {} accounts, {} events", accounts, events));
                }
            }

            _ => {}
        }
    }

    /// Finished and total accounts, once the following list is known.
    #[cfg(test)]
    pub fn accounts_done(&self) -> Option<(u64, u64)> {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state
            .accounts_bar
            .as_ref()
            .map(|pb| (pb.position(), pb.length().unwrap_or(0)))
    }

    /// Current message on the accounts bar.
    #[cfg(test)]
    pub fn accounts_message(&self) -> Option<String> {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.accounts_bar.as_ref().map(|pb| pb.message())
    }

    /// Finish all progress bars.
    pub fn finish(&self) {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(ref pb) = state.following_bar
            && !pb.is_finished()
        {
            pb.finish_and_clear();
        }
        if let Some(ref pb) = state.accounts_bar
            && !pb.is_finished()
        {
            pb.finish();
        }
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::default_spinner()
            .template("{prefix:.bold.cyan} {spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::default_bar()
            .template("{prefix:.bold.cyan} [{bar:40.cyan/blue}] {pos:>3}/{len:3} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░")
    }
}

impl Default for InteractiveReporter {
    fn default() -> Self {
        Self::new()
    }
}
