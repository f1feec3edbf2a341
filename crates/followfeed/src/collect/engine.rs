//! Collection engine.
//!
//! Walks the following list, then each followed account's recent events, and
//! assembles the ordered [`Snapshot`]. Any failure aborts the run; nothing is
//! returned for a partially collected snapshot.
//!
//! # Concurrency
//!
//! With `concurrency == 1` accounts are processed strictly in order. Larger
//! values spawn one task per account behind a semaphore. Every task shares
//! the client's rate-limit gate, so a pause observed by one task holds back
//! the others. Results are awaited in discovery order, so the snapshot layout
//! does not depend on completion order.
//!
//! ```ignore
//! use followfeed::collect::{CollectOptions, collect_snapshot};
//!
//! let result = collect_snapshot(&client, &CollectOptions::default(), Some(&progress)).await?;
//! followfeed::snapshot::write_snapshot("events.json", &result.snapshot)?;
//! ```

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Semaphore;

use super::dedupe::dedupe;
use super::filter::{TimeWindow, WindowError};
use super::progress::{CollectProgress, ProgressCallback, emit};
use super::types::{CollectOptions, CollectStats};
use crate::github::{GitHubClient, GitHubError};
use crate::snapshot::{AccountEvents, ProjectedEvent, Snapshot};

/// Errors that abort a collection run.
#[derive(Debug, Error)]
pub enum CollectError {
    #[error("Failed to fetch following list: {0}")]
    Following(#[source] GitHubError),

    #[error("Failed to fetch events for {login}: {source}")]
    Account {
        login: String,
        #[source]
        source: GitHubError,
    },

    #[error("Collection task failed: {0}")]
    Task(String),

    #[error(transparent)]
    Window(#[from] WindowError),
}

impl CollectError {
    /// Login of the account that failed, if any.
    pub fn login(&self) -> Option<&str> {
        match self {
            Self::Account { login, .. } => Some(login),
            _ => None,
        }
    }
}

/// Snapshot plus run counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectResult {
    pub snapshot: Snapshot,
    pub stats: CollectStats,
}

/// Collect one account's unique in-window `(repo, type)` pairs.
pub async fn collect_account(
    client: &GitHubClient,
    login: &str,
    window: &TimeWindow,
    page_limit: u32,
    on_progress: Option<&ProgressCallback>,
) -> Result<(AccountEvents, CollectStats), GitHubError> {
    let fetched = client
        .fetch_recent_events(login, page_limit, |event| window.keeps(event), on_progress)
        .await?;

    let events_seen = fetched.items.len();
    let events = dedupe(fetched.items.into_iter().map(ProjectedEvent::from));

    tracing::info!(
        login,
        pages = fetched.pages_fetched,
        seen = events_seen,
        unique = events.len(),
        "Collected events"
    );

    let stats = CollectStats {
        accounts: 1,
        pages_fetched: fetched.pages_fetched,
        events_seen,
        events_kept: events.len(),
        rate_limit_waits: fetched.rate_limit_waits,
    };

    Ok((AccountEvents::new(login, events), stats))
}

/// Collect a snapshot for every account the authenticated user follows.
pub async fn collect_snapshot(
    client: &GitHubClient,
    options: &CollectOptions,
    on_progress: Option<&ProgressCallback>,
) -> Result<CollectResult, CollectError> {
    let window = TimeWindow::new(options.days, client.clock())?;

    let following = client
        .fetch_following(on_progress)
        .await
        .map_err(CollectError::Following)?;

    let logins = following.items;
    let mut stats = CollectStats {
        pages_fetched: following.pages_fetched,
        ..CollectStats::default()
    };

    tracing::info!(count = logins.len(), "Fetched following list");
    emit(
        on_progress,
        CollectProgress::FollowingFetched {
            count: logins.len(),
        },
    );

    let accounts = if options.concurrency <= 1 {
        collect_sequential(client, &logins, &window, options, &mut stats, on_progress).await?
    } else {
        collect_concurrent(client, &logins, &window, options, &mut stats, on_progress).await?
    };

    let snapshot = Snapshot::new(accounts);

    emit(
        on_progress,
        CollectProgress::CollectComplete {
            accounts: snapshot.len(),
            events: snapshot.event_count(),
        },
    );

    Ok(CollectResult { snapshot, stats })
}

async fn collect_sequential(
    client: &GitHubClient,
    logins: &[String],
    window: &TimeWindow,
    options: &CollectOptions,
    stats: &mut CollectStats,
    on_progress: Option<&ProgressCallback>,
) -> Result<Vec<AccountEvents>, CollectError> {
    let total = logins.len();
    let mut accounts = Vec::with_capacity(total);

    for (i, login) in logins.iter().enumerate() {
        emit(
            on_progress,
            CollectProgress::ProcessingAccount {
                index: i + 1,
                total,
                login: login.clone(),
            },
        );

        let (account, account_stats) =
            collect_account(client, login, window, options.page_limit, on_progress)
                .await
                .map_err(|source| CollectError::Account {
                    login: login.clone(),
                    source,
                })?;

        stats.absorb(&account_stats);
        emit(
            on_progress,
            CollectProgress::AccountComplete {
                login: login.clone(),
                events: account.events.len(),
                pages: account_stats.pages_fetched,
            },
        );
        accounts.push(account);
    }

    Ok(accounts)
}

async fn collect_concurrent(
    client: &GitHubClient,
    logins: &[String],
    window: &TimeWindow,
    options: &CollectOptions,
    stats: &mut CollectStats,
    on_progress: Option<&ProgressCallback>,
) -> Result<Vec<AccountEvents>, CollectError> {
    let total = logins.len();
    let permits = options.concurrency.clamp(1, Semaphore::MAX_PERMITS);
    let semaphore = Arc::new(Semaphore::new(permits));
    let mut handles = Vec::with_capacity(total);

    for login in logins {
        let login = login.clone();
        let client = client.clone();
        let window = window.clone();
        let page_limit = options.page_limit;
        let semaphore = Arc::clone(&semaphore);

        // Progress callbacks are borrowed, so spawned tasks run without one.
        let handle = tokio::spawn(async move {
            let _permit = semaphore
                .acquire()
                .await
                .map_err(|_| CollectError::Task("Semaphore closed unexpectedly".to_string()))?;

            collect_account(&client, &login, &window, page_limit, None)
                .await
                .map_err(|source| CollectError::Account { login, source })
        });

        handles.push(handle);
    }

    let mut accounts = Vec::with_capacity(total);
    let mut pending = handles.into_iter();
    let mut index = 0;

    while let Some(handle) = pending.next() {
        index += 1;
        let outcome = match handle.await {
            Ok(result) => result,
            Err(e) => Err(CollectError::Task(format!("Task panic: {}", e))),
        };

        let (account, account_stats) = match outcome {
            Ok(done) => done,
            Err(e) => {
                for rest in pending.by_ref() {
                    rest.abort();
                }
                return Err(e);
            }
        };

        emit(
            on_progress,
            CollectProgress::ProcessingAccount {
                index,
                total,
                login: account.login.clone(),
            },
        );
        stats.absorb(&account_stats);
        emit(
            on_progress,
            CollectProgress::AccountComplete {
                login: account.login.clone(),
                events: account.events.len(),
                pages: account_stats.pages_fetched,
            },
        );
        accounts.push(account);
    }

    Ok(accounts)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use chrono::{DateTime, Duration, Utc};

    use super::*;
    use crate::clock::FixedClock;
    use crate::http::{HttpResponse, MockTransport};

    const API: &str = "https://api.github.com";
    const NOW: i64 = 1_700_000_000;

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(NOW, 0).unwrap()
    }

    fn ts(days_ago: i64) -> String {
        (now() - Duration::days(days_ago))
            .format("%Y-%m-%dT%H:%M:%SZ")
            .to_string()
    }

    fn json_response(body: String) -> HttpResponse {
        HttpResponse {
            status: 200,
            headers: vec![
                ("X-RateLimit-Remaining".to_string(), "4999".to_string()),
                ("X-RateLimit-Reset".to_string(), (NOW + 3600).to_string()),
            ],
            body: body.into_bytes(),
        }
    }

    fn events_body(events: &[(&str, &str, i64)]) -> String {
        let items: Vec<String> = events
            .iter()
            .map(|(repo, kind, days_ago)| {
                format!(
                    r#"{{"created_at":"{}","type":"{}","repo":{{"name":"{}"}}}}"#,
                    ts(*days_ago),
                    kind,
                    repo
                )
            })
            .collect();
        format!("[{}]", items.join(","))
    }

    fn client_with(mock: &Arc<MockTransport>) -> GitHubClient {
        GitHubClient::new("token", mock.clone())
            .with_clock(Arc::new(FixedClock::new(now())))
    }

    fn events_url(login: &str) -> String {
        format!("{API}/users/{login}/events?per_page=100")
    }

    fn script_alice_bob(mock: &MockTransport) {
        mock.push_response(
            format!("{API}/user/following"),
            json_response(r#"[{"login":"alice"},{"login":"bob"}]"#.to_string()),
        );
        mock.push_response(
            events_url("alice"),
            json_response(events_body(&[
                ("r1", "PushEvent", 1),
                ("r1", "PushEvent", 2),
                ("r2", "IssuesEvent", 3),
                ("r3", "PushEvent", 40),
            ])),
        );
        mock.push_response(events_url("bob"), json_response("[]".to_string()));
    }

    fn expected_alice_bob() -> Snapshot {
        Snapshot::new(vec![
            AccountEvents::new(
                "alice",
                vec![
                    ProjectedEvent::new("r1", "PushEvent"),
                    ProjectedEvent::new("r2", "IssuesEvent"),
                ],
            ),
            AccountEvents::new("bob", Vec::new()),
        ])
    }

    #[tokio::test(start_paused = true)]
    async fn test_collect_snapshot_sequential() {
        let mock = Arc::new(MockTransport::new());
        script_alice_bob(&mock);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let callback: ProgressCallback = Box::new(move |event| {
            sink.lock().unwrap().push(event);
        });

        let result = collect_snapshot(&client_with(&mock), &CollectOptions::default(), Some(&callback))
            .await
            .unwrap();

        assert_eq!(result.snapshot, expected_alice_bob());
        assert_eq!(
            result.stats,
            CollectStats {
                accounts: 2,
                pages_fetched: 3,
                events_seen: 3,
                events_kept: 2,
                rate_limit_waits: 0,
            }
        );

        let seen = seen.lock().unwrap();
        assert!(seen.contains(&CollectProgress::FollowingFetched { count: 2 }));
        let processing: Vec<_> = seen
            .iter()
            .filter_map(|e| match e {
                CollectProgress::ProcessingAccount { index, total, login } => {
                    Some((*index, *total, login.clone()))
                }
                _ => None,
            })
            .collect();
        assert_eq!(
            processing,
            vec![(1, 2, "alice".to_string()), (2, 2, "bob".to_string())]
        );
        assert_eq!(
            seen.last(),
            Some(&CollectProgress::CollectComplete {
                accounts: 2,
                events: 2
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_collect_snapshot_concurrent_preserves_order() {
        let mock = Arc::new(MockTransport::new());
        script_alice_bob(&mock);

        let options = CollectOptions {
            concurrency: 4,
            ..CollectOptions::default()
        };
        let result = collect_snapshot(&client_with(&mock), &options, None)
            .await
            .unwrap();

        assert_eq!(result.snapshot, expected_alice_bob());
        assert_eq!(result.stats.accounts, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_following_list() {
        let mock = Arc::new(MockTransport::new());
        mock.push_response(format!("{API}/user/following"), json_response("[]".to_string()));

        let result = collect_snapshot(&client_with(&mock), &CollectOptions::default(), None)
            .await
            .unwrap();

        assert!(result.snapshot.is_empty());
        assert_eq!(mock.request_urls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_following_failure_is_fatal() {
        let mock = Arc::new(MockTransport::new());
        mock.push_response(
            format!("{API}/user/following"),
            HttpResponse {
                status: 500,
                headers: Vec::new(),
                body: Vec::new(),
            },
        );

        let err = collect_snapshot(&client_with(&mock), &CollectOptions::default(), None)
            .await
            .unwrap_err();

        assert!(matches!(err, CollectError::Following(_)));
        assert_eq!(err.login(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_account_failure_aborts_run() {
        let mock = Arc::new(MockTransport::new());
        mock.push_response(
            format!("{API}/user/following"),
            json_response(r#"[{"login":"alice"},{"login":"bob"}]"#.to_string()),
        );
        mock.push_response(
            events_url("alice"),
            HttpResponse {
                status: 404,
                headers: Vec::new(),
                body: Vec::new(),
            },
        );

        let err = collect_snapshot(&client_with(&mock), &CollectOptions::default(), None)
            .await
            .unwrap_err();

        assert_eq!(err.login(), Some("alice"));
        assert!(matches!(
            err,
            CollectError::Account {
                source: GitHubError::Status { status: 404, .. },
                ..
            }
        ));
        // bob is never requested
        assert!(!mock.request_urls().contains(&events_url("bob")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_account_failure_is_reported() {
        let mock = Arc::new(MockTransport::new());
        mock.push_response(
            format!("{API}/user/following"),
            json_response(r#"[{"login":"alice"},{"login":"bob"}]"#.to_string()),
        );
        mock.push_response(events_url("alice"), json_response("[]".to_string()));
        mock.push_response(
            events_url("bob"),
            HttpResponse {
                status: 502,
                headers: Vec::new(),
                body: Vec::new(),
            },
        );

        let options = CollectOptions {
            concurrency: 2,
            ..CollectOptions::default()
        };
        let err = collect_snapshot(&client_with(&mock), &options, None)
            .await
            .unwrap_err();

        assert_eq!(err.login(), Some("bob"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_collect_account_respects_window_days() {
        let mock = Arc::new(MockTransport::new());
        mock.push_response(
            events_url("carol"),
            json_response(events_body(&[("a", "PushEvent", 1), ("b", "PushEvent", 5)])),
        );

        let client = client_with(&mock);
        let window = TimeWindow::new(2, client.clock()).unwrap();
        let (account, stats) = collect_account(&client, "carol", &window, 10, None)
            .await
            .unwrap();

        assert_eq!(account.events, vec![ProjectedEvent::new("a", "PushEvent")]);
        assert_eq!(stats.pages_fetched, 1);
        assert_eq!(stats.events_seen, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_out_of_range_window_fails_before_any_request() {
        let mock = Arc::new(MockTransport::new());
        script_alice_bob(&mock);

        for days in [0, -30, crate::collect::MAX_DAYS + 1, 100_000_000] {
            let options = CollectOptions {
                days,
                ..CollectOptions::default()
            };
            let err = collect_snapshot(&client_with(&mock), &options, None)
                .await
                .unwrap_err();
            assert!(matches!(err, CollectError::Window(_)), "{days}");
        }
        assert!(mock.request_urls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_oversized_concurrency_is_clamped() {
        let mock = Arc::new(MockTransport::new());
        script_alice_bob(&mock);

        let options = CollectOptions {
            concurrency: usize::MAX,
            ..CollectOptions::default()
        };
        let result = collect_snapshot(&client_with(&mock), &options, None)
            .await
            .unwrap();

        assert_eq!(result.snapshot, expected_alice_bob());
    }
}
