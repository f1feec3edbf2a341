//! Remote rate-limit handling.
//!
//! GitHub reports the remaining request quota and the reset instant on every
//! response. When the quota is (almost) exhausted the caller pauses until the
//! reset instant plus a fixed safety margin before issuing the next request.
//!
//! Two mechanisms live here:
//!
//! - [`RateLimitGate`] - the quota-driven pause. Shared between concurrent
//!   account fetches so that one exhausted response holds back every task.
//! - [`ApiRateLimiter`] - optional proactive pacing (requests per second)
//!   using the governor crate.

use std::num::NonZeroU32;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use tokio::time::Instant;

use crate::http::{HttpHeaders, header_get};

/// Pause when the remaining quota is at or below this value.
pub const RATE_LIMIT_THRESHOLD: u64 = 1;

/// Extra seconds waited past the advertised reset to absorb clock skew.
pub const RESET_MARGIN_SECS: i64 = 10;

/// Assumed reset delay when the response carries no reset header.
pub const DEFAULT_RESET_DELAY_SECS: i64 = 60;

pub const REMAINING_HEADER: &str = "x-ratelimit-remaining";
pub const RESET_HEADER: &str = "x-ratelimit-reset";

/// Rate limit state derived from a single response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitInfo {
    /// Requests remaining in the current window.
    pub remaining: u64,
    /// When the window resets.
    pub reset_at: DateTime<Utc>,
}

impl RateLimitInfo {
    /// Extract rate limit info from response headers.
    ///
    /// A missing or malformed remaining count reads as 0, which always
    /// triggers a pause. A missing or malformed reset reads as
    /// `now + DEFAULT_RESET_DELAY_SECS`.
    pub fn from_headers(headers: &HttpHeaders, now: DateTime<Utc>) -> Self {
        let remaining = header_get(headers, REMAINING_HEADER)
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(0);

        let reset_at = header_get(headers, RESET_HEADER)
            .and_then(|v| v.trim().parse::<i64>().ok())
            .and_then(|epoch| DateTime::from_timestamp(epoch, 0))
            .unwrap_or_else(|| now + chrono::Duration::seconds(DEFAULT_RESET_DELAY_SECS));

        Self {
            remaining,
            reset_at,
        }
    }

    /// Whether the next request must wait for the window to reset.
    #[inline]
    pub fn is_exhausted(&self) -> bool {
        self.remaining <= RATE_LIMIT_THRESHOLD
    }
}

/// How long to pause before the next request, if at all.
///
/// `max(reset_at - now, 0) + RESET_MARGIN_SECS` when the quota is exhausted.
pub fn wait_duration(info: &RateLimitInfo, now: DateTime<Utc>) -> Option<Duration> {
    if !info.is_exhausted() {
        return None;
    }

    let until_reset = (info.reset_at - now)
        .to_std()
        .unwrap_or(Duration::ZERO);

    Some(until_reset + Duration::from_secs(RESET_MARGIN_SECS as u64))
}

/// Shared quota-driven pause point.
///
/// [`RateLimitGate::record`] notes an exhausted quota without blocking, so the
/// caller can report the pause before it starts. [`RateLimitGate::resume`]
/// then sleeps until the latest resume instant recorded by any clone, and
/// [`RateLimitGate::ready`] does the same before every request.
#[derive(Clone, Default)]
pub struct RateLimitGate {
    resume_at: Arc<Mutex<Option<Instant>>>,
    pacer: Option<ApiRateLimiter>,
}

impl RateLimitGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also pace requests to at most `requests_per_second`.
    #[must_use]
    pub fn with_pacing(mut self, limiter: ApiRateLimiter) -> Self {
        self.pacer = Some(limiter);
        self
    }

    /// Wait until a request may be issued.
    pub async fn ready(&self) {
        if let Some(pacer) = &self.pacer {
            pacer.wait().await;
        }
        self.resume().await;
    }

    /// Sleep until the recorded resume instant, if it is still ahead.
    pub async fn resume(&self) {
        let resume_at = *self.resume_at.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(at) = resume_at
            && at > Instant::now()
        {
            tokio::time::sleep_until(at).await;
        }
    }

    /// Record a pause if the response's quota is exhausted.
    ///
    /// Returns the computed wait without sleeping. The resume instant only
    /// ever moves later.
    pub fn record(&self, info: &RateLimitInfo, now: DateTime<Utc>) -> Option<Duration> {
        let wait = wait_duration(info, now)?;

        let target = Instant::now() + wait;
        {
            let mut guard = self.resume_at.lock().unwrap_or_else(|e| e.into_inner());
            if guard.is_none_or(|existing| existing < target) {
                *guard = Some(target);
            }
        }

        tracing::warn!(
            remaining = info.remaining,
            reset_at = %info.reset_at,
            wait_secs = wait.as_secs_f64(),
            "Rate limit nearly exhausted, pausing"
        );

        Some(wait)
    }
}

/// Type alias for the governor rate limiter.
type GovernorRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// A standalone request pacer using the governor crate.
///
/// ```ignore
/// use followfeed::rate_limit::ApiRateLimiter;
///
/// let limiter = ApiRateLimiter::new(10); // 10 requests per second
/// limiter.wait().await;
/// ```
#[derive(Clone)]
pub struct ApiRateLimiter {
    inner: Arc<GovernorRateLimiter>,
}

impl ApiRateLimiter {
    /// Create a pacer allowing `requests_per_second` (0 is treated as 1).
    pub fn new(requests_per_second: u32) -> Self {
        let rps = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
        let rate_limiter = RateLimiter::direct(Quota::per_second(rps));

        Self {
            inner: Arc::new(rate_limiter),
        }
    }

    /// Wait until a request is allowed.
    pub async fn wait(&self) {
        self.inner.until_ready().await;
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant as StdInstant;

    use super::*;

    fn at(epoch: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(epoch, 0).unwrap()
    }

    fn headers(pairs: &[(&str, &str)]) -> HttpHeaders {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_wait_until_reset_plus_margin() {
        let now = at(1_700_000_000);
        let info = RateLimitInfo {
            remaining: 1,
            reset_at: now + chrono::Duration::seconds(5),
        };
        assert_eq!(wait_duration(&info, now), Some(Duration::from_secs(15)));
    }

    #[test]
    fn test_wait_clamps_past_reset_to_margin() {
        let now = at(1_700_000_000);
        let info = RateLimitInfo {
            remaining: 1,
            reset_at: now - chrono::Duration::seconds(100),
        };
        assert_eq!(wait_duration(&info, now), Some(Duration::from_secs(10)));
    }

    #[test]
    fn test_no_wait_above_threshold() {
        let now = at(1_700_000_000);
        let info = RateLimitInfo {
            remaining: 2,
            reset_at: now + chrono::Duration::seconds(3600),
        };
        assert_eq!(wait_duration(&info, now), None);
    }

    #[test]
    fn test_zero_remaining_waits() {
        let now = at(1_700_000_000);
        let info = RateLimitInfo {
            remaining: 0,
            reset_at: now + chrono::Duration::seconds(30),
        };
        assert_eq!(wait_duration(&info, now), Some(Duration::from_secs(40)));
    }

    #[test]
    fn test_from_headers_parses_values() {
        let now = at(1_700_000_000);
        let info = RateLimitInfo::from_headers(
            &headers(&[
                ("X-RateLimit-Remaining", "4321"),
                ("X-RateLimit-Reset", "1700000300"),
            ]),
            now,
        );
        assert_eq!(info.remaining, 4321);
        assert_eq!(info.reset_at, at(1_700_000_300));
        assert!(!info.is_exhausted());
    }

    #[test]
    fn test_from_headers_missing_values_use_defaults() {
        let now = at(1_700_000_000);
        let info = RateLimitInfo::from_headers(&Vec::new(), now);
        assert_eq!(info.remaining, 0);
        assert_eq!(info.reset_at, at(1_700_000_060));
        assert!(info.is_exhausted());
        assert_eq!(wait_duration(&info, now), Some(Duration::from_secs(70)));
    }

    #[test]
    fn test_from_headers_malformed_values_use_defaults() {
        let now = at(1_700_000_000);
        let info = RateLimitInfo::from_headers(
            &headers(&[
                ("x-ratelimit-remaining", "lots"),
                ("x-ratelimit-reset", "soon"),
            ]),
            now,
        );
        assert_eq!(info.remaining, 0);
        assert_eq!(info.reset_at, at(1_700_000_060));
    }

    #[tokio::test(start_paused = true)]
    async fn test_gate_record_returns_before_resume_sleeps() {
        let now = at(1_700_000_000);
        let gate = RateLimitGate::new();
        let info = RateLimitInfo {
            remaining: 1,
            reset_at: now + chrono::Duration::seconds(5),
        };

        let start = Instant::now();
        assert_eq!(gate.record(&info, now), Some(Duration::from_secs(15)));
        assert_eq!(start.elapsed(), Duration::ZERO);

        gate.resume().await;
        assert!(start.elapsed() >= Duration::from_secs(15));
    }

    #[tokio::test(start_paused = true)]
    async fn test_gate_record_ignores_quota_left() {
        let now = at(1_700_000_000);
        let gate = RateLimitGate::new();
        let info = RateLimitInfo {
            remaining: 100,
            reset_at: now,
        };

        let start = Instant::now();
        assert_eq!(gate.record(&info, now), None);
        gate.ready().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gate_keeps_latest_resume_instant() {
        let now = at(1_700_000_000);
        let gate = RateLimitGate::new();
        let long = RateLimitInfo {
            remaining: 0,
            reset_at: now + chrono::Duration::seconds(20),
        };
        let short = RateLimitInfo {
            remaining: 0,
            reset_at: now,
        };

        let start = Instant::now();
        assert_eq!(gate.record(&long, now), Some(Duration::from_secs(30)));
        assert_eq!(gate.record(&short, now), Some(Duration::from_secs(10)));

        gate.clone().ready().await;
        assert!(start.elapsed() >= Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_gate_ready_without_pause_is_immediate() {
        let gate = RateLimitGate::new().with_pacing(ApiRateLimiter::new(100));
        let start = StdInstant::now();
        gate.ready().await;
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_api_rate_limiter_wait_allows_first_request() {
        let limiter = ApiRateLimiter::new(100);
        let _zero = ApiRateLimiter::new(0).clone();
        let start = StdInstant::now();
        limiter.wait().await;
        assert!(start.elapsed() < Duration::from_millis(50));
    }
}
