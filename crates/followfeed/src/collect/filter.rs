//! Trailing time window over event timestamps.

use std::sync::Arc;

use chrono::{DateTime, NaiveDateTime, TimeDelta, Utc};
use thiserror::Error;

use super::types::MAX_DAYS;
use crate::clock::Clock;
use crate::github::{Event, GitHubError};

/// Timestamp format used by the events API.
pub const EVENT_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Rejected window lengths.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WindowError {
    #[error("Window of {days} days is outside 1..={max} days")]
    OutOfRange { days: i64, max: i64 },
}

/// Parse an event `created_at` value as UTC.
pub fn parse_event_timestamp(value: &str) -> Result<DateTime<Utc>, GitHubError> {
    NaiveDateTime::parse_from_str(value, EVENT_TIMESTAMP_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|source| GitHubError::Timestamp {
            value: value.to_string(),
            source,
        })
}

/// Trailing window of `days` ending at the clock's current time.
///
/// The clock is read on every check, so the cutoff follows wall-clock time
/// during a long run.
#[derive(Clone)]
pub struct TimeWindow {
    span: TimeDelta,
    clock: Arc<dyn Clock>,
}

impl TimeWindow {
    /// Window of `days` in `1..=MAX_DAYS`.
    pub fn new(days: i64, clock: Arc<dyn Clock>) -> Result<Self, WindowError> {
        let span = TimeDelta::try_days(days)
            .filter(|_| (1..=MAX_DAYS).contains(&days))
            .ok_or(WindowError::OutOfRange {
                days,
                max: MAX_DAYS,
            })?;

        Ok(Self { span, clock })
    }

    /// Oldest timestamp still inside the window.
    ///
    /// Saturates at the earliest representable instant.
    pub fn cutoff(&self) -> DateTime<Utc> {
        self.clock
            .now()
            .checked_sub_signed(self.span)
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Whether `created_at` is at or after the cutoff.
    pub fn contains(&self, created_at: &str) -> Result<bool, GitHubError> {
        let created = parse_event_timestamp(created_at)?;
        Ok(created >= self.cutoff())
    }

    pub fn keeps(&self, event: &Event) -> Result<bool, GitHubError> {
        self.contains(&event.created_at)
    }
}
