//! Listing parameters for the time-windowed pickup point query.
//!
//! Raw caller input (query-string values) is normalized here, never rejected
//! for being malformed: bad pagination falls back to the defaults and a bad
//! time bound falls back to the trailing 24-hour window ending now.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use pvz_core::{DomainError, DomainResult};

pub const DEFAULT_LIMIT: u32 = 10;
pub const DEFAULT_WINDOW_HOURS: i64 = 24;

/// Pagination parameters for listing queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    /// Maximum number of points to return (>= 1).
    pub limit: u32,
    /// Number of matching points to skip.
    pub offset: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

impl Pagination {
    /// Out-of-range values fall back to the defaults (limit 10, offset 0).
    pub fn new(limit: Option<i64>, offset: Option<i64>) -> Self {
        let limit = limit
            .filter(|l| *l >= 1)
            .and_then(|l| u32::try_from(l).ok())
            .unwrap_or(DEFAULT_LIMIT);
        let offset = offset
            .filter(|o| *o >= 0)
            .and_then(|o| u32::try_from(o).ok())
            .unwrap_or(0);
        Self { limit, offset }
    }

    /// Same as [`Pagination::new`], for unparsed input.
    pub fn from_raw(limit: Option<&str>, offset: Option<&str>) -> Self {
        Self::new(
            limit.and_then(|l| l.trim().parse().ok()),
            offset.and_then(|o| o.trim().parse().ok()),
        )
    }
}

/// Closed interval `[start, end]` to intersect reception lifetimes with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> DomainResult<Self> {
        if start > end {
            return Err(DomainError::validation(format!(
                "time window start {start} is after end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// The 24 hours ending at `now`.
    pub fn trailing_day(now: DateTime<Utc>) -> Self {
        Self {
            start: now - Duration::hours(DEFAULT_WINDOW_HOURS),
            end: now,
        }
    }

    /// Parse RFC 3339 bounds. Each missing or malformed bound is replaced by
    /// its counterpart from [`TimeWindow::trailing_day`].
    pub fn from_raw(
        start: Option<&str>,
        end: Option<&str>,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let fallback = Self::trailing_day(now);
        let start = start.and_then(parse_bound).unwrap_or(fallback.start);
        let end = end.and_then(parse_bound).unwrap_or(fallback.end);
        Self::new(start, end)
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }
}

fn parse_bound(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
