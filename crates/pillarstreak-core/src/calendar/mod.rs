//! Calendar-day arithmetic.
//!
//! Streaks and rotation checkpoints are counted in calendar days, not in
//! 24-hour periods. A [`Calendar`] fixes where a day starts (a UTC offset);
//! all comparisons go through it so "today" means the same thing everywhere.

use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};

/// Instants are stored and exchanged in UTC.
pub type Timestamp = DateTime<Utc>;

/// Current instant.
pub fn now() -> Timestamp {
    Utc::now()
}

/// Parse an RFC 3339 / ISO-8601 timestamp. Malformed input yields `None`.
pub fn parse_timestamp(raw: &str) -> Option<Timestamp> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Source of "now" for the engine.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Utc::now()
    }
}

/// A clock pinned to one instant (replays, tests, `--at` on the CLI).
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub Timestamp);

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        self.0
    }
}

/// Day-boundary definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Calendar {
    offset: FixedOffset,
}

impl Default for Calendar {
    fn default() -> Self {
        Self::utc()
    }
}

impl Calendar {
    /// Days start at midnight UTC.
    pub fn utc() -> Self {
        Self {
            offset: Utc.fix(),
        }
    }

    /// Days start at midnight in the given offset from UTC.
    ///
    /// Offsets outside ±24h are rejected by chrono; those fall back to UTC.
    pub fn with_offset_minutes(minutes: i32) -> Self {
        match minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
        {
            Some(offset) => Self { offset },
            None => {
                tracing::warn!(minutes, "utc offset out of range, using UTC day boundary");
                Self::utc()
            }
        }
    }

    pub fn offset_minutes(&self) -> i32 {
        self.offset.local_minus_utc() / 60
    }

    /// Calendar date `ts` falls on.
    pub fn day_of(&self, ts: Timestamp) -> NaiveDate {
        ts.with_timezone(&self.offset).date_naive()
    }

    /// Whether both instants fall on the same year/month/day.
    pub fn is_same_calendar_day(&self, a: Timestamp, b: Timestamp) -> bool {
        self.day_of(a) == self.day_of(b)
    }

    /// Absolute number of calendar days between the dates of `a` and `b`.
    ///
    /// 23:00 yesterday and 08:00 today are one day apart; 01:00 yesterday
    /// and 23:00 today are also one day apart.
    pub fn days_between(&self, a: Timestamp, b: Timestamp) -> i64 {
        (self.day_of(a) - self.day_of(b)).num_days().abs()
    }

    /// Absolute number of days between two calendar dates.
    pub fn days_between_dates(a: NaiveDate, b: NaiveDate) -> i64 {
        (a - b).num_days().abs()
    }
}
