//! Time-zone-aware clock and broadcast-day arithmetic.
//!
//! All date and period calculations go through a [`Clock`] so that no code
//! path reads a naive "now". The broadcast day starts at 03:00 local time;
//! anything before 03:00 belongs to the previous calendar day's broadcast.

use crate::error::{Result, ScheduleError};
use crate::time_of_day::BROADCAST_DAY_START_HOUR;
use chrono::{DateTime, Datelike, Duration, FixedOffset, Local, NaiveDate, NaiveTime, Timelike, Utc};

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<FixedOffset>;
}

/// Wall clock in a configured fixed offset, or the host's local zone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock {
    offset: Option<FixedOffset>,
}

impl SystemClock {
    pub fn new(offset: Option<FixedOffset>) -> Self {
        SystemClock { offset }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        match self.offset {
            Some(offset) => Utc::now().with_timezone(&offset),
            None => Local::now().fixed_offset(),
        }
    }
}

/// A clock frozen at one instant. Used by tests and by `--at` queries.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<FixedOffset>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        self.0
    }
}

/// Parse a `±HH:MM` (or `Z`/`UTC`) offset string.
pub fn parse_utc_offset(s: &str) -> Result<FixedOffset> {
    let invalid = || {
        ScheduleError::InvalidInput(format!(
            "Invalid UTC offset '{}'. Expected ±HH:MM",
            s
        ))
    };
    let trimmed = s.trim();
    if trimmed.eq_ignore_ascii_case("z") || trimmed.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0).ok_or_else(invalid);
    }
    let (sign, rest) = match trimmed.chars().next() {
        Some('+') => (1, &trimmed[1..]),
        Some('-') => (-1, &trimmed[1..]),
        _ => return Err(invalid()),
    };
    let (h, m) = rest.split_once(':').unwrap_or((rest, "0"));
    let hours: i32 = h.parse().map_err(|_| invalid())?;
    let minutes: i32 = m.parse().map_err(|_| invalid())?;
    if hours > 23 || minutes > 59 {
        return Err(invalid());
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}

fn origin_time() -> NaiveTime {
    NaiveTime::from_hms_opt(BROADCAST_DAY_START_HOUR, 0, 0).unwrap_or(NaiveTime::MIN)
}

/// Calendar date of the broadcast day containing `at`.
pub fn broadcast_date(at: &DateTime<FixedOffset>) -> NaiveDate {
    let date = at.date_naive();
    if at.hour() < BROADCAST_DAY_START_HOUR {
        date.pred_opt().unwrap_or(date)
    } else {
        date
    }
}

/// Instant at which the broadcast day for `date` begins, in `offset`.
pub fn broadcast_day_start(date: NaiveDate, offset: FixedOffset) -> DateTime<FixedOffset> {
    let local = date.and_time(origin_time());
    let utc = local - Duration::seconds(offset.local_minus_utc() as i64);
    DateTime::from_naive_utc_and_offset(utc, offset)
}

/// Seconds elapsed since the start of the broadcast day containing `at`.
pub fn seconds_into_broadcast_day(at: &DateTime<FixedOffset>) -> i64 {
    let start = broadcast_day_start(broadcast_date(at), *at.offset());
    (*at - start).num_seconds()
}

/// Monday of the broadcast week containing `at`.
pub fn week_start(at: &DateTime<FixedOffset>) -> NaiveDate {
    let date = broadcast_date(at);
    let back = date.weekday().num_days_from_monday() as i64;
    date - Duration::days(back)
}
