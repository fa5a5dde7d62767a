//! # engine::clock
//!
//! Every lookback window is anchored to "today". The anchor is injected so
//! tests can pin it instead of depending on the wall clock.

use chrono::{Duration, NaiveDate, Utc};

pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Wall-clock date in UTC.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Utc::now().date_naive()
    }
}

/// Always returns the same date.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

/// Earliest window start: 0001-01-01, inside the range of a PostgreSQL `DATE`.
pub fn earliest_window_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(1, 1, 1).unwrap_or(NaiveDate::MIN)
}

/// `today - window_days`, in calendar days (not trading days).
/// Windows reaching further back clamp to [`earliest_window_start`].
#[inline]
pub fn window_start(today: NaiveDate, window_days: u32) -> NaiveDate {
    let floor = earliest_window_start();
    today
        .checked_sub_signed(Duration::days(i64::from(window_days)))
        .map_or(floor, |start| start.max(floor))
}
