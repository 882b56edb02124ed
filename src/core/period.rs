//! Reporting date ranges.
//!
//! Reports accept optional `start_date` / `end_date` values in `YYYY-MM-DD` form.
//! A given end date covers the whole day, so it becomes an exclusive bound at the
//! following midnight. Missing values fall back to a trailing window ending now.

use crate::errors::{Error, Result};
use chrono::{DateTime, Days, Duration, NaiveDate, NaiveTime, Utc};

/// Length of the trailing window used when a report has no dates.
pub const DEFAULT_WINDOW_DAYS: i64 = 30;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Upper bound of a [`DateRange`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeEnd {
    /// Entries at exactly this instant are included
    Inclusive(DateTime<Utc>),
    /// Entries at this instant or later are excluded
    Exclusive(DateTime<Utc>),
}

impl RangeEnd {
    /// The instant this bound sits at.
    #[must_use]
    pub fn instant(&self) -> DateTime<Utc> {
        match self {
            Self::Inclusive(t) | Self::Exclusive(t) => *t,
        }
    }
}

/// A time window with an inclusive start
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    /// First included instant
    pub start: DateTime<Utc>,
    /// Upper bound, inclusive or exclusive
    pub end: RangeEnd,
}

impl DateRange {
    /// The `days`-long window ending (inclusively) at `now`.
    #[must_use]
    pub fn trailing_days(days: i64, now: DateTime<Utc>) -> Self {
        Self {
            start: now - Duration::days(days),
            end: RangeEnd::Inclusive(now),
        }
    }

    /// A window inclusive on both ends.
    ///
    /// # Errors
    /// Returns `Error::InvalidInput` if `start` is after `end`.
    pub fn between(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if start > end {
            return Err(Error::invalid(format!(
                "range start {start} is after range end {end}"
            )));
        }
        Ok(Self {
            start,
            end: RangeEnd::Inclusive(end),
        })
    }

    /// Builds a range from optional calendar days.
    ///
    /// A missing start sits `window_days` before the end; a missing end is `now`.
    ///
    /// # Errors
    /// Returns `Error::InvalidInput` if the start day is after the end day, or the
    /// start lies in the future when no end day is given.
    pub fn from_dates(
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
        now: DateTime<Utc>,
        window_days: i64,
    ) -> Result<Self> {
        let end = match end_date {
            Some(day) => {
                let next_day = day
                    .checked_add_days(Days::new(1))
                    .ok_or_else(|| Error::invalid(format!("end date {day} is out of range")))?;
                RangeEnd::Exclusive(midnight(next_day))
            }
            None => RangeEnd::Inclusive(now),
        };

        let start = match start_date {
            Some(day) => midnight(day),
            None => end.instant() - Duration::days(window_days),
        };

        if let (Some(first), Some(last)) = (start_date, end_date) {
            if first > last {
                return Err(Error::invalid(format!(
                    "start date {first} is after end date {last}"
                )));
            }
        }
        if start > end.instant() {
            return Err(Error::invalid(format!(
                "range start {start} is after range end {}",
                end.instant()
            )));
        }

        Ok(Self { start, end })
    }

    /// Parses the `start_date` / `end_date` query parameters.
    ///
    /// Blank values count as absent.
    ///
    /// # Errors
    /// Returns `Error::InvalidInput` for malformed dates or a reversed range.
    pub fn from_query(
        start_date: Option<&str>,
        end_date: Option<&str>,
        now: DateTime<Utc>,
        window_days: i64,
    ) -> Result<Self> {
        let start = parse_day(start_date, "start_date")?;
        let end = parse_day(end_date, "end_date")?;
        Self::from_dates(start, end, now, window_days)
    }

    /// Whether `instant` falls inside the range.
    #[must_use]
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        if instant < self.start {
            return false;
        }
        match self.end {
            RangeEnd::Inclusive(end) => instant <= end,
            RangeEnd::Exclusive(end) => instant < end,
        }
    }

    /// First calendar day touched by the range.
    #[must_use]
    pub fn first_day(&self) -> NaiveDate {
        self.start.date_naive()
    }

    /// Last calendar day touched by the range.
    #[must_use]
    pub fn last_day(&self) -> NaiveDate {
        match self.end {
            RangeEnd::Inclusive(end) => end.date_naive(),
            RangeEnd::Exclusive(end) => (end - Duration::nanoseconds(1)).date_naive(),
        }
    }
}

fn midnight(day: NaiveDate) -> DateTime<Utc> {
    day.and_time(NaiveTime::MIN).and_utc()
}

fn parse_day(value: Option<&str>, field: &str) -> Result<Option<NaiveDate>> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) => NaiveDate::parse_from_str(text, DATE_FORMAT)
            .map(Some)
            .map_err(|_| Error::invalid(format!("{field} must be YYYY-MM-DD, got '{text}'"))),
    }
}
