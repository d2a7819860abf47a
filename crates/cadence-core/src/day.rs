//! Calendar-day primitives.
//!
//! A [`DayKey`] is the canonical identity of one local calendar day: any
//! moment inside that day maps to the same key. Day bookkeeping never goes
//! through formatted strings, so equality and ordering are plain date
//! comparisons.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Local, NaiveDate, NaiveTime, TimeZone, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result, ValidationError};

/// Canonical key for one calendar day (time-of-day stripped).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DayKey(NaiveDate);

impl DayKey {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    /// Build a key from year/month/day, `None` for an impossible date.
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self)
    }

    /// Truncate a timestamp to the calendar day it falls on in its own zone.
    pub fn from_datetime<Tz: TimeZone>(moment: &DateTime<Tz>) -> Self {
        Self(moment.date_naive())
    }

    /// Today on the local clock.
    pub fn today() -> Self {
        Self::from_datetime(&Local::now())
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    pub fn weekday(&self) -> Weekday {
        self.0.weekday()
    }

    /// Following calendar day, saturating at the end of the supported range.
    pub fn succ(&self) -> Self {
        self.0.succ_opt().map(Self).unwrap_or(*self)
    }

    /// Preceding calendar day, saturating at the start of the supported range.
    pub fn pred(&self) -> Self {
        self.0.pred_opt().map(Self).unwrap_or(*self)
    }

    /// Signed number of days from `self` to `other`.
    pub fn days_until(&self, other: DayKey) -> i64 {
        other.0.signed_duration_since(self.0).num_days()
    }

    /// Shift by a signed number of days, `None` outside the supported range.
    pub fn add_days(&self, days: i64) -> Option<Self> {
        chrono::Duration::try_days(days)
            .and_then(|delta| self.0.checked_add_signed(delta))
            .map(Self)
    }

    /// First and last day of a calendar month.
    pub fn month_bounds(year: i32, month: u32) -> Result<(DayKey, DayKey)> {
        let invalid = || {
            CoreError::Validation(ValidationError::InvalidValue {
                field: "month".to_string(),
                message: format!("{year}-{month:02} is not a calendar month"),
            })
        };
        let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)?;
        let next_first = if month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)
        };
        let last = next_first
            .and_then(|d| d.pred_opt())
            .ok_or_else(invalid)?;
        Ok((Self(first), Self(last)))
    }
}

impl From<NaiveDate> for DayKey {
    fn from(date: NaiveDate) -> Self {
        Self(date)
    }
}

impl fmt::Display for DayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

impl FromStr for DayKey {
    type Err = ValidationError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map(Self)
            .map_err(|e| ValidationError::InvalidValue {
                field: "date".to_string(),
                message: format!("'{s}' is not a YYYY-MM-DD date: {e}"),
            })
    }
}

/// Inclusive, ascending run of calendar days.
///
/// Cloning restarts iteration from the clone's current position, so a range
/// can be walked any number of times.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayRange {
    next: Option<DayKey>,
    end: DayKey,
}

impl DayRange {
    /// Fails with [`CoreError::InvalidDateRange`] when `end` precedes `start`.
    pub fn new(start: DayKey, end: DayKey) -> Result<Self> {
        if end < start {
            return Err(CoreError::InvalidDateRange { start, end });
        }
        Ok(Self {
            next: Some(start),
            end,
        })
    }

    pub fn end(&self) -> DayKey {
        self.end
    }
}

impl Iterator for DayRange {
    type Item = DayKey;

    fn next(&mut self) -> Option<DayKey> {
        let current = self.next?;
        self.next = if current < self.end {
            Some(current.succ())
        } else {
            None
        };
        Some(current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self.next {
            Some(next) => {
                let len = (next.days_until(self.end) + 1) as usize;
                (len, Some(len))
            }
            None => (0, Some(0)),
        }
    }
}

impl ExactSizeIterator for DayRange {}

/// A time of day at which a dose / repetition is expected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimeSlot(NaiveTime);

impl TimeSlot {
    pub fn new(time: NaiveTime) -> Self {
        Self(time)
    }

    pub fn from_hm(hour: u32, minute: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, 0).map(Self)
    }

    pub fn time(&self) -> NaiveTime {
        self.0
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%H:%M"))
    }
}

impl FromStr for TimeSlot {
    type Err = ValidationError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        NaiveTime::parse_from_str(s.trim(), "%H:%M")
            .map(Self)
            .map_err(|e| ValidationError::InvalidValue {
                field: "time_slot".to_string(),
                message: format!("'{s}' is not an HH:MM time: {e}"),
            })
    }
}
