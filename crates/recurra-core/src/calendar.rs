use crate::error::CoreError;
use chrono::{DateTime, Datelike, Days, Months, NaiveDate, Utc, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Date arithmetic capability supplied by the caller.
///
/// All recurrence math goes through a `Calendar` so that the caller decides which
/// timezone turns an instant into a calendar day and which weekday starts a week.
/// Month and year arithmetic clamps to the last valid day of the target month.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Calendar {
    timezone: Tz,
    first_weekday: Weekday,
}

impl Default for Calendar {
    fn default() -> Self {
        Self::utc()
    }
}

impl Calendar {
    pub fn new(timezone: Tz, first_weekday: Weekday) -> Self {
        Self {
            timezone,
            first_weekday,
        }
    }

    /// Gregorian calendar in UTC with weeks starting on Monday.
    pub fn utc() -> Self {
        Self::new(Tz::UTC, Weekday::Mon)
    }

    /// Build a calendar from an IANA timezone name.
    pub fn from_timezone_name(timezone: &str, first_weekday: Weekday) -> Result<Self, CoreError> {
        let tz = Tz::from_str(timezone)
            .map_err(|_| CoreError::InvalidInput(format!("Invalid timezone: {}", timezone)))?;
        Ok(Self::new(tz, first_weekday))
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    pub fn first_weekday(&self) -> Weekday {
        self.first_weekday
    }

    /// Normalize an instant to the local calendar day it falls on.
    pub fn start_of_day(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.timezone).date_naive()
    }

    pub fn today(&self) -> NaiveDate {
        self.start_of_day(Utc::now())
    }

    pub fn add_days(&self, date: NaiveDate, days: i64) -> Option<NaiveDate> {
        if days >= 0 {
            date.checked_add_days(Days::new(days.unsigned_abs()))
        } else {
            date.checked_sub_days(Days::new(days.unsigned_abs()))
        }
    }

    pub fn add_weeks(&self, date: NaiveDate, weeks: i64) -> Option<NaiveDate> {
        self.add_days(date, weeks.checked_mul(7)?)
    }

    /// Adds calendar months, clamping the day to the target month's length
    /// (Jan 31 + 1 month is Feb 28 or Feb 29).
    pub fn add_months(&self, date: NaiveDate, months: i64) -> Option<NaiveDate> {
        let magnitude = u32::try_from(months.unsigned_abs()).ok()?;
        if months >= 0 {
            date.checked_add_months(Months::new(magnitude))
        } else {
            date.checked_sub_months(Months::new(magnitude))
        }
    }

    /// Adds calendar years; Feb 29 lands on Feb 28 in non-leap years.
    pub fn add_years(&self, date: NaiveDate, years: i64) -> Option<NaiveDate> {
        self.add_months(date, years.checked_mul(12)?)
    }

    pub fn day_of_month(&self, date: NaiveDate) -> u32 {
        date.day()
    }

    pub fn is_leap_year(&self, year: i32) -> bool {
        (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
    }

    pub fn days_in_month(&self, year: i32, month: u32) -> u32 {
        match month {
            1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
            4 | 6 | 9 | 11 => 30,
            2 if self.is_leap_year(year) => 29,
            2 => 28,
            _ => 0,
        }
    }

    /// The date for `day` in the given month, clamped into `1..=days_in_month`.
    pub fn clamped_date(&self, year: i32, month: u32, day: u32) -> Option<NaiveDate> {
        let last = self.days_in_month(year, month);
        if last == 0 {
            return None;
        }
        NaiveDate::from_ymd_opt(year, month, day.clamp(1, last))
    }

    /// First day of the week containing `date`, honoring the configured first weekday.
    pub fn start_of_week(&self, date: NaiveDate) -> NaiveDate {
        let current = date.weekday().num_days_from_monday();
        let first = self.first_weekday.num_days_from_monday();
        let offset = (7 + current - first) % 7;
        self.add_days(date, -i64::from(offset)).unwrap_or(date)
    }

    /// Smallest date strictly after `date` that falls on `weekday`.
    pub fn next_weekday_after(&self, date: NaiveDate, weekday: Weekday) -> Option<NaiveDate> {
        let current = date.weekday().num_days_from_monday();
        let target = weekday.num_days_from_monday();
        let offset = match (7 + target - current) % 7 {
            0 => 7,
            n => n,
        };
        self.add_days(date, i64::from(offset))
    }
}

/// Closed date interval `[start, end]`. An interval whose start lies after its
/// end is empty rather than invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateInterval {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateInterval {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn is_empty(&self) -> bool {
        self.start > self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Narrow the upper bound to `end` when it is tighter.
    pub fn clamp_end(&self, end: Option<NaiveDate>) -> Self {
        match end {
            Some(end) if end < self.end => Self::new(self.start, end),
            _ => *self,
        }
    }

    /// Same interval with every date on or before `date` removed.
    pub fn strictly_after(&self, date: NaiveDate, calendar: &Calendar) -> Self {
        match calendar.add_days(date, 1) {
            Some(next) if next > self.start => Self::new(next, self.end),
            Some(_) => *self,
            // Nothing comes after the last representable date.
            None => Self::new(NaiveDate::MAX, NaiveDate::MIN),
        }
    }

    pub fn week_containing(date: NaiveDate, calendar: &Calendar) -> Self {
        let start = calendar.start_of_week(date);
        let end = calendar.add_days(start, 6).unwrap_or(NaiveDate::MAX);
        Self::new(start, end)
    }

    pub fn month_containing(date: NaiveDate, calendar: &Calendar) -> Self {
        let start = calendar
            .clamped_date(date.year(), date.month(), 1)
            .unwrap_or(date);
        let end = calendar
            .clamped_date(date.year(), date.month(), 31)
            .unwrap_or(date);
        Self::new(start, end)
    }
}
