use anyhow::{anyhow, Result};
use chrono::{NaiveDate, TimeZone, Utc};
use chrono_english::{parse_date_string, Dialect};
use recurra_core::calendar::Calendar;

/// Parses an ISO date (`2024-03-15`) or an English phrase such as
/// `tomorrow` or `next friday`, relative to the calendar's local clock.
pub fn parse_date(input: &str, calendar: &Calendar) -> Result<NaiveDate> {
    let input = input.trim();
    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return Ok(date);
    }

    // Phrases resolve against local wall-clock time expressed as UTC so the
    // resulting calendar day is the local one.
    let local_now = Utc::now().with_timezone(&calendar.timezone()).naive_local();
    let now = Utc.from_utc_datetime(&local_now);
    parse_date_string(input, now, Dialect::Us)
        .map(|parsed| parsed.date_naive())
        .map_err(|e| anyhow!("Failed to parse date '{}': {}", input, e))
}

pub fn parse_optional_date(input: Option<&str>, calendar: &Calendar) -> Result<Option<NaiveDate>> {
    input.map(|value| parse_date(value, calendar)).transpose()
}
