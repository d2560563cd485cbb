//! Recurrence rules and their canonical text encoding.
//!
//! A [`RecurrenceRule`] is a closed set of cadences. Rules are persisted as an
//! RFC 5545 flavoured string (`FREQ=WEEKLY;BYDAY=MO`) together with an until-date
//! and an auxiliary day used by semi-monthly rules, see [`CanonicalRule`].

use chrono::{Datelike, NaiveDate, Weekday};
use rrule::{Frequency, NWeekday, RRule, Unvalidated};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid recurrence rule '{rule}': {reason}")]
pub struct RuleFormatError {
    pub rule: String,
    pub reason: String,
}

impl RuleFormatError {
    fn new(rule: &str, reason: impl Into<String>) -> Self {
        Self {
            rule: rule.to_string(),
            reason: reason.into(),
        }
    }
}

/// Cadence of a recurring series. Every variant carries an optional inclusive end date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "frequency", rename_all = "snake_case")]
pub enum RecurrenceRule {
    Daily {
        end_date: Option<NaiveDate>,
    },
    Weekly {
        weekday: Weekday,
        end_date: Option<NaiveDate>,
    },
    BiWeekly {
        weekday: Weekday,
        end_date: Option<NaiveDate>,
    },
    /// Two occurrences per month. Days past the end of a month clamp to its last day.
    SemiMonthly {
        first_day: u32,
        second_day: u32,
        end_date: Option<NaiveDate>,
    },
    Monthly {
        end_date: Option<NaiveDate>,
    },
    Quarterly {
        end_date: Option<NaiveDate>,
    },
    Yearly {
        end_date: Option<NaiveDate>,
    },
}

/// Storage form of a rule: rule text, until-date and the semi-monthly second day
/// (zero for every other cadence).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalRule {
    pub text: String,
    pub until: Option<NaiveDate>,
    pub auxiliary_day: u32,
}

fn clamp_day(day: i64) -> u32 {
    day.clamp(1, 31) as u32
}

fn weekday_code(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "MO",
        Weekday::Tue => "TU",
        Weekday::Wed => "WE",
        Weekday::Thu => "TH",
        Weekday::Fri => "FR",
        Weekday::Sat => "SA",
        Weekday::Sun => "SU",
    }
}

fn parse_until(rule: &str, value: &str) -> Result<NaiveDate, RuleFormatError> {
    let value = value.trim();
    let digits = value.get(..8).unwrap_or(value);
    NaiveDate::parse_from_str(digits, "%Y%m%d")
        .map_err(|_| RuleFormatError::new(rule, format!("invalid UNTIL value '{}'", value)))
}

impl RecurrenceRule {
    pub fn end_date(&self) -> Option<NaiveDate> {
        match *self {
            RecurrenceRule::Daily { end_date }
            | RecurrenceRule::Weekly { end_date, .. }
            | RecurrenceRule::BiWeekly { end_date, .. }
            | RecurrenceRule::SemiMonthly { end_date, .. }
            | RecurrenceRule::Monthly { end_date }
            | RecurrenceRule::Quarterly { end_date }
            | RecurrenceRule::Yearly { end_date } => end_date,
        }
    }

    /// Returns the same cadence bounded by `end_date`.
    pub fn with_end_date(self, end_date: Option<NaiveDate>) -> Self {
        match self {
            RecurrenceRule::Daily { .. } => RecurrenceRule::Daily { end_date },
            RecurrenceRule::Weekly { weekday, .. } => RecurrenceRule::Weekly { weekday, end_date },
            RecurrenceRule::BiWeekly { weekday, .. } => RecurrenceRule::BiWeekly { weekday, end_date },
            RecurrenceRule::SemiMonthly {
                first_day,
                second_day,
                ..
            } => RecurrenceRule::SemiMonthly {
                first_day,
                second_day,
                end_date,
            },
            RecurrenceRule::Monthly { .. } => RecurrenceRule::Monthly { end_date },
            RecurrenceRule::Quarterly { .. } => RecurrenceRule::Quarterly { end_date },
            RecurrenceRule::Yearly { .. } => RecurrenceRule::Yearly { end_date },
        }
    }

    /// Short keyword naming the cadence.
    pub fn keyword(&self) -> &'static str {
        match self {
            RecurrenceRule::Daily { .. } => "daily",
            RecurrenceRule::Weekly { .. } => "weekly",
            RecurrenceRule::BiWeekly { .. } => "biweekly",
            RecurrenceRule::SemiMonthly { .. } => "semimonthly",
            RecurrenceRule::Monthly { .. } => "monthly",
            RecurrenceRule::Quarterly { .. } => "quarterly",
            RecurrenceRule::Yearly { .. } => "yearly",
        }
    }

    /// Encodes the rule for storage. Day parameters are clamped to `1..=31`;
    /// month-anchored cadences record the day (and month) of `starting_from`.
    pub fn to_canonical(&self, starting_from: NaiveDate) -> CanonicalRule {
        let base_day = starting_from.day();
        let (text, auxiliary_day) = match *self {
            RecurrenceRule::Daily { .. } => ("FREQ=DAILY".to_string(), 0),
            RecurrenceRule::Weekly { weekday, .. } => {
                (format!("FREQ=WEEKLY;BYDAY={}", weekday_code(weekday)), 0)
            }
            RecurrenceRule::BiWeekly { weekday, .. } => (
                format!("FREQ=WEEKLY;INTERVAL=2;BYDAY={}", weekday_code(weekday)),
                0,
            ),
            RecurrenceRule::SemiMonthly {
                first_day,
                second_day,
                ..
            } => {
                let first = clamp_day(i64::from(first_day));
                let second = clamp_day(i64::from(second_day));
                (format!("FREQ=MONTHLY;BYMONTHDAY={},{}", first, second), second)
            }
            RecurrenceRule::Monthly { .. } => (format!("FREQ=MONTHLY;BYMONTHDAY={}", base_day), 0),
            RecurrenceRule::Quarterly { .. } => (
                format!("FREQ=MONTHLY;INTERVAL=3;BYMONTHDAY={}", base_day),
                0,
            ),
            RecurrenceRule::Yearly { .. } => (
                format!(
                    "FREQ=YEARLY;BYMONTH={};BYMONTHDAY={}",
                    starting_from.month(),
                    base_day
                ),
                0,
            ),
        };

        CanonicalRule {
            text,
            until: self.end_date(),
            auxiliary_day,
        }
    }

    /// Inverse of [`RecurrenceRule::to_canonical`].
    ///
    /// An explicit `end_date` wins over an `UNTIL=` part embedded in the text. A
    /// monthly rule with a single `BYMONTHDAY` becomes semi-monthly when
    /// `auxiliary_day` is non-zero. Day values are clamped to `1..=31`.
    pub fn parse(
        text: &str,
        end_date: Option<NaiveDate>,
        auxiliary_day: u32,
    ) -> Result<Self, RuleFormatError> {
        let trimmed = text.trim();
        let body = match trimmed.get(..6) {
            Some(prefix) if prefix.eq_ignore_ascii_case("RRULE:") => &trimmed[6..],
            _ => trimmed,
        };
        if body.is_empty() {
            return Err(RuleFormatError::new(text, "empty rule"));
        }

        // UNTIL is a plain date here; rrule wants a timestamp tied to DTSTART.
        let mut parts = Vec::new();
        let mut until: Option<NaiveDate> = None;
        for part in body.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            let (key, value) = part
                .split_once('=')
                .ok_or_else(|| RuleFormatError::new(text, format!("expected KEY=VALUE, got '{}'", part)))?;
            let key = key.trim().to_ascii_uppercase();
            match key.as_str() {
                "UNTIL" => until = Some(parse_until(text, value)?),
                // Out-of-range days are clamped, never rejected
                "BYMONTHDAY" => {
                    let days = value
                        .split(',')
                        .map(|day| {
                            day.trim()
                                .parse::<i64>()
                                .map(|day| clamp_day(day).to_string())
                                .map_err(|_| RuleFormatError::new(text, format!("invalid BYMONTHDAY '{}'", day)))
                        })
                        .collect::<Result<Vec<_>, _>>()?;
                    parts.push(format!("BYMONTHDAY={}", days.join(",")));
                }
                "FREQ" | "INTERVAL" | "BYDAY" | "BYMONTH" | "WKST" => {
                    parts.push(format!("{}={}", key, value.trim().to_ascii_uppercase()));
                }
                other => {
                    return Err(RuleFormatError::new(text, format!("unsupported part '{}'", other)));
                }
            }
        }

        let rrule: RRule<Unvalidated> = parts
            .join(";")
            .parse::<RRule<Unvalidated>>()
            .map_err(|e| RuleFormatError::new(text, e.to_string()))?;

        if let Some(month) = rrule.get_by_month().iter().find(|m| !(1..=12).contains(*m)) {
            return Err(RuleFormatError::new(text, format!("BYMONTH out of range: {}", month)));
        }
        let weekday = match rrule.get_by_weekday() {
            [] => None,
            [NWeekday::Every(weekday)] => Some(*weekday),
            _ => return Err(RuleFormatError::new(text, "only a single plain BYDAY weekday is supported")),
        };
        let month_days: Vec<u32> = rrule
            .get_by_month_day()
            .iter()
            .map(|day| clamp_day(i64::from(*day)))
            .collect();

        let end_date = end_date.or(until);
        match (rrule.get_freq(), rrule.get_interval()) {
            (Frequency::Daily, 1) => Ok(RecurrenceRule::Daily { end_date }),
            (Frequency::Weekly, interval @ (1 | 2)) => {
                let weekday = weekday
                    .ok_or_else(|| RuleFormatError::new(text, "weekly rules require BYDAY"))?;
                if interval == 1 {
                    Ok(RecurrenceRule::Weekly { weekday, end_date })
                } else {
                    Ok(RecurrenceRule::BiWeekly { weekday, end_date })
                }
            }
            (Frequency::Monthly, 1) => match month_days.as_slice() {
                // The stored auxiliary day tells which of the two comes second
                [a, b] if *a == auxiliary_day && *b != auxiliary_day => Ok(RecurrenceRule::SemiMonthly {
                    first_day: *b,
                    second_day: *a,
                    end_date,
                }),
                [first, second] => Ok(RecurrenceRule::SemiMonthly {
                    first_day: *first,
                    second_day: *second,
                    end_date,
                }),
                [first] if auxiliary_day > 0 => Ok(RecurrenceRule::SemiMonthly {
                    first_day: *first,
                    second_day: clamp_day(i64::from(auxiliary_day)),
                    end_date,
                }),
                [] | [_] => Ok(RecurrenceRule::Monthly { end_date }),
                _ => Err(RuleFormatError::new(text, "at most two BYMONTHDAY values are supported")),
            },
            (Frequency::Monthly, 3) => Ok(RecurrenceRule::Quarterly { end_date }),
            (Frequency::Yearly, 1) => Ok(RecurrenceRule::Yearly { end_date }),
            (freq, interval) => Err(RuleFormatError::new(
                text,
                format!("unsupported cadence {:?} with interval {}", freq, interval),
            )),
        }
    }

    /// Builds a rule from a cadence keyword such as `monthly` or `biweekly`,
    /// taking weekday and day-of-month parameters from `base`. Semi-monthly rules
    /// take their second day from `auxiliary_day`.
    pub fn from_keyword(
        keyword: &str,
        base: NaiveDate,
        end_date: Option<NaiveDate>,
        auxiliary_day: u32,
    ) -> Result<Self, RuleFormatError> {
        let normalized: String = keyword
            .trim()
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .collect::<String>()
            .to_ascii_lowercase();

        match normalized.as_str() {
            "daily" => Ok(RecurrenceRule::Daily { end_date }),
            "weekly" => Ok(RecurrenceRule::Weekly {
                weekday: base.weekday(),
                end_date,
            }),
            "biweekly" | "fortnightly" => Ok(RecurrenceRule::BiWeekly {
                weekday: base.weekday(),
                end_date,
            }),
            "semimonthly" | "twicemonthly" => {
                if auxiliary_day == 0 {
                    return Err(RuleFormatError::new(keyword, "semi-monthly rules need a second day of month"));
                }
                Ok(RecurrenceRule::SemiMonthly {
                    first_day: base.day(),
                    second_day: clamp_day(i64::from(auxiliary_day)),
                    end_date,
                })
            }
            "monthly" => Ok(RecurrenceRule::Monthly { end_date }),
            "quarterly" => Ok(RecurrenceRule::Quarterly { end_date }),
            "yearly" | "annually" | "annual" => Ok(RecurrenceRule::Yearly { end_date }),
            _ => Err(RuleFormatError::new(keyword, "unknown recurrence keyword")),
        }
    }

    /// Accepts either a keyword or canonical rule text.
    pub fn resolve(
        text: &str,
        base: NaiveDate,
        end_date: Option<NaiveDate>,
        auxiliary_day: u32,
    ) -> Result<Self, RuleFormatError> {
        if text.contains('=') {
            Self::parse(text, end_date, auxiliary_day)
        } else {
            Self::from_keyword(text, base, end_date, auxiliary_day)
        }
    }
}

impl fmt::Display for RecurrenceRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecurrenceRule::Weekly { weekday, .. } => write!(f, "weekly on {}", weekday)?,
            RecurrenceRule::BiWeekly { weekday, .. } => write!(f, "every other {}", weekday)?,
            RecurrenceRule::SemiMonthly {
                first_day,
                second_day,
                ..
            } => write!(f, "semi-monthly on days {} and {}", first_day, second_day)?,
            other => write!(f, "{}", other.keyword())?,
        }
        if let Some(end) = self.end_date() {
            write!(f, " until {}", end.format("%Y-%m-%d"))?;
        }
        Ok(())
    }
}
