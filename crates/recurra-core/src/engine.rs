use crate::calendar::{Calendar, DateInterval};
use crate::rule::{RecurrenceRule, RuleFormatError};
use chrono::{Datelike, NaiveDate};
use std::collections::VecDeque;

/// RecurrenceEngine: projects a rule into concrete occurrence dates.
///
/// Projection is pure. Every occurrence is computed from the base date rather
/// than from the previous occurrence, so month-end clamping never drifts
/// (Jan 31 -> Feb 29 -> Mar 31).
#[derive(Debug, Clone, Copy, Default)]
pub struct RecurrenceEngine;

impl RecurrenceEngine {
    /// Ordered, duplicate-free occurrence dates of `rule` anchored at `base`,
    /// limited to `interval` and to the rule's own end date (inclusive).
    ///
    /// The base date is the first element when it lies inside those bounds.
    /// An empty or inverted interval yields an empty vector.
    pub fn projected_dates(
        rule: &RecurrenceRule,
        base: NaiveDate,
        interval: DateInterval,
        calendar: &Calendar,
    ) -> Vec<NaiveDate> {
        let bounds = interval.clamp_end(rule.end_date());
        if bounds.is_empty() {
            return Vec::new();
        }

        let mut dates = Vec::new();
        if bounds.contains(base) {
            dates.push(base);
        }

        for date in Self::occurrences_after(rule, base, calendar) {
            if date > bounds.end {
                break;
            }
            if date >= bounds.start {
                dates.push(date);
            }
        }

        dates
    }

    /// Resolves `text` (keyword or canonical rule) and projects it.
    pub fn projected_dates_for_text(
        text: &str,
        base: NaiveDate,
        interval: DateInterval,
        calendar: &Calendar,
        auxiliary_day: u32,
    ) -> Result<Vec<NaiveDate>, RuleFormatError> {
        let rule = RecurrenceRule::resolve(text, base, None, auxiliary_day)?;
        Ok(Self::projected_dates(&rule, base, interval, calendar))
    }

    /// Unbounded, ascending stream of occurrences strictly after `base`.
    /// Ignores the rule's end date; the stream ends only on date overflow.
    pub fn occurrences_after<'a>(
        rule: &RecurrenceRule,
        base: NaiveDate,
        calendar: &'a Calendar,
    ) -> Occurrences<'a> {
        let cadence = match *rule {
            RecurrenceRule::Daily { .. } => Cadence::Days {
                first: calendar.add_days(base, 1),
                stride: 1,
            },
            RecurrenceRule::Weekly { weekday, .. } => Cadence::Days {
                first: calendar.next_weekday_after(base, weekday),
                stride: 7,
            },
            RecurrenceRule::BiWeekly { weekday, .. } => {
                let first = if weekday == base.weekday() {
                    calendar.add_days(base, 14)
                } else {
                    calendar.next_weekday_after(base, weekday)
                };
                Cadence::Days { first, stride: 14 }
            }
            RecurrenceRule::SemiMonthly {
                first_day,
                second_day,
                ..
            } => Cadence::SemiMonthly {
                days: (first_day, second_day),
                pending: VecDeque::new(),
            },
            RecurrenceRule::Monthly { .. } => Cadence::Months { stride: 1 },
            RecurrenceRule::Quarterly { .. } => Cadence::Months { stride: 3 },
            RecurrenceRule::Yearly { .. } => Cadence::Months { stride: 12 },
        };

        Occurrences {
            base,
            calendar,
            cadence,
            index: 0,
            exhausted: false,
        }
    }
}

#[derive(Debug)]
enum Cadence {
    Days { first: Option<NaiveDate>, stride: i64 },
    Months { stride: i64 },
    SemiMonthly { days: (u32, u32), pending: VecDeque<NaiveDate> },
}

/// Iterator returned by [`RecurrenceEngine::occurrences_after`].
#[derive(Debug)]
pub struct Occurrences<'a> {
    base: NaiveDate,
    calendar: &'a Calendar,
    cadence: Cadence,
    index: i64,
    exhausted: bool,
}

impl Occurrences<'_> {
    fn advance(&mut self) -> Option<NaiveDate> {
        match &mut self.cadence {
            Cadence::Days { first, stride } => {
                let offset = self.index.checked_mul(*stride)?;
                self.index += 1;
                self.calendar.add_days((*first)?, offset)
            }
            Cadence::Months { stride } => {
                self.index += 1;
                let months = self.index.checked_mul(*stride)?;
                self.calendar.add_months(self.base, months)
            }
            Cadence::SemiMonthly { days, pending } => loop {
                if let Some(date) = pending.pop_front() {
                    return Some(date);
                }

                let month_start = self
                    .calendar
                    .clamped_date(self.base.year(), self.base.month(), 1)?;
                let month = self.calendar.add_months(month_start, self.index)?;
                self.index += 1;

                let mut in_month: Vec<NaiveDate> = [days.0, days.1]
                    .iter()
                    .filter_map(|day| self.calendar.clamped_date(month.year(), month.month(), *day))
                    .filter(|date| *date > self.base)
                    .collect();
                in_month.sort();
                in_month.dedup();
                pending.extend(in_month);
            },
        }
    }
}

impl Iterator for Occurrences<'_> {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<Self::Item> {
        if self.exhausted {
            return None;
        }
        let next = self.advance();
        if next.is_none() {
            self.exhausted = true;
        }
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;
    use proptest::prelude::*;
    use rstest::rstest;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn project(rule: RecurrenceRule, base: NaiveDate, start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
        RecurrenceEngine::projected_dates(&rule, base, DateInterval::new(start, end), &Calendar::utc())
    }

    #[test]
    fn test_monthly_clamps_without_drift() {
        let dates = project(
            RecurrenceRule::Monthly { end_date: None },
            date(2024, 1, 31),
            date(2024, 1, 1),
            date(2024, 3, 31),
        );
        assert_eq!(dates, vec![date(2024, 1, 31), date(2024, 2, 29), date(2024, 3, 31)]);
    }

    #[test]
    fn test_quarterly_clamps() {
        let dates = project(
            RecurrenceRule::Quarterly { end_date: None },
            date(2024, 11, 30),
            date(2024, 11, 1),
            date(2025, 6, 30),
        );
        assert_eq!(dates, vec![date(2024, 11, 30), date(2025, 2, 28), date(2025, 5, 30)]);
    }

    #[test]
    fn test_yearly_leap_day_anchor() {
        let dates = project(
            RecurrenceRule::Yearly { end_date: None },
            date(2020, 2, 29),
            date(2020, 1, 1),
            date(2024, 12, 31),
        );
        assert_eq!(
            dates,
            vec![
                date(2020, 2, 29),
                date(2021, 2, 28),
                date(2022, 2, 28),
                date(2023, 2, 28),
                date(2024, 2, 29)
            ]
        );
    }

    #[rstest]
    #[case(RecurrenceRule::Weekly { weekday: Weekday::Mon, end_date: None }, vec![1, 8, 15, 22])]
    #[case(RecurrenceRule::BiWeekly { weekday: Weekday::Mon, end_date: None }, vec![1, 15])]
    #[case(RecurrenceRule::Daily { end_date: Some(date(2024, 1, 4)) }, vec![1, 2, 3, 4])]
    fn test_day_strides(#[case] rule: RecurrenceRule, #[case] days: Vec<u32>) {
        let dates = project(rule, date(2024, 1, 1), date(2024, 1, 1), date(2024, 1, 22));
        let expected: Vec<NaiveDate> = days.into_iter().map(|d| date(2024, 1, d)).collect();
        assert_eq!(dates, expected);
    }

    #[test]
    fn test_weekly_on_other_weekday_anchors_to_rule_weekday() {
        // Base is Monday 2024-01-01, rule says Friday
        let dates = project(
            RecurrenceRule::Weekly {
                weekday: Weekday::Fri,
                end_date: None,
            },
            date(2024, 1, 1),
            date(2024, 1, 1),
            date(2024, 1, 19),
        );
        assert_eq!(dates, vec![date(2024, 1, 1), date(2024, 1, 5), date(2024, 1, 12), date(2024, 1, 19)]);
    }

    #[test]
    fn test_semi_monthly_two_per_month() {
        let dates = project(
            RecurrenceRule::SemiMonthly {
                first_day: 10,
                second_day: 25,
                end_date: None,
            },
            date(2024, 1, 10),
            date(2024, 1, 1),
            date(2024, 2, 29),
        );
        assert_eq!(dates, vec![date(2024, 1, 10), date(2024, 1, 25), date(2024, 2, 10), date(2024, 2, 25)]);
    }

    #[test]
    fn test_semi_monthly_orders_and_dedups_within_month() {
        // Days given out of order; Feb clamps both to the 29th
        let dates = project(
            RecurrenceRule::SemiMonthly {
                first_day: 31,
                second_day: 30,
                end_date: None,
            },
            date(2024, 1, 30),
            date(2024, 1, 1),
            date(2024, 3, 31),
        );
        assert_eq!(
            dates,
            vec![date(2024, 1, 30), date(2024, 1, 31), date(2024, 2, 29), date(2024, 3, 30), date(2024, 3, 31)]
        );
    }

    #[test]
    fn test_rule_end_date_is_tighter_bound() {
        let dates = project(
            RecurrenceRule::Monthly {
                end_date: Some(date(2024, 3, 31)),
            },
            date(2024, 1, 15),
            date(2024, 1, 1),
            date(2024, 12, 31),
        );
        assert_eq!(dates, vec![date(2024, 1, 15), date(2024, 2, 15), date(2024, 3, 15)]);
    }

    #[test]
    fn test_base_excluded_when_outside_interval() {
        let dates = project(
            RecurrenceRule::Monthly { end_date: None },
            date(2024, 1, 15),
            date(2024, 2, 1),
            date(2024, 3, 31),
        );
        assert_eq!(dates, vec![date(2024, 2, 15), date(2024, 3, 15)]);
    }

    #[test]
    fn test_empty_and_inverted_intervals() {
        let rule = RecurrenceRule::Daily { end_date: None };
        assert!(project(rule, date(2024, 1, 1), date(2024, 2, 1), date(2024, 1, 1)).is_empty());

        // End date before the interval start
        let ended = RecurrenceRule::Daily {
            end_date: Some(date(2023, 12, 31)),
        };
        assert!(project(ended, date(2023, 1, 1), date(2024, 1, 1), date(2024, 1, 31)).is_empty());
    }

    #[test]
    fn test_projection_near_date_max_terminates() {
        let base = NaiveDate::MAX.pred_opt().unwrap();
        let dates = project(RecurrenceRule::Monthly { end_date: None }, base, base, NaiveDate::MAX);
        assert_eq!(dates, vec![base]);
    }

    #[test]
    fn test_projected_dates_for_text() {
        let interval = DateInterval::new(date(2024, 1, 1), date(2024, 1, 31));
        let dates = RecurrenceEngine::projected_dates_for_text(
            "FREQ=WEEKLY;BYDAY=WE",
            date(2024, 1, 3),
            interval,
            &Calendar::utc(),
            0,
        )
        .unwrap();
        assert_eq!(dates, vec![date(2024, 1, 3), date(2024, 1, 10), date(2024, 1, 17), date(2024, 1, 24), date(2024, 1, 31)]);

        let err = RecurrenceEngine::projected_dates_for_text("every so often", date(2024, 1, 3), interval, &Calendar::utc(), 0);
        assert!(err.is_err());
    }

    fn any_rule() -> impl Strategy<Value = RecurrenceRule> {
        let weekday = prop::sample::select(vec![
            Weekday::Mon,
            Weekday::Tue,
            Weekday::Wed,
            Weekday::Thu,
            Weekday::Fri,
            Weekday::Sat,
            Weekday::Sun,
        ]);
        prop_oneof![
            Just(RecurrenceRule::Daily { end_date: None }),
            weekday.clone().prop_map(|weekday| RecurrenceRule::Weekly { weekday, end_date: None }),
            weekday.prop_map(|weekday| RecurrenceRule::BiWeekly { weekday, end_date: None }),
            (1u32..=31, 1u32..=31).prop_map(|(first_day, second_day)| RecurrenceRule::SemiMonthly {
                first_day,
                second_day,
                end_date: None
            }),
            Just(RecurrenceRule::Monthly { end_date: None }),
            Just(RecurrenceRule::Quarterly { end_date: None }),
            Just(RecurrenceRule::Yearly { end_date: None }),
        ]
    }

    proptest! {
        #[test]
        fn prop_strictly_ascending_within_bounds(
            rule in any_rule(),
            base_offset in 0i64..2000,
            start_offset in -400i64..400,
            span in 0i64..800,
        ) {
            let base = date(2020, 1, 1) + chrono::Duration::days(base_offset);
            let start = base + chrono::Duration::days(start_offset);
            let end = start + chrono::Duration::days(span);
            let dates = project(rule, base, start, end);

            prop_assert!(dates.windows(2).all(|pair| pair[0] < pair[1]));
            prop_assert!(dates.iter().all(|d| *d >= start && *d <= end));
            prop_assert_eq!(dates.first() == Some(&base), start <= base && base <= end);
            prop_assert!(dates.iter().skip(1).all(|d| *d > base));
        }

        #[test]
        fn prop_weekly_preserves_base_weekday(base_offset in 0i64..2000, span in 0i64..400) {
            let base = date(2020, 1, 1) + chrono::Duration::days(base_offset);
            let rule = RecurrenceRule::Weekly { weekday: base.weekday(), end_date: None };
            let dates = project(rule, base, base, base + chrono::Duration::days(span));
            prop_assert!(dates.iter().all(|d| d.weekday() == base.weekday()));
        }
    }
}
