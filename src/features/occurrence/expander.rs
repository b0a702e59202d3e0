//! Repeat-rule expansion
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0
//!
//! No side effects and no I/O: a rule, a reference instant and the series
//! anchor go in, the next fire time comes out. Monthly and yearly steps use
//! calendar unit addition (day-of-month clamps to the shorter month), never
//! fixed-duration multiples.

use chrono::{DateTime, Datelike, Duration, Months, NaiveTime, Utc};

use crate::database::RepeatRule;

#[derive(Debug, Clone)]
pub struct OccurrenceExpander {
    /// Time-of-day at which custom-date occurrences fire
    custom_fire_time: NaiveTime,
}

impl OccurrenceExpander {
    pub fn new(custom_fire_time: NaiveTime) -> Self {
        OccurrenceExpander { custom_fire_time }
    }

    /// The next fire time of `rule` strictly after `from`, where the series
    /// consists of `anchor` advanced by whole periods.
    ///
    /// Non-repeating rules return the anchor itself while it is still ahead,
    /// then `None`. A malformed rule (empty custom-date set) yields `None`;
    /// callers treat that as "series complete".
    pub fn next_occurrence(
        &self,
        rule: &RepeatRule,
        from: DateTime<Utc>,
        anchor: DateTime<Utc>,
    ) -> Option<DateTime<Utc>> {
        match rule {
            RepeatRule::None => (anchor > from).then_some(anchor),
            RepeatRule::Daily => Self::next_by_days(from, anchor, 1),
            RepeatRule::Weekly => Self::next_by_days(from, anchor, 7),
            RepeatRule::Monthly => Self::next_by_months(from, anchor, 1),
            RepeatRule::Yearly => Self::next_by_months(from, anchor, 12),
            RepeatRule::CustomDates { dates } => {
                let mut dates = dates.clone();
                dates.sort_unstable();
                dates
                    .into_iter()
                    .map(|d| d.and_time(self.custom_fire_time).and_utc())
                    .find(|candidate| *candidate > from)
            }
        }
    }

    fn next_by_days(
        from: DateTime<Utc>,
        anchor: DateTime<Utc>,
        period_days: i64,
    ) -> Option<DateTime<Utc>> {
        if anchor > from {
            return Some(anchor);
        }
        let elapsed_periods = (from - anchor).num_days() / period_days;
        let mut candidate = anchor.checked_add_signed(Duration::days(
            elapsed_periods.checked_mul(period_days)?,
        ))?;
        while candidate <= from {
            candidate = candidate.checked_add_signed(Duration::days(period_days))?;
        }
        Some(candidate)
    }

    fn next_by_months(
        from: DateTime<Utc>,
        anchor: DateTime<Utc>,
        period_months: u32,
    ) -> Option<DateTime<Utc>> {
        if anchor > from {
            return Some(anchor);
        }
        // Estimate the step count from the calendar distance, then walk
        // forward. Each candidate is derived from the original anchor so a
        // clamped month (Jan 31 -> Feb 28) does not shift later steps.
        let elapsed_months =
            (from.year() - anchor.year()) * 12 + (from.month() as i32 - anchor.month() as i32);
        let mut steps = (elapsed_months.max(0) as u32) / period_months;
        loop {
            let candidate = anchor.checked_add_months(Months::new(steps.checked_mul(period_months)?))?;
            if candidate > from {
                return Some(candidate);
            }
            steps += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn expander() -> OccurrenceExpander {
        OccurrenceExpander::new(NaiveTime::from_hms_opt(0, 0, 0).unwrap())
    }

    #[test]
    fn test_non_repeating_fires_once() {
        let e = expander();
        let anchor = ts("2024-01-01T09:00:00Z");
        assert_eq!(
            e.next_occurrence(&RepeatRule::None, ts("2023-12-31T00:00:00Z"), anchor),
            Some(anchor)
        );
        // Already fired: anchor itself and anything later yields nothing
        assert_eq!(e.next_occurrence(&RepeatRule::None, anchor, anchor), None);
        assert_eq!(
            e.next_occurrence(&RepeatRule::None, ts("2024-02-01T00:00:00Z"), anchor),
            None
        );
    }

    #[test]
    fn test_repeating_from_anchor_is_strictly_later() {
        let e = expander();
        let anchor = ts("2024-01-01T09:00:00Z");
        for rule in [
            RepeatRule::Daily,
            RepeatRule::Weekly,
            RepeatRule::Monthly,
            RepeatRule::Yearly,
        ] {
            let next = e.next_occurrence(&rule, anchor, anchor).unwrap();
            assert!(next > anchor, "{rule:?} must advance past the anchor");
        }
    }

    #[test]
    fn test_daily_advances_one_day_preserving_time() {
        let e = expander();
        let anchor = ts("2024-01-01T09:00:00Z");
        assert_eq!(
            e.next_occurrence(&RepeatRule::Daily, anchor, anchor),
            Some(ts("2024-01-02T09:00:00Z"))
        );
        // A reference point far past the anchor lands on the congruent slot
        assert_eq!(
            e.next_occurrence(&RepeatRule::Daily, ts("2024-03-05T10:30:00Z"), anchor),
            Some(ts("2024-03-06T09:00:00Z"))
        );
        assert_eq!(
            e.next_occurrence(&RepeatRule::Daily, ts("2024-03-05T08:30:00Z"), anchor),
            Some(ts("2024-03-05T09:00:00Z"))
        );
    }

    #[test]
    fn test_weekly_stays_on_weekday() {
        let e = expander();
        let anchor = ts("2024-01-01T09:00:00Z"); // a Monday
        let next = e
            .next_occurrence(&RepeatRule::Weekly, ts("2024-02-14T00:00:00Z"), anchor)
            .unwrap();
        assert_eq!(next, ts("2024-02-19T09:00:00Z"));
        assert_eq!(next.weekday(), chrono::Weekday::Mon);
    }

    #[test]
    fn test_monthly_clamps_jan_31_to_end_of_february() {
        let e = expander();
        // Leap year: lands on Feb 29
        let anchor = ts("2024-01-31T09:00:00Z");
        assert_eq!(
            e.next_occurrence(&RepeatRule::Monthly, anchor, anchor),
            Some(ts("2024-02-29T09:00:00Z"))
        );
        // Non-leap year: Feb 28, never a March rollover
        let anchor = ts("2023-01-31T09:00:00Z");
        assert_eq!(
            e.next_occurrence(&RepeatRule::Monthly, anchor, anchor),
            Some(ts("2023-02-28T09:00:00Z"))
        );
    }

    #[test]
    fn test_monthly_clamp_does_not_shift_later_steps() {
        let e = expander();
        let anchor = ts("2024-01-31T09:00:00Z");
        // After the clamped February occurrence the series returns to the 31st
        assert_eq!(
            e.next_occurrence(&RepeatRule::Monthly, ts("2024-02-29T09:00:00Z"), anchor),
            Some(ts("2024-03-31T09:00:00Z"))
        );
    }

    #[test]
    fn test_yearly_clamps_leap_day() {
        let e = expander();
        let anchor = ts("2024-02-29T09:00:00Z");
        assert_eq!(
            e.next_occurrence(&RepeatRule::Yearly, anchor, anchor),
            Some(ts("2025-02-28T09:00:00Z"))
        );
    }

    #[test]
    fn test_custom_dates_pick_next_at_configured_time() {
        let e = OccurrenceExpander::new(NaiveTime::from_hms_opt(9, 0, 0).unwrap());
        let rule = RepeatRule::CustomDates {
            dates: vec![
                NaiveDate::from_ymd_opt(2024, 3, 10).unwrap(),
                NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 5, 20).unwrap(),
            ],
        };
        // Unsorted input still yields the earliest remaining date
        assert_eq!(
            e.next_occurrence(&rule, ts("2024-01-15T00:00:00Z"), ts("2024-01-01T00:00:00Z")),
            Some(ts("2024-02-01T09:00:00Z"))
        );
        // A date whose fire time already passed is skipped
        assert_eq!(
            e.next_occurrence(&rule, ts("2024-03-10T09:00:00Z"), ts("2024-01-01T00:00:00Z")),
            Some(ts("2024-05-20T09:00:00Z"))
        );
        // Exhausted set
        assert_eq!(
            e.next_occurrence(&rule, ts("2024-06-01T00:00:00Z"), ts("2024-01-01T00:00:00Z")),
            None
        );
    }

    #[test]
    fn test_empty_custom_dates_is_series_complete() {
        let e = expander();
        assert_eq!(
            e.next_occurrence(
                &RepeatRule::CustomDates { dates: vec![] },
                ts("2024-01-01T00:00:00Z"),
                ts("2024-01-01T00:00:00Z"),
            ),
            None
        );
    }
}
