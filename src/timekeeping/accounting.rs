//! Worked-time arithmetic over entries and breaks.
//!
//! All times are naive local wall-clock values; no time zone is ever applied.
//! Sums are kept unrounded and only rounded when formatted for display.

use chrono::{Datelike, Duration, NaiveDate, NaiveTime, Timelike, Weekday};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::entry::TimeEntry;

/// Daily hours beyond this count as overtime.
pub const DAILY_OVERTIME_THRESHOLD_HOURS: f64 = 8.0;

pub const DAYS_IN_WEEK: i64 = 7;

#[inline]
fn minutes_of_day(t: NaiveTime) -> i64 {
    i64::from(t.hour()) * 60 + i64::from(t.minute())
}

/// Worked minutes for one entry: `out - in` minus each break.
///
/// Breaks are subtracted independently, even when they overlap each other or
/// fall outside the entry span, so the result can be negative. An entry
/// missing either time yields `None`.
pub fn entry_duration_minutes(entry: &TimeEntry) -> Option<i64> {
    let (in_time, out_time) = (entry.in_time?, entry.out_time?);

    let mut duration = minutes_of_day(out_time) - minutes_of_day(in_time);
    for b in &entry.breaks {
        duration -= minutes_of_day(b.end_time) - minutes_of_day(b.start_time);
    }
    Some(duration)
}

/// Minutes spent on break during one entry, each break counted in full.
pub fn break_minutes(entry: &TimeEntry) -> i64 {
    entry
        .breaks
        .iter()
        .map(|b| minutes_of_day(b.end_time) - minutes_of_day(b.start_time))
        .sum()
}

/// Total worked minutes over a set of entries; incomplete entries are skipped.
pub fn total_minutes<'a, I>(entries: I) -> i64
where
    I: IntoIterator<Item = &'a TimeEntry>,
{
    entries.into_iter().filter_map(entry_duration_minutes).sum()
}

/// Hours worked over the entries of a single day. Minutes are summed first
/// and divided once, so a day of whole minutes never drifts past the threshold.
pub fn day_total_hours<'a, I>(entries_for_day: I) -> f64
where
    I: IntoIterator<Item = &'a TimeEntry>,
{
    total_minutes(entries_for_day) as f64 / 60.0
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct HourSplit {
    pub regular: f64,
    pub overtime: f64,
}

pub fn split_regular_overtime(total_hours: f64) -> HourSplit {
    HourSplit {
        regular: total_hours.min(DAILY_OVERTIME_THRESHOLD_HOURS),
        overtime: (total_hours - DAILY_OVERTIME_THRESHOLD_HOURS).max(0.0),
    }
}

/// Inclusive `(start, end)` of the week starting at `week_start`.
pub fn week_range(week_start: NaiveDate) -> (NaiveDate, NaiveDate) {
    (week_start, week_start + Duration::days(DAYS_IN_WEEK - 1))
}

pub fn week_dates(week_start: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    (0..DAYS_IN_WEEK).map(move |i| week_start + Duration::days(i))
}

pub fn is_week_start(date: NaiveDate) -> bool {
    date.weekday() == Weekday::Mon
}

/// Monday of the week containing `date`.
pub fn week_start_of(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

pub fn in_week(week_start: NaiveDate, date: NaiveDate) -> bool {
    let (start, end) = week_range(week_start);
    start <= date && date <= end
}

/// Sum of the seven day totals of the week. Entries dated outside the week
/// contribute nothing.
pub fn week_total_hours(week_start: NaiveDate, entries: &[TimeEntry]) -> f64 {
    week_dates(week_start)
        .map(|d| day_total_hours(entries.iter().filter(|e| e.date == d)))
        .sum()
}

/// Two decimals, the precision used in hour summaries.
pub fn format_hours(hours: f64) -> String {
    format!("{:.2}", hours)
}

/// One decimal with an `h` suffix, the precision used on day chips.
pub fn format_hours_compact(hours: f64) -> String {
    if hours > 0.0 {
        format!("{:.1}h", hours)
    } else {
        "0h".to_string()
    }
}

/// Computed figures for one calendar day of a timesheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DaySummary {
    #[schema(example = "2026-01-05", format = "date", value_type = String)]
    pub date: NaiveDate,
    pub entries: Vec<TimeEntry>,
    #[schema(example = 9.5)]
    pub total_hours: f64,
    #[schema(example = 8.0)]
    pub regular_hours: f64,
    #[schema(example = 1.5)]
    pub overtime_hours: f64,
}

impl DaySummary {
    pub fn build(date: NaiveDate, entries: Vec<TimeEntry>) -> Self {
        let total_hours = day_total_hours(&entries);
        let HourSplit { regular, overtime } = split_regular_overtime(total_hours);
        Self {
            date,
            entries,
            total_hours,
            regular_hours: regular,
            overtime_hours: overtime,
        }
    }
}

/// The seven day summaries of a week plus their sums. Week regular and
/// overtime are sums of the per-day splits; there is no weekly threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct WeekSummary {
    #[schema(example = "2026-01-05", format = "date", value_type = String)]
    pub week_start: NaiveDate,
    pub days: Vec<DaySummary>,
    pub total_hours: f64,
    pub regular_hours: f64,
    pub overtime_hours: f64,
}

impl WeekSummary {
    pub fn build(week_start: NaiveDate, entries: &[TimeEntry]) -> Self {
        let days: Vec<DaySummary> = week_dates(week_start)
            .map(|date| {
                let for_day = entries.iter().filter(|e| e.date == date).cloned().collect();
                DaySummary::build(date, for_day)
            })
            .collect();

        let total_hours = days.iter().map(|d| d.total_hours).sum();
        let regular_hours = days.iter().map(|d| d.regular_hours).sum();
        let overtime_hours = days.iter().map(|d| d.overtime_hours).sum();

        Self {
            week_start,
            days,
            total_hours,
            regular_hours,
            overtime_hours,
        }
    }

    /// Day at `offset` (0 = Monday), the index a day tab selects.
    pub fn day(&self, offset: usize) -> Option<&DaySummary> {
        self.days.get(offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timekeeping::entry::BreakPeriod;

    fn t(s: &str) -> NaiveTime {
        NaiveTime::parse_from_str(s, "%H:%M").unwrap()
    }

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn entry(date: &str, in_t: &str, out_t: &str, breaks: &[(&str, &str)]) -> TimeEntry {
        TimeEntry {
            id: None,
            date: d(date),
            in_time: Some(t(in_t)),
            out_time: Some(t(out_t)),
            breaks: breaks
                .iter()
                .map(|(s, e)| BreakPeriod {
                    start_time: t(s),
                    end_time: t(e),
                })
                .collect(),
            project: None,
            note: None,
        }
    }

    #[test]
    fn full_day_without_breaks_is_480_minutes() {
        let e = entry("2026-01-05", "09:00", "17:00", &[]);
        assert_eq!(entry_duration_minutes(&e), Some(480));
        assert_eq!(day_total_hours([&e]), 8.0);
    }

    #[test]
    fn lunch_break_is_subtracted() {
        let e = entry("2026-01-05", "09:00", "17:00", &[("12:00", "13:00")]);
        assert_eq!(entry_duration_minutes(&e), Some(420));

        let split = split_regular_overtime(day_total_hours([&e]));
        assert_eq!(split, HourSplit { regular: 7.0, overtime: 0.0 });
    }

    #[test]
    fn long_day_splits_into_overtime() {
        let e = entry("2026-01-05", "08:00", "19:00", &[("12:00", "13:00")]);
        assert_eq!(entry_duration_minutes(&e), Some(600));

        let summary = DaySummary::build(e.date, vec![e]);
        assert_eq!(summary.total_hours, 10.0);
        assert_eq!(summary.regular_hours, 8.0);
        assert_eq!(summary.overtime_hours, 2.0);
    }

    #[test]
    fn entries_on_same_day_add_up() {
        let entries = [
            entry("2026-01-05", "09:00", "12:00", &[]),
            entry("2026-01-05", "13:00", "17:00", &[]),
        ];
        assert_eq!(day_total_hours(&entries), 7.0);
    }

    #[test]
    fn exact_eight_hours_over_several_entries_has_no_overtime() {
        let entries = vec![
            entry("2026-01-05", "08:00", "10:04", &[]),
            entry("2026-01-05", "10:10", "12:14", &[]),
            entry("2026-01-05", "13:00", "15:04", &[]),
            entry("2026-01-05", "15:10", "16:58", &[]),
        ];
        assert_eq!(total_minutes(&entries), 480);

        let day = DaySummary::build(d("2026-01-05"), entries.clone());
        assert_eq!(day.total_hours, 8.0);
        assert_eq!(day.regular_hours, 8.0);
        assert_eq!(day.overtime_hours, 0.0);

        let week = WeekSummary::build(d("2026-01-05"), &entries);
        assert_eq!(week.overtime_hours, 0.0);
    }

    #[test]
    fn split_at_threshold_boundaries() {
        assert_eq!(split_regular_overtime(8.0), HourSplit { regular: 8.0, overtime: 0.0 });
        assert_eq!(split_regular_overtime(9.5), HourSplit { regular: 8.0, overtime: 1.5 });
        assert_eq!(split_regular_overtime(0.0), HourSplit { regular: 0.0, overtime: 0.0 });
    }

    #[test]
    fn breaks_are_not_clamped() {
        // Break longer than the entry itself; arithmetic goes negative.
        let e = entry("2026-01-05", "09:00", "10:00", &[("08:00", "11:00")]);
        assert_eq!(entry_duration_minutes(&e), Some(-120));

        // Overlapping breaks are each subtracted in full.
        let e = entry("2026-01-05", "09:00", "17:00", &[("12:00", "13:00"), ("12:30", "13:00")]);
        assert_eq!(entry_duration_minutes(&e), Some(390));
    }

    #[test]
    fn break_consuming_whole_entry_is_zero() {
        let e = entry("2026-01-05", "09:00", "10:00", &[("09:00", "10:00")]);
        assert_eq!(entry_duration_minutes(&e), Some(0));
        assert_eq!(day_total_hours([&e]), 0.0);
    }

    #[test]
    fn incomplete_entry_is_excluded() {
        let mut e = entry("2026-01-05", "09:00", "17:00", &[]);
        e.out_time = None;
        let full = entry("2026-01-05", "09:00", "11:00", &[]);

        assert_eq!(entry_duration_minutes(&e), None);
        assert_eq!(day_total_hours([&e, &full]), 2.0);
    }

    #[test]
    fn week_total_is_sum_of_days_and_days_are_local() {
        let ws = d("2026-01-05");
        let mut entries = vec![
            entry("2026-01-05", "09:00", "17:00", &[]),
            entry("2026-01-06", "09:00", "18:30", &[("12:00", "12:30")]),
            entry("2026-01-11", "10:00", "12:00", &[]),
            // outside the week
            entry("2026-01-12", "09:00", "17:00", &[]),
        ];

        let before = WeekSummary::build(ws, &entries);
        let sum_of_days: f64 = before.days.iter().map(|d| d.total_hours).sum();
        assert_eq!(before.total_hours, 19.0);
        assert_eq!(week_total_hours(ws, &entries), sum_of_days);
        assert_eq!(before.regular_hours, 18.0);
        assert_eq!(before.overtime_hours, 1.0);

        entries[1] = entry("2026-01-06", "09:00", "10:00", &[]);
        let after = WeekSummary::build(ws, &entries);
        for (i, (b, a)) in before.days.iter().zip(&after.days).enumerate() {
            if i == 1 {
                assert_ne!(b.total_hours, a.total_hours);
            } else {
                assert_eq!(b.total_hours, a.total_hours);
            }
        }
    }

    #[test]
    fn aggregate_preserves_entry_sum() {
        let entries = vec![
            entry("2026-01-07", "07:15", "11:40", &[("09:00", "09:10")]),
            entry("2026-01-07", "12:05", "16:50", &[]),
            entry("2026-01-07", "18:00", "19:25", &[("18:30", "18:35")]),
        ];
        let per_entry: i64 = entries.iter().filter_map(entry_duration_minutes).sum();
        let day = day_total_hours(&entries);

        assert_eq!(total_minutes(&entries), per_entry);
        assert!((day * 60.0 - per_entry as f64).abs() < 1e-9);
    }

    #[test]
    fn week_navigation() {
        let wed = d("2026-01-07");
        assert_eq!(week_start_of(wed), d("2026-01-05"));
        assert!(is_week_start(d("2026-01-05")));
        assert!(!is_week_start(wed));
        assert_eq!(week_range(d("2026-01-05")), (d("2026-01-05"), d("2026-01-11")));
        assert!(in_week(d("2026-01-05"), d("2026-01-11")));
        assert!(!in_week(d("2026-01-05"), d("2026-01-12")));
        assert_eq!(week_dates(d("2026-01-05")).count(), 7);
    }

    #[test]
    fn break_minutes_sum_every_break() {
        let e = entry("2026-01-05", "08:00", "19:00", &[("12:00", "13:00"), ("15:00", "15:15")]);
        assert_eq!(break_minutes(&e), 75);
        assert_eq!(entry_duration_minutes(&e), Some(660 - 75));
    }

    #[test]
    fn display_rounding() {
        assert_eq!(format_hours(7.0), "7.00");
        assert_eq!(format_hours(25.0 / 60.0), "0.42");
        assert_eq!(format_hours_compact(7.26), "7.3h");
        assert_eq!(format_hours_compact(0.0), "0h");
    }
}
