use chrono::NaiveDate;
use derive_more::Display;

use super::accounting::{in_week, is_week_start, week_range};
use super::entry::NewTimeEntry;
use crate::model::role::Role;

/// Input rejected before anything is stored or sent.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum ValidationError {
    #[display(fmt = "In and Out times are required")]
    MissingTimes,
    #[display(fmt = "Out time must be after In time")]
    OutNotAfterIn,
    #[display(fmt = "All breaks must have start and end times")]
    IncompleteBreak,
    #[display(fmt = "Break end must be after start")]
    BreakEndNotAfterStart,
    #[display(fmt = "week_start must be a Monday, got {}", _0)]
    WeekStartNotMonday(NaiveDate),
    #[display(fmt = "Entry date {} is outside the week {} to {}", date, start, end)]
    DateOutsideWeek {
        date: NaiveDate,
        start: NaiveDate,
        end: NaiveDate,
    },
    #[display(fmt = "start_date cannot be after end_date")]
    InvertedDateRange,
    #[display(fmt = "Client ID is required for this role")]
    ClientRequired,
    #[display(fmt = "Dew Admin should not have a client_id")]
    AdminWithClient,
    #[display(fmt = "{} is required", _0)]
    MissingField(&'static str),
}

impl std::error::Error for ValidationError {}

/// Checks an entry exactly as the add-entry form does: both times present,
/// out strictly after in, and every break complete with end after start.
///
/// Breaks are not checked against the entry span or against each other.
pub fn validate_new_entry(entry: &NewTimeEntry) -> Result<(), ValidationError> {
    let (in_time, out_time) = match (entry.in_time, entry.out_time) {
        (Some(i), Some(o)) => (i, o),
        _ => return Err(ValidationError::MissingTimes),
    };
    if out_time <= in_time {
        return Err(ValidationError::OutNotAfterIn);
    }

    for b in &entry.breaks {
        let (start, end) = match (b.start_time, b.end_time) {
            (Some(s), Some(e)) => (s, e),
            _ => return Err(ValidationError::IncompleteBreak),
        };
        if end <= start {
            return Err(ValidationError::BreakEndNotAfterStart);
        }
    }
    Ok(())
}

pub fn validate_week_start(week_start: NaiveDate) -> Result<(), ValidationError> {
    if is_week_start(week_start) {
        Ok(())
    } else {
        Err(ValidationError::WeekStartNotMonday(week_start))
    }
}

/// Entry validation plus the week-membership check done when the entry is
/// attached to a timesheet.
pub fn validate_entry_for_week(
    entry: &NewTimeEntry,
    week_start: NaiveDate,
) -> Result<(), ValidationError> {
    validate_new_entry(entry)?;
    if !in_week(week_start, entry.date) {
        let (start, end) = week_range(week_start);
        return Err(ValidationError::DateOutsideWeek {
            date: entry.date,
            start,
            end,
        });
    }
    Ok(())
}

pub fn validate_date_range(start: NaiveDate, end: NaiveDate) -> Result<(), ValidationError> {
    if start > end {
        return Err(ValidationError::InvertedDateRange);
    }
    Ok(())
}

pub fn validate_role_client(role: Role, client_id: Option<u64>) -> Result<(), ValidationError> {
    match (role.requires_client(), client_id) {
        (true, None) => Err(ValidationError::ClientRequired),
        (false, Some(_)) => Err(ValidationError::AdminWithClient),
        _ => Ok(()),
    }
}

pub fn require_text(value: &str, field: &'static str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::MissingField(field));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timekeeping::entry::NewBreakPeriod;
    use chrono::NaiveTime;

    fn t(s: &str) -> Option<NaiveTime> {
        NaiveTime::parse_from_str(s, "%H:%M").ok()
    }

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn new_entry(date: &str, in_t: &str, out_t: &str) -> NewTimeEntry {
        NewTimeEntry {
            date: d(date),
            in_time: t(in_t),
            out_time: t(out_t),
            breaks: vec![],
            project: None,
            note: None,
        }
    }

    #[test]
    fn accepts_ordinary_entry() {
        let mut e = new_entry("2026-01-06", "09:00", "17:00");
        e.breaks.push(NewBreakPeriod {
            start_time: t("12:00"),
            end_time: t("13:00"),
        });
        assert_eq!(validate_entry_for_week(&e, d("2026-01-05")), Ok(()));
    }

    #[test]
    fn rejects_missing_and_inverted_times() {
        let e = new_entry("2026-01-06", "", "17:00");
        assert_eq!(validate_new_entry(&e), Err(ValidationError::MissingTimes));

        let e = new_entry("2026-01-06", "17:00", "17:00");
        assert_eq!(validate_new_entry(&e), Err(ValidationError::OutNotAfterIn));
    }

    #[test]
    fn rejects_bad_breaks() {
        let mut e = new_entry("2026-01-06", "09:00", "17:00");
        e.breaks.push(NewBreakPeriod {
            start_time: t("12:00"),
            end_time: None,
        });
        assert_eq!(validate_new_entry(&e), Err(ValidationError::IncompleteBreak));

        e.breaks[0].end_time = t("11:00");
        assert_eq!(validate_new_entry(&e), Err(ValidationError::BreakEndNotAfterStart));
    }

    #[test]
    fn break_outside_entry_span_is_accepted() {
        let mut e = new_entry("2026-01-06", "09:00", "10:00");
        e.breaks.push(NewBreakPeriod {
            start_time: t("18:00"),
            end_time: t("19:00"),
        });
        assert_eq!(validate_new_entry(&e), Ok(()));
    }

    #[test]
    fn week_bounds_are_inclusive() {
        let ws = d("2026-01-05");
        assert!(validate_entry_for_week(&new_entry("2026-01-11", "09:00", "10:00"), ws).is_ok());
        assert!(matches!(
            validate_entry_for_week(&new_entry("2026-01-12", "09:00", "10:00"), ws),
            Err(ValidationError::DateOutsideWeek { .. })
        ));
        assert!(validate_week_start(d("2026-01-06")).is_err());
    }

    #[test]
    fn role_client_combinations() {
        assert_eq!(validate_role_client(Role::Consultant, Some(1)), Ok(()));
        assert_eq!(validate_role_client(Role::ClientManager, None), Err(ValidationError::ClientRequired));
        assert_eq!(validate_role_client(Role::DewAdmin, Some(1)), Err(ValidationError::AdminWithClient));
        assert_eq!(validate_role_client(Role::DewAdmin, None), Ok(()));
    }

    #[test]
    fn date_range_may_be_single_day() {
        assert!(validate_date_range(d("2026-02-02"), d("2026-02-02")).is_ok());
        assert_eq!(
            validate_date_range(d("2026-02-03"), d("2026-02-02")),
            Err(ValidationError::InvertedDateRange)
        );
    }
}
