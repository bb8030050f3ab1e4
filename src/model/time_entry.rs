use chrono::{NaiveDate, NaiveTime};

use crate::timekeeping::{BreakPeriod, TimeEntry};

#[derive(Debug, sqlx::FromRow)]
pub struct TimeEntryRow {
    pub id: u64,
    pub timesheet_id: u64,
    pub date: NaiveDate,
    pub in_time: Option<NaiveTime>,
    pub out_time: Option<NaiveTime>,
    pub project: Option<String>,
    pub note: Option<String>,
}

#[derive(Debug, sqlx::FromRow)]
pub struct BreakPeriodRow {
    pub time_entry_id: u64,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

impl TimeEntryRow {
    pub fn into_entry(self, breaks: Vec<BreakPeriod>) -> TimeEntry {
        TimeEntry {
            id: Some(self.id),
            date: self.date,
            in_time: self.in_time,
            out_time: self.out_time,
            breaks,
            project: self.project,
            note: self.note,
        }
    }
}

impl From<BreakPeriodRow> for BreakPeriod {
    fn from(row: BreakPeriodRow) -> Self {
        BreakPeriod {
            start_time: row.start_time,
            end_time: row.end_time,
        }
    }
}
