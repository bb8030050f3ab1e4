//! Hour arithmetic and status gating shared by the API handlers and the
//! client. Nothing in here performs I/O.

pub mod accounting;
pub mod entry;
pub mod lifecycle;
pub mod validation;

pub use accounting::{
    DAILY_OVERTIME_THRESHOLD_HOURS, DaySummary, HourSplit, WeekSummary, day_total_hours,
    entry_duration_minutes, split_regular_overtime, week_total_hours,
};
pub use entry::{BreakPeriod, NewBreakPeriod, NewTimeEntry, TimeEntry};
pub use lifecycle::{
    Actor, GateError, Owner, TimeOffAction, TimeOffStatus, TimesheetAction, TimesheetStatus,
    authorize_time_off, authorize_timesheet,
};
pub use validation::ValidationError;
