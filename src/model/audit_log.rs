#[derive(Debug, Copy, Clone, Eq, PartialEq, strum_macros::AsRefStr, strum_macros::Display)]
#[strum(serialize_all = "snake_case")]
pub enum AuditEvent {
    TimesheetCreated,
    TimesheetUpdated,
    TimesheetDeleted,
    TimesheetSubmitted,
    TimesheetApproved,
    TimesheetRejected,
    TimeEntryAdded,
    TimeEntryDeleted,

    EmployeeCreated,
    EmployeeUpdated,
    EmployeeDeleted,

    ClientCreated,
    ClientUpdated,
    ClientDeleted,

    UserLogin,
    UserLogout,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_are_stored_in_snake_case() {
        assert_eq!(AuditEvent::TimesheetSubmitted.as_ref(), "timesheet_submitted");
        assert_eq!(AuditEvent::TimeEntryAdded.to_string(), "time_entry_added");
    }
}
