use chrono::{DateTime, NaiveDate, Utc};

use crate::timekeeping::Owner;

/// A `timesheets` row joined with its owner's name and client.
#[derive(Debug, sqlx::FromRow)]
pub struct TimesheetRow {
    pub id: u64,
    pub employee_id: u64,
    pub employee_name: String,
    pub owner_client_id: Option<u64>,
    pub week_start: NaiveDate,
    pub status: String,
    pub manager_email: String,
    pub project: Option<String>,
    pub comment: Option<String>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub approved_by: Option<u64>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TimesheetRow {
    pub fn owner(&self) -> Owner {
        Owner {
            employee_id: self.employee_id,
            client_id: self.owner_client_id,
        }
    }
}

pub const TIMESHEET_SELECT: &str = r#"
    SELECT
        t.id, t.employee_id, e.full_name AS employee_name, e.client_id AS owner_client_id,
        t.week_start, t.status, t.manager_email, t.project, t.comment,
        t.submitted_at, t.approved_by, t.approved_at, t.rejected_at, t.rejection_reason,
        t.created_at, t.updated_at
    FROM timesheets t
    JOIN employees e ON e.id = t.employee_id
"#;
