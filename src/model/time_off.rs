use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::timekeeping::Owner;

#[derive(
    Debug,
    Copy,
    Clone,
    Eq,
    PartialEq,
    Serialize,
    Deserialize,
    ToSchema,
    strum_macros::EnumString,
    strum_macros::AsRefStr,
    strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TimeOffType {
    Vacation,
    Sick,
    Personal,
    Other,
}

#[derive(Debug, sqlx::FromRow)]
pub struct TimeOffRow {
    pub id: u64,
    pub employee_id: u64,
    pub employee_name: String,
    pub owner_client_id: Option<u64>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[sqlx(rename = "type")]
    pub kind: String,
    pub status: String,
    pub comment: Option<String>,
    pub manager_email: Option<String>,
    pub manager_comment: Option<String>,
    pub approved_by: Option<u64>,
    pub approved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TimeOffRow {
    pub fn owner(&self) -> Owner {
        Owner {
            employee_id: self.employee_id,
            client_id: self.owner_client_id,
        }
    }
}

pub const TIME_OFF_SELECT: &str = r#"
    SELECT
        r.id, r.employee_id, e.full_name AS employee_name, e.client_id AS owner_client_id,
        r.start_date, r.end_date, r.type, r.status, r.comment, r.manager_email,
        r.manager_comment, r.approved_by, r.approved_at, r.created_at, r.updated_at
    FROM time_off_requests r
    JOIN employees e ON e.id = r.employee_id
"#;
