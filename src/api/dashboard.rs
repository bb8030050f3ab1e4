//! Per-role landing summary. Every figure is computed from stored
//! timesheets and time-off requests with the same arithmetic the timesheet
//! endpoints use.

use crate::api::timesheet::load_entries;
use crate::auth::auth::AuthUser;
use crate::error::{ApiError, db_error};
use crate::model::role::Role;
use crate::model::time_off::{TIME_OFF_SELECT, TimeOffRow};
use crate::model::timesheet::{TIMESHEET_SELECT, TimesheetRow};
use crate::timekeeping::accounting::{DaySummary, break_minutes, entry_duration_minutes, week_start_of};
use crate::timekeeping::{TimeOffStatus, TimesheetStatus, WeekSummary};
use actix_web::{HttpResponse, Responder, web};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use utoipa::ToSchema;

const UPCOMING_LIMIT: i64 = 10;

/// Breaks are counted over the same complete entries the worked figure uses.
fn day_hours(day: &DaySummary) -> DayHours {
    let break_total: i64 = day
        .entries
        .iter()
        .filter(|e| entry_duration_minutes(e).is_some())
        .map(break_minutes)
        .sum();
    DayHours {
        date: day.date,
        worked: day.total_hours,
        breaks: break_total as f64 / 60.0,
        overtime: day.overtime_hours,
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DayHours {
    #[schema(format = "date", value_type = String)]
    pub date: NaiveDate,
    pub worked: f64,
    pub breaks: f64,
    pub overtime: f64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TeamDayHours {
    pub employee: String,
    #[schema(format = "date", value_type = String)]
    pub date: NaiveDate,
    pub worked: f64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UpcomingTimeOff {
    pub employee: String,
    #[schema(format = "date", value_type = String)]
    pub start: NaiveDate,
    #[schema(format = "date", value_type = String)]
    pub end: NaiveDate,
    #[serde(rename = "type")]
    pub kind: String,
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PendingApprovals {
    pub timesheets: i64,
    pub time_off: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrgStats {
    pub total_users: i64,
    pub total_timesheets: i64,
    pub pending_timesheets: i64,
    pub hours_this_week: f64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Notification {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
}

/// Sections not relevant to the caller's role are omitted.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DashboardSummary {
    pub user_name: String,
    pub role: Role,
    #[schema(format = "date", value_type = String)]
    pub week_start: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracked_hours: Option<Vec<DayHours>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upcoming_time_off: Option<Vec<UpcomingTimeOff>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_approvals: Option<PendingApprovals>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_tracked_hours: Option<Vec<TeamDayHours>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org_stats: Option<OrgStats>,
    pub notifications: Vec<Notification>,
}

fn notice(kind: &str, message: String) -> Notification {
    Notification {
        kind: kind.to_string(),
        message,
    }
}

fn plural(n: i64, word: &str) -> String {
    if n == 1 {
        format!("{} {}", n, word)
    } else {
        format!("{} {}s", n, word)
    }
}

/// Current-week summaries of the given timesheets, paired with the owner name.
async fn week_summaries(
    pool: &MySqlPool,
    rows: Vec<TimesheetRow>,
) -> Result<Vec<(String, WeekSummary)>, ApiError> {
    let ids: Vec<u64> = rows.iter().map(|r| r.id).collect();
    let mut entries = load_entries(pool, &ids)
        .await
        .map_err(db_error("Failed to load dashboard entries"))?;

    Ok(rows
        .into_iter()
        .map(|row| {
            let for_row = entries.remove(&row.id).unwrap_or_default();
            (row.employee_name, WeekSummary::build(row.week_start, &for_row))
        })
        .collect())
}

fn upcoming(rows: Vec<TimeOffRow>) -> Vec<UpcomingTimeOff> {
    rows.into_iter()
        .map(|r| UpcomingTimeOff {
            employee: r.employee_name,
            start: r.start_date,
            end: r.end_date,
            kind: r.kind,
            status: r.status,
        })
        .collect()
}

async fn consultant_summary(
    pool: &MySqlPool,
    auth: &AuthUser,
    summary: &mut DashboardSummary,
    today: NaiveDate,
) -> Result<(), ApiError> {
    let sql = format!("{} WHERE t.employee_id = ? AND t.week_start = ?", TIMESHEET_SELECT);
    let rows = sqlx::query_as::<_, TimesheetRow>(&sql)
        .bind(auth.employee_id)
        .bind(summary.week_start)
        .fetch_all(pool)
        .await
        .map_err(db_error("Failed to fetch current timesheet"))?;

    let ids: Vec<u64> = rows.iter().map(|r| r.id).collect();
    let entries: Vec<_> = load_entries(pool, &ids)
        .await
        .map_err(db_error("Failed to load dashboard entries"))?
        .into_values()
        .flatten()
        .collect();

    let week = WeekSummary::build(summary.week_start, &entries);
    summary.tracked_hours = Some(week.days.iter().map(day_hours).collect());

    let sql = format!(
        "{} WHERE r.employee_id = ? AND r.end_date >= ? AND r.status <> ? ORDER BY r.start_date LIMIT ?",
        TIME_OFF_SELECT
    );
    let time_off = sqlx::query_as::<_, TimeOffRow>(&sql)
        .bind(auth.employee_id)
        .bind(today)
        .bind(TimeOffStatus::Rejected.as_ref())
        .bind(UPCOMING_LIMIT)
        .fetch_all(pool)
        .await
        .map_err(db_error("Failed to fetch upcoming time off"))?;
    summary.upcoming_time_off = Some(upcoming(time_off));

    let unsubmitted: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM timesheets WHERE employee_id = ? AND status = ? AND week_start < ?",
    )
    .bind(auth.employee_id)
    .bind(TimesheetStatus::Draft.as_ref())
    .bind(summary.week_start)
    .fetch_one(pool)
    .await
    .map_err(db_error("Failed to count draft timesheets"))?;

    if unsubmitted > 0 {
        summary.notifications.push(notice(
            "reminder",
            format!("You have {} not submitted.", plural(unsubmitted, "timesheet")),
        ));
    }
    let rejected: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM timesheets WHERE employee_id = ? AND status = ? AND rejected_at >= ?",
    )
    .bind(auth.employee_id)
    .bind(TimesheetStatus::Rejected.as_ref())
    .bind(summary.week_start)
    .fetch_one(pool)
    .await
    .map_err(db_error("Failed to count rejected timesheets"))?;

    if rejected > 0 {
        summary.notifications.push(notice(
            "rejected",
            format!("{} rejected this week.", plural(rejected, "timesheet")),
        ));
    }
    Ok(())
}

async fn manager_summary(
    pool: &MySqlPool,
    auth: &AuthUser,
    summary: &mut DashboardSummary,
    today: NaiveDate,
) -> Result<(), ApiError> {
    let pending_timesheets: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM timesheets t
        JOIN employees e ON e.id = t.employee_id
        WHERE e.client_id = ? AND t.status = ?
        "#,
    )
    .bind(auth.client_id)
    .bind(TimesheetStatus::Submitted.as_ref())
    .fetch_one(pool)
    .await
    .map_err(db_error("Failed to count pending timesheets"))?;

    let pending_time_off: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM time_off_requests r
        JOIN employees e ON e.id = r.employee_id
        WHERE e.client_id = ? AND r.status = ?
        "#,
    )
    .bind(auth.client_id)
    .bind(TimeOffStatus::Pending.as_ref())
    .fetch_one(pool)
    .await
    .map_err(db_error("Failed to count pending time off"))?;

    summary.pending_approvals = Some(PendingApprovals {
        timesheets: pending_timesheets,
        time_off: pending_time_off,
    });

    let sql = format!("{} WHERE e.client_id = ? AND t.week_start = ?", TIMESHEET_SELECT);
    let rows = sqlx::query_as::<_, TimesheetRow>(&sql)
        .bind(auth.client_id)
        .bind(summary.week_start)
        .fetch_all(pool)
        .await
        .map_err(db_error("Failed to fetch team timesheets"))?;

    let mut team = Vec::new();
    for (employee, week) in week_summaries(pool, rows).await? {
        team.extend(
            week.days
                .into_iter()
                .filter(|day| day.total_hours != 0.0)
                .map(|day| TeamDayHours {
                    employee: employee.clone(),
                    date: day.date,
                    worked: day.total_hours,
                }),
        );
    }
    team.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.employee.cmp(&b.employee)));
    summary.team_tracked_hours = Some(team);

    let sql = format!(
        "{} WHERE e.client_id = ? AND r.end_date >= ? AND r.status = ? ORDER BY r.start_date LIMIT ?",
        TIME_OFF_SELECT
    );
    let time_off = sqlx::query_as::<_, TimeOffRow>(&sql)
        .bind(auth.client_id)
        .bind(today)
        .bind(TimeOffStatus::Approved.as_ref())
        .bind(UPCOMING_LIMIT)
        .fetch_all(pool)
        .await
        .map_err(db_error("Failed to fetch team time off"))?;
    summary.upcoming_time_off = Some(upcoming(time_off));

    if pending_timesheets > 0 {
        summary.notifications.push(notice(
            "pending",
            format!("{} pending your approval.", plural(pending_timesheets, "timesheet")),
        ));
    }
    if pending_time_off > 0 {
        summary.notifications.push(notice(
            "pending",
            format!(
                "{} pending your approval.",
                plural(pending_time_off, "time off request")
            ),
        ));
    }
    Ok(())
}

async fn admin_summary(pool: &MySqlPool, summary: &mut DashboardSummary) -> Result<(), ApiError> {
    let total_users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM employees WHERE is_active")
        .fetch_one(pool)
        .await
        .map_err(db_error("Failed to count employees"))?;

    let total_timesheets: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM timesheets")
        .fetch_one(pool)
        .await
        .map_err(db_error("Failed to count timesheets"))?;

    let pending_timesheets: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM timesheets WHERE status = ?")
            .bind(TimesheetStatus::Submitted.as_ref())
            .fetch_one(pool)
            .await
            .map_err(db_error("Failed to count pending timesheets"))?;

    let sql = format!("{} WHERE t.week_start = ?", TIMESHEET_SELECT);
    let rows = sqlx::query_as::<_, TimesheetRow>(&sql)
        .bind(summary.week_start)
        .fetch_all(pool)
        .await
        .map_err(db_error("Failed to fetch this week's timesheets"))?;

    let hours_this_week = week_summaries(pool, rows)
        .await?
        .iter()
        .map(|(_, week)| week.total_hours)
        .sum();

    summary.org_stats = Some(OrgStats {
        total_users,
        total_timesheets,
        pending_timesheets,
        hours_this_week,
    });
    if pending_timesheets > 0 {
        summary.notifications.push(notice(
            "pending",
            format!("{} awaiting a decision.", plural(pending_timesheets, "timesheet")),
        ));
    }
    Ok(())
}

#[utoipa::path(
    get,
    path = "/api/v1/dashboard/summary",
    responses(
        (status = 200, description = "Summary for the caller's role", body = DashboardSummary),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Dashboard"
)]
pub async fn dashboard_summary(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    let user_name: String = sqlx::query_scalar("SELECT full_name FROM employees WHERE id = ?")
        .bind(auth.employee_id)
        .fetch_optional(pool.get_ref())
        .await
        .map_err(db_error("Failed to fetch user name"))?
        .ok_or_else(|| ApiError::not_found("Employee"))?;

    let today = Utc::now().date_naive();
    let mut summary = DashboardSummary {
        user_name,
        role: auth.role,
        week_start: week_start_of(today),
        tracked_hours: None,
        upcoming_time_off: None,
        pending_approvals: None,
        team_tracked_hours: None,
        org_stats: None,
        notifications: Vec::new(),
    };

    match auth.role {
        Role::Consultant => consultant_summary(pool.get_ref(), &auth, &mut summary, today).await?,
        Role::ClientManager => manager_summary(pool.get_ref(), &auth, &mut summary, today).await?,
        Role::DewAdmin => admin_summary(pool.get_ref(), &mut summary).await?,
    }

    if summary.notifications.is_empty() {
        summary
            .notifications
            .push(notice("system", "All caught up.".to_string()));
    }

    Ok(HttpResponse::Ok().json(summary))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timekeeping::entry::{BreakPeriod, TimeEntry};
    use chrono::NaiveTime;

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn day_breaks_skip_incomplete_entries() {
        let date = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        let lunch = BreakPeriod {
            start_time: hm(12, 0),
            end_time: hm(12, 30),
        };
        let complete = TimeEntry {
            id: Some(1),
            date,
            in_time: Some(hm(9, 0)),
            out_time: Some(hm(17, 0)),
            breaks: vec![lunch],
            project: None,
            note: None,
        };
        let open = TimeEntry {
            id: Some(2),
            out_time: None,
            breaks: vec![BreakPeriod {
                start_time: hm(18, 0),
                end_time: hm(19, 0),
            }],
            ..complete.clone()
        };

        let hours = day_hours(&DaySummary::build(date, vec![complete, open]));
        assert_eq!(hours.worked, 7.5);
        assert_eq!(hours.breaks, 0.5);
        assert_eq!(hours.overtime, 0.0);
    }

    #[test]
    fn plural_wording() {
        assert_eq!(plural(1, "timesheet"), "1 timesheet");
        assert_eq!(plural(3, "time off request"), "3 time off requests");
    }

    #[test]
    fn empty_sections_are_omitted() {
        let summary = DashboardSummary {
            user_name: "Ada".into(),
            role: Role::DewAdmin,
            week_start: NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(),
            tracked_hours: None,
            upcoming_time_off: None,
            pending_approvals: None,
            team_tracked_hours: None,
            org_stats: Some(OrgStats {
                total_users: 4,
                total_timesheets: 9,
                pending_timesheets: 1,
                hours_this_week: 12.5,
            }),
            notifications: vec![],
        };

        let json = serde_json::to_value(&summary).unwrap();
        assert!(json.get("tracked_hours").is_none());
        assert_eq!(json["org_stats"]["hours_this_week"], 12.5);
        assert_eq!(json["role"], "dew_admin");
    }
}
