use std::collections::HashMap;

use crate::auth::auth::AuthUser;
use crate::error::{ApiError, db_error, is_constraint_violation};
use crate::model::audit_log::AuditEvent;
use crate::model::role::Role;
use crate::model::time_entry::{BreakPeriodRow, TimeEntryRow};
use crate::model::timesheet::{TIMESHEET_SELECT, TimesheetRow};
use crate::timekeeping::accounting::week_range;
use crate::timekeeping::lifecycle::action_for_target;
use crate::timekeeping::validation::{require_text, validate_entry_for_week, validate_week_start};
use crate::timekeeping::{
    BreakPeriod, NewTimeEntry, TimeEntry, TimesheetAction, TimesheetStatus, ValidationError,
    WeekSummary, authorize_timesheet,
};
use crate::utils::audit;
use actix_web::{HttpResponse, Responder, web};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::{MySql, MySqlPool, QueryBuilder};
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, Serialize, ToSchema)]
pub struct CreateTimesheet {
    #[schema(example = "2026-01-05", format = "date", value_type = String)]
    pub week_start: NaiveDate,
    #[schema(example = "manager@google.com")]
    pub manager_email: String,
    #[schema(example = "Search Infra", nullable = true)]
    pub project: Option<String>,
    #[schema(nullable = true)]
    pub comment: Option<String>,
}

/// Either a metadata edit (draft only) or a status change. When `status` is
/// present the other fields are ignored, except that `rejection_reason` (or
/// `comment`) is recorded on a rejection.
#[derive(Deserialize, Serialize, Default, ToSchema)]
pub struct UpdateTimesheet {
    pub status: Option<TimesheetStatus>,
    pub manager_email: Option<String>,
    pub project: Option<String>,
    pub comment: Option<String>,
    pub rejection_reason: Option<String>,
}

/// Optional body for reject endpoints.
#[derive(Deserialize, Serialize, Default, ToSchema)]
pub struct DecisionRequest {
    #[serde(default, alias = "rejection_reason", alias = "manager_comment")]
    #[schema(example = "Missing Friday")]
    pub reason: Option<String>,
}

#[derive(Deserialize, Serialize, Default, IntoParams, ToSchema)]
pub struct TimesheetFilter {
    /// Only timesheets of this employee
    #[schema(example = 7)]
    pub employee_id: Option<u64>,
    /// Only timesheets in this status
    pub status: Option<TimesheetStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TimesheetResponse {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = 7)]
    pub employee_id: u64,
    #[schema(example = "Jane Doe")]
    pub employee_name: String,
    #[schema(nullable = true)]
    pub client_id: Option<u64>,
    #[schema(example = "2026-01-05", format = "date", value_type = String)]
    pub week_start: NaiveDate,
    #[schema(example = "2026-01-11", format = "date", value_type = String)]
    pub week_end: NaiveDate,
    pub status: TimesheetStatus,
    pub manager_email: String,
    pub project: Option<String>,
    pub comment: Option<String>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub submitted_at: Option<DateTime<Utc>>,
    pub approved_by: Option<u64>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub approved_at: Option<DateTime<Utc>>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub rejected_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
    #[schema(value_type = String, format = "date-time")]
    pub updated_at: DateTime<Utc>,
    pub time_entries: Vec<TimeEntry>,
    #[schema(example = 40.0)]
    pub regular_hours: f64,
    #[schema(example = 2.5)]
    pub overtime_hours: f64,
    #[schema(example = 42.5)]
    pub total_hours: f64,
}

impl TimesheetResponse {
    fn build(row: TimesheetRow, time_entries: Vec<TimeEntry>) -> Result<Self, ApiError> {
        let status: TimesheetStatus = row.status.parse()?;
        let summary = WeekSummary::build(row.week_start, &time_entries);
        let (_, week_end) = week_range(row.week_start);

        Ok(Self {
            id: row.id,
            employee_id: row.employee_id,
            employee_name: row.employee_name,
            client_id: row.owner_client_id,
            week_start: row.week_start,
            week_end,
            status,
            manager_email: row.manager_email,
            project: row.project,
            comment: row.comment,
            submitted_at: row.submitted_at,
            approved_by: row.approved_by,
            approved_at: row.approved_at,
            rejected_at: row.rejected_at,
            rejection_reason: row.rejection_reason,
            created_at: row.created_at,
            updated_at: row.updated_at,
            time_entries,
            regular_hours: summary.regular_hours,
            overtime_hours: summary.overtime_hours,
            total_hours: summary.total_hours,
        })
    }
}

/* =========================
Storage helpers
========================= */

async fn fetch_timesheet(pool: &MySqlPool, timesheet_id: u64) -> Result<TimesheetRow, ApiError> {
    let sql = format!("{} WHERE t.id = ?", TIMESHEET_SELECT);

    sqlx::query_as::<_, TimesheetRow>(&sql)
        .bind(timesheet_id)
        .fetch_optional(pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, timesheet_id, "Failed to fetch timesheet");
            ApiError::Internal
        })?
        .ok_or_else(|| ApiError::not_found("Timesheet"))
}

/// Entries (with their breaks) of the given timesheets, keyed by timesheet
/// id and ordered by date then clock-in.
pub(crate) async fn load_entries(
    pool: &MySqlPool,
    timesheet_ids: &[u64],
) -> Result<HashMap<u64, Vec<TimeEntry>>, sqlx::Error> {
    if timesheet_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let mut qb = QueryBuilder::<MySql>::new(
        "SELECT id, timesheet_id, date, in_time, out_time, project, note \
         FROM time_entries WHERE timesheet_id IN (",
    );
    let mut ids = qb.separated(", ");
    for id in timesheet_ids {
        ids.push_bind(*id);
    }
    ids.push_unseparated(") ORDER BY date, in_time, id");
    let rows: Vec<TimeEntryRow> = qb.build_query_as().fetch_all(pool).await?;

    let mut breaks: HashMap<u64, Vec<BreakPeriod>> = HashMap::new();
    if !rows.is_empty() {
        let mut qb = QueryBuilder::<MySql>::new(
            "SELECT time_entry_id, start_time, end_time \
             FROM break_periods WHERE time_entry_id IN (",
        );
        let mut ids = qb.separated(", ");
        for row in &rows {
            ids.push_bind(row.id);
        }
        ids.push_unseparated(") ORDER BY start_time, id");

        for b in qb.build_query_as::<BreakPeriodRow>().fetch_all(pool).await? {
            breaks.entry(b.time_entry_id).or_default().push(b.into());
        }
    }

    let mut by_timesheet: HashMap<u64, Vec<TimeEntry>> = HashMap::new();
    for row in rows {
        let entry_breaks = breaks.remove(&row.id).unwrap_or_default();
        by_timesheet
            .entry(row.timesheet_id)
            .or_default()
            .push(row.into_entry(entry_breaks));
    }
    Ok(by_timesheet)
}

async fn respond_with(pool: &MySqlPool, row: TimesheetRow) -> Result<TimesheetResponse, ApiError> {
    let mut entries = load_entries(pool, &[row.id])
        .await
        .map_err(db_error("Failed to load time entries"))?;
    let for_row = entries.remove(&row.id).unwrap_or_default();
    TimesheetResponse::build(row, for_row)
}

async fn reload(pool: &MySqlPool, timesheet_id: u64) -> Result<TimesheetResponse, ApiError> {
    let row = fetch_timesheet(pool, timesheet_id).await?;
    respond_with(pool, row).await
}

/// Runs a status transition through the gate, then applies it with an
/// `UPDATE` guarded on the expected current status so that of two racing
/// identical requests only one changes the row.
async fn apply_transition(
    pool: &MySqlPool,
    auth: &AuthUser,
    timesheet_id: u64,
    action: TimesheetAction,
    reason: Option<String>,
) -> Result<TimesheetResponse, ApiError> {
    let row = fetch_timesheet(pool, timesheet_id).await?;
    let current: TimesheetStatus = row.status.parse()?;

    let next = authorize_timesheet(action, current, &auth.actor(), &row.owner())?
        .ok_or_else(|| ApiError::BadRequest(format!("Cannot {} via a status change", action)))?;
    let expected = action.required_status();

    let result = match action {
        TimesheetAction::Submit => {
            sqlx::query(
                r#"
                UPDATE timesheets
                SET status = ?, submitted_at = UTC_TIMESTAMP(), updated_at = UTC_TIMESTAMP()
                WHERE id = ? AND status = ?
                "#,
            )
            .bind(next.as_ref())
            .bind(timesheet_id)
            .bind(expected.as_ref())
            .execute(pool)
            .await
        }
        TimesheetAction::Approve => {
            sqlx::query(
                r#"
                UPDATE timesheets
                SET status = ?, approved_by = ?, approved_at = UTC_TIMESTAMP(),
                    updated_at = UTC_TIMESTAMP()
                WHERE id = ? AND status = ?
                "#,
            )
            .bind(next.as_ref())
            .bind(auth.employee_id)
            .bind(timesheet_id)
            .bind(expected.as_ref())
            .execute(pool)
            .await
        }
        _ => {
            sqlx::query(
                r#"
                UPDATE timesheets
                SET status = ?, rejected_at = UTC_TIMESTAMP(), rejection_reason = ?,
                    updated_at = UTC_TIMESTAMP()
                WHERE id = ? AND status = ?
                "#,
            )
            .bind(next.as_ref())
            .bind(reason.as_deref())
            .bind(timesheet_id)
            .bind(expected.as_ref())
            .execute(pool)
            .await
        }
    }
    .map_err(|e| {
        tracing::error!(error = %e, timesheet_id, action = %action, "Timesheet transition failed");
        ApiError::Internal
    })?;

    if result.rows_affected() == 0 {
        return Err(ApiError::BadRequest(format!(
            "Timesheet is no longer {}",
            expected
        )));
    }

    let event = match action {
        TimesheetAction::Submit => AuditEvent::TimesheetSubmitted,
        TimesheetAction::Approve => AuditEvent::TimesheetApproved,
        _ => AuditEvent::TimesheetRejected,
    };
    audit::record(
        pool,
        event,
        Some(timesheet_id),
        auth,
        json!({ "from": current, "to": next, "reason": reason }),
    )
    .await;

    tracing::info!(timesheet_id, from = %current, to = %next, actor = auth.employee_id, "Timesheet status changed");

    reload(pool, timesheet_id).await
}

/* =========================
List timesheets
========================= */
/// Consultants see their own timesheets, managers those of their client's
/// employees, admins everything.
#[utoipa::path(
    get,
    path = "/api/v1/timesheets",
    params(TimesheetFilter),
    responses(
        (status = 200, description = "Timesheets visible to the caller", body = [TimesheetResponse]),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Timesheets"
)]
pub async fn list_timesheets(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<TimesheetFilter>,
) -> actix_web::Result<impl Responder> {
    let mut qb = QueryBuilder::<MySql>::new(TIMESHEET_SELECT);
    qb.push(" WHERE 1=1");

    match auth.role {
        Role::Consultant => {
            qb.push(" AND t.employee_id = ").push_bind(auth.employee_id);
        }
        Role::ClientManager => {
            qb.push(" AND e.client_id = ").push_bind(auth.client_id);
        }
        Role::DewAdmin => {}
    }

    if let Some(employee_id) = query.employee_id {
        qb.push(" AND t.employee_id = ").push_bind(employee_id);
    }
    if let Some(status) = query.status {
        qb.push(" AND t.status = ").push_bind(status.to_string());
    }
    qb.push(" ORDER BY t.week_start DESC, t.id DESC");

    let rows: Vec<TimesheetRow> = qb
        .build_query_as()
        .fetch_all(pool.get_ref())
        .await
        .map_err(db_error("Failed to list timesheets"))?;

    let ids: Vec<u64> = rows.iter().map(|r| r.id).collect();
    let mut entries = load_entries(pool.get_ref(), &ids)
        .await
        .map_err(db_error("Failed to load time entries"))?;

    let data = rows
        .into_iter()
        .map(|row| {
            let for_row = entries.remove(&row.id).unwrap_or_default();
            TimesheetResponse::build(row, for_row)
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(HttpResponse::Ok().json(data))
}

/* =========================
Create timesheet
========================= */
#[utoipa::path(
    post,
    path = "/api/v1/timesheets",
    request_body = CreateTimesheet,
    responses(
        (status = 201, description = "Draft timesheet created", body = TimesheetResponse),
        (status = 400, description = "week_start is not a Monday or manager_email is blank"),
        (status = 403, description = "Only consultants can create timesheets"),
        (status = 409, description = "A timesheet already exists for this week")
    ),
    security(("bearer_auth" = [])),
    tag = "Timesheets"
)]
pub async fn create_timesheet(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateTimesheet>,
) -> actix_web::Result<impl Responder> {
    auth.require_consultant("create timesheets")?;

    let payload = payload.into_inner();
    validate_week_start(payload.week_start).map_err(ApiError::from)?;
    require_text(&payload.manager_email, "manager_email").map_err(ApiError::from)?;

    let result = sqlx::query(
        r#"
        INSERT INTO timesheets (employee_id, week_start, status, manager_email, project, comment)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(auth.employee_id)
    .bind(payload.week_start)
    .bind(TimesheetStatus::Draft.as_ref())
    .bind(payload.manager_email.trim())
    .bind(&payload.project)
    .bind(&payload.comment)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        if is_constraint_violation(&e) {
            return ApiError::Conflict(format!(
                "A timesheet already exists for the week of {}",
                payload.week_start
            ));
        }
        tracing::error!(error = %e, employee_id = auth.employee_id, "Failed to create timesheet");
        ApiError::Internal
    })?;

    let timesheet_id = result.last_insert_id();
    audit::record(
        pool.get_ref(),
        AuditEvent::TimesheetCreated,
        Some(timesheet_id),
        &auth,
        json!({ "week_start": payload.week_start }),
    )
    .await;

    let body = reload(pool.get_ref(), timesheet_id).await?;
    Ok(HttpResponse::Created().json(body))
}

/* =========================
Get timesheet
========================= */
#[utoipa::path(
    get,
    path = "/api/v1/timesheets/{id}",
    params(("id" = u64, Path, description = "Timesheet id")),
    responses(
        (status = 200, description = "Timesheet with entries and hour totals", body = TimesheetResponse),
        (status = 403, description = "Not authorized"),
        (status = 404, description = "Timesheet not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Timesheets"
)]
pub async fn get_timesheet(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let row = fetch_timesheet(pool.get_ref(), path.into_inner()).await?;
    if !auth.actor().can_view(&row.owner()) {
        return Err(ApiError::not_authorized().into());
    }

    let body = respond_with(pool.get_ref(), row).await?;
    Ok(HttpResponse::Ok().json(body))
}

/* =========================
Update timesheet
========================= */
#[utoipa::path(
    put,
    path = "/api/v1/timesheets/{id}",
    params(("id" = u64, Path, description = "Timesheet id")),
    request_body = UpdateTimesheet,
    responses(
        (status = 200, description = "Updated timesheet", body = TimesheetResponse),
        (status = 400, description = "Transition not allowed from the current status"),
        (status = 403, description = "Not authorized"),
        (status = 404, description = "Timesheet not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Timesheets"
)]
pub async fn update_timesheet(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<UpdateTimesheet>,
) -> actix_web::Result<impl Responder> {
    let timesheet_id = path.into_inner();
    let payload = payload.into_inner();

    if let Some(target) = payload.status {
        let action = action_for_target(target).ok_or_else(|| {
            ApiError::BadRequest("A timesheet cannot be moved back to draft".into())
        })?;
        let reason = payload.rejection_reason.or(payload.comment);
        let body = apply_transition(pool.get_ref(), &auth, timesheet_id, action, reason).await?;
        return Ok(HttpResponse::Ok().json(body));
    }

    let row = fetch_timesheet(pool.get_ref(), timesheet_id).await?;
    let status: TimesheetStatus = row.status.parse().map_err(ApiError::from)?;
    authorize_timesheet(TimesheetAction::Edit, status, &auth.actor(), &row.owner())
        .map_err(ApiError::from)?;

    if let Some(email) = &payload.manager_email {
        require_text(email, "manager_email").map_err(ApiError::from)?;
    }

    sqlx::query(
        r#"
        UPDATE timesheets
        SET manager_email = COALESCE(?, manager_email),
            project = COALESCE(?, project),
            comment = COALESCE(?, comment),
            updated_at = UTC_TIMESTAMP()
        WHERE id = ? AND status = ?
        "#,
    )
    .bind(payload.manager_email.as_deref().map(str::trim))
    .bind(&payload.project)
    .bind(&payload.comment)
    .bind(timesheet_id)
    .bind(TimesheetStatus::Draft.as_ref())
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, timesheet_id, "Failed to update timesheet");
        ApiError::Internal
    })?;

    let body = reload(pool.get_ref(), timesheet_id).await?;
    if body.status != TimesheetStatus::Draft {
        return Err(ApiError::BadRequest(format!("Cannot edit a {} timesheet", body.status)).into());
    }

    audit::record(
        pool.get_ref(),
        AuditEvent::TimesheetUpdated,
        Some(timesheet_id),
        &auth,
        json!({
            "manager_email": payload.manager_email,
            "project": payload.project,
            "comment": payload.comment,
        }),
    )
    .await;

    Ok(HttpResponse::Ok().json(body))
}

/* =========================
Delete timesheet
========================= */
#[utoipa::path(
    delete,
    path = "/api/v1/timesheets/{id}",
    params(("id" = u64, Path, description = "Timesheet id")),
    responses(
        (status = 204, description = "Timesheet and its entries deleted"),
        (status = 400, description = "Only draft timesheets can be deleted"),
        (status = 403, description = "Not authorized"),
        (status = 404, description = "Timesheet not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Timesheets"
)]
pub async fn delete_timesheet(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let timesheet_id = path.into_inner();
    let row = fetch_timesheet(pool.get_ref(), timesheet_id).await?;
    let status: TimesheetStatus = row.status.parse().map_err(ApiError::from)?;
    authorize_timesheet(TimesheetAction::Delete, status, &auth.actor(), &row.owner())
        .map_err(ApiError::from)?;

    let result = sqlx::query("DELETE FROM timesheets WHERE id = ? AND status = ?")
        .bind(timesheet_id)
        .bind(TimesheetStatus::Draft.as_ref())
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, timesheet_id, "Failed to delete timesheet");
            ApiError::Internal
        })?;

    if result.rows_affected() == 0 {
        return Err(ApiError::BadRequest("Timesheet is no longer a draft".into()).into());
    }

    audit::record(
        pool.get_ref(),
        AuditEvent::TimesheetDeleted,
        None,
        &auth,
        json!({ "timesheet_id": timesheet_id, "week_start": row.week_start }),
    )
    .await;

    Ok(HttpResponse::NoContent().finish())
}

/* =========================
Time entries
========================= */
#[utoipa::path(
    post,
    path = "/api/v1/timesheets/{id}/entries",
    params(("id" = u64, Path, description = "Timesheet id")),
    request_body = NewTimeEntry,
    responses(
        (status = 201, description = "Entry added; returns the refreshed timesheet", body = TimesheetResponse),
        (status = 400, description = "Invalid times, date outside the week, or timesheet not in draft"),
        (status = 403, description = "Not authorized"),
        (status = 404, description = "Timesheet not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Timesheets"
)]
pub async fn add_entry(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<NewTimeEntry>,
) -> actix_web::Result<impl Responder> {
    let timesheet_id = path.into_inner();
    let payload = payload.into_inner();

    let mut tx = pool
        .begin()
        .await
        .map_err(db_error("Failed to start transaction"))?;

    // Lock the timesheet so a concurrent submit waits for this insert.
    let sql = format!("{} WHERE t.id = ? FOR UPDATE", TIMESHEET_SELECT);
    let row = sqlx::query_as::<_, TimesheetRow>(&sql)
        .bind(timesheet_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_error("Failed to lock timesheet"))?
        .ok_or_else(|| ApiError::not_found("Timesheet"))?;

    let status: TimesheetStatus = row.status.parse().map_err(ApiError::from)?;
    authorize_timesheet(TimesheetAction::AddEntry, status, &auth.actor(), &row.owner())
        .map_err(ApiError::from)?;
    validate_entry_for_week(&payload, row.week_start).map_err(ApiError::from)?;

    let entry = payload
        .into_entry()
        .ok_or(ApiError::from(ValidationError::MissingTimes))?;

    let entry_id = sqlx::query(
        r#"
        INSERT INTO time_entries (timesheet_id, date, in_time, out_time, project, note)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(timesheet_id)
    .bind(entry.date)
    .bind(entry.in_time)
    .bind(entry.out_time)
    .bind(&entry.project)
    .bind(&entry.note)
    .execute(&mut *tx)
    .await
    .map_err(|e| {
        tracing::error!(error = %e, timesheet_id, "Failed to insert time entry");
        ApiError::Internal
    })?
    .last_insert_id();

    for b in &entry.breaks {
        sqlx::query(
            "INSERT INTO break_periods (time_entry_id, start_time, end_time) VALUES (?, ?, ?)",
        )
        .bind(entry_id)
        .bind(b.start_time)
        .bind(b.end_time)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, entry_id, "Failed to insert break period");
            ApiError::Internal
        })?;
    }

    sqlx::query("UPDATE timesheets SET updated_at = UTC_TIMESTAMP() WHERE id = ?")
        .bind(timesheet_id)
        .execute(&mut *tx)
        .await
        .map_err(db_error("Failed to touch timesheet"))?;

    tx.commit()
        .await
        .map_err(db_error("Failed to commit time entry"))?;

    audit::record(
        pool.get_ref(),
        AuditEvent::TimeEntryAdded,
        Some(timesheet_id),
        &auth,
        json!({ "entry_id": entry_id, "date": entry.date }),
    )
    .await;

    let body = reload(pool.get_ref(), timesheet_id).await?;
    Ok(HttpResponse::Created().json(body))
}

#[utoipa::path(
    delete,
    path = "/api/v1/timesheets/{id}/entries/{entry_id}",
    params(
        ("id" = u64, Path, description = "Timesheet id"),
        ("entry_id" = u64, Path, description = "Time entry id")
    ),
    responses(
        (status = 200, description = "Entry removed; returns the refreshed timesheet", body = TimesheetResponse),
        (status = 400, description = "Timesheet not in draft"),
        (status = 403, description = "Not authorized"),
        (status = 404, description = "Timesheet or entry not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Timesheets"
)]
pub async fn delete_entry(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<(u64, u64)>,
) -> actix_web::Result<impl Responder> {
    let (timesheet_id, entry_id) = path.into_inner();

    let row = fetch_timesheet(pool.get_ref(), timesheet_id).await?;
    let status: TimesheetStatus = row.status.parse().map_err(ApiError::from)?;
    authorize_timesheet(TimesheetAction::DeleteEntry, status, &auth.actor(), &row.owner())
        .map_err(ApiError::from)?;

    // Breaks go with the entry through ON DELETE CASCADE.
    let result = sqlx::query(
        r#"
        DELETE te FROM time_entries te
        JOIN timesheets t ON t.id = te.timesheet_id
        WHERE te.id = ? AND te.timesheet_id = ? AND t.status = ?
        "#,
    )
    .bind(entry_id)
    .bind(timesheet_id)
    .bind(TimesheetStatus::Draft.as_ref())
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, timesheet_id, entry_id, "Failed to delete time entry");
        ApiError::Internal
    })?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Time entry").into());
    }

    audit::record(
        pool.get_ref(),
        AuditEvent::TimeEntryDeleted,
        Some(timesheet_id),
        &auth,
        json!({ "entry_id": entry_id }),
    )
    .await;

    let body = reload(pool.get_ref(), timesheet_id).await?;
    Ok(HttpResponse::Ok().json(body))
}

/* =========================
Submit / approve / reject
========================= */
#[utoipa::path(
    post,
    path = "/api/v1/timesheets/{id}/submit",
    params(("id" = u64, Path, description = "Timesheet id")),
    responses(
        (status = 200, description = "Timesheet submitted", body = TimesheetResponse),
        (status = 400, description = "Timesheet is not a draft"),
        (status = 403, description = "Only the owner can submit"),
        (status = 404, description = "Timesheet not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Timesheets"
)]
pub async fn submit_timesheet(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let body = apply_transition(
        pool.get_ref(),
        &auth,
        path.into_inner(),
        TimesheetAction::Submit,
        None,
    )
    .await?;
    Ok(HttpResponse::Ok().json(body))
}

#[utoipa::path(
    post,
    path = "/api/v1/timesheets/{id}/approve",
    params(("id" = u64, Path, description = "Timesheet id")),
    responses(
        (status = 200, description = "Timesheet approved", body = TimesheetResponse),
        (status = 400, description = "Timesheet is not submitted"),
        (status = 403, description = "Not a manager of the owner's client"),
        (status = 404, description = "Timesheet not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Timesheets"
)]
pub async fn approve_timesheet(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let body = apply_transition(
        pool.get_ref(),
        &auth,
        path.into_inner(),
        TimesheetAction::Approve,
        None,
    )
    .await?;
    Ok(HttpResponse::Ok().json(body))
}

#[utoipa::path(
    post,
    path = "/api/v1/timesheets/{id}/reject",
    params(("id" = u64, Path, description = "Timesheet id")),
    request_body(content = DecisionRequest, description = "Optional rejection reason"),
    responses(
        (status = 200, description = "Timesheet rejected", body = TimesheetResponse),
        (status = 400, description = "Timesheet is not submitted"),
        (status = 403, description = "Not a manager of the owner's client"),
        (status = 404, description = "Timesheet not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Timesheets"
)]
pub async fn reject_timesheet(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: Option<web::Json<DecisionRequest>>,
) -> actix_web::Result<impl Responder> {
    let reason = payload.and_then(|p| p.into_inner().reason);
    let body = apply_transition(
        pool.get_ref(),
        &auth,
        path.into_inner(),
        TimesheetAction::Reject,
        reason,
    )
    .await?;
    Ok(HttpResponse::Ok().json(body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn row(status: &str) -> TimesheetRow {
        let ts = DateTime::parse_from_rfc3339("2026-01-05T08:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        TimesheetRow {
            id: 11,
            employee_id: 7,
            employee_name: "Jane Doe".into(),
            owner_client_id: Some(1),
            week_start: NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(),
            status: status.into(),
            manager_email: "boss@client.com".into(),
            project: None,
            comment: None,
            submitted_at: None,
            approved_by: None,
            approved_at: None,
            rejected_at: None,
            rejection_reason: None,
            created_at: ts,
            updated_at: ts,
        }
    }

    fn entry(day: u32, from: &str, to: &str) -> TimeEntry {
        TimeEntry {
            id: None,
            date: NaiveDate::from_ymd_opt(2026, 1, day).unwrap(),
            in_time: NaiveTime::parse_from_str(from, "%H:%M").ok(),
            out_time: NaiveTime::parse_from_str(to, "%H:%M").ok(),
            breaks: vec![],
            project: None,
            note: None,
        }
    }

    #[test]
    fn response_carries_week_figures() {
        let entries = vec![entry(5, "08:00", "19:00"), entry(6, "09:00", "17:00")];
        let resp = TimesheetResponse::build(row("draft"), entries).unwrap();

        assert_eq!(resp.status, TimesheetStatus::Draft);
        assert_eq!(resp.week_end, NaiveDate::from_ymd_opt(2026, 1, 11).unwrap());
        assert_eq!(resp.total_hours, 19.0);
        assert_eq!(resp.regular_hours, 16.0);
        assert_eq!(resp.overtime_hours, 3.0);
    }

    #[test]
    fn unknown_stored_status_is_an_internal_error() {
        let err = TimesheetResponse::build(row("archived"), vec![]).err().unwrap();
        assert!(matches!(err, ApiError::Internal));
    }

    #[test]
    fn reject_body_accepts_either_reason_key() {
        let a: DecisionRequest = serde_json::from_str(r#"{"reason":"late"}"#).unwrap();
        let b: DecisionRequest = serde_json::from_str(r#"{"rejection_reason":"late"}"#).unwrap();
        let c: DecisionRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(a.reason.as_deref(), Some("late"));
        assert_eq!(b.reason.as_deref(), Some("late"));
        assert!(c.reason.is_none());
    }

    #[test]
    fn update_payload_with_status_only() {
        let u: UpdateTimesheet = serde_json::from_str(r#"{"status":"rejected"}"#).unwrap();
        assert_eq!(u.status, Some(TimesheetStatus::Rejected));
        assert!(u.manager_email.is_none());
    }
}
