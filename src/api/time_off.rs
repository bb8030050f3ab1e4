use crate::api::timesheet::DecisionRequest;
use crate::auth::auth::AuthUser;
use crate::error::{ApiError, db_error};
use crate::model::role::Role;
use crate::model::time_off::{TIME_OFF_SELECT, TimeOffRow, TimeOffType};
use crate::timekeeping::validation::{require_text, validate_date_range};
use crate::timekeeping::{TimeOffAction, TimeOffStatus, authorize_time_off};
use actix_web::{HttpResponse, Responder, web};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{MySql, MySqlPool, QueryBuilder};
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, Serialize, ToSchema)]
pub struct CreateTimeOff {
    #[schema(example = "2026-08-01", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-08-03", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    #[serde(rename = "type")]
    pub kind: TimeOffType,
    #[schema(example = "manager@google.com")]
    pub manager_email: String,
    pub comment: Option<String>,
}

/// Owner edits while pending, or a decision when `status` is set.
#[derive(Deserialize, Serialize, Default, ToSchema)]
pub struct UpdateTimeOff {
    #[schema(format = "date", value_type = Option<String>)]
    pub start_date: Option<NaiveDate>,
    #[schema(format = "date", value_type = Option<String>)]
    pub end_date: Option<NaiveDate>,
    #[serde(rename = "type")]
    pub kind: Option<TimeOffType>,
    pub comment: Option<String>,
    pub manager_comment: Option<String>,
    pub status: Option<TimeOffStatus>,
}

#[derive(Deserialize, Serialize, Default, IntoParams, ToSchema)]
pub struct TimeOffFilter {
    /// Only requests of this employee
    pub employee_id: Option<u64>,
    /// Only requests in this status
    pub status: Option<TimeOffStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "id": 1,
    "employee_id": 7,
    "employee_name": "Jane Doe",
    "client_id": 1,
    "start_date": "2026-08-01",
    "end_date": "2026-08-03",
    "type": "vacation",
    "status": "pending",
    "comment": null,
    "manager_email": "manager@google.com",
    "manager_comment": null,
    "approved_by": null,
    "approved_at": null,
    "created_at": "2026-07-20T10:00:00Z",
    "updated_at": "2026-07-20T10:00:00Z"
}))]
pub struct TimeOffResponse {
    pub id: u64,
    pub employee_id: u64,
    pub employee_name: String,
    #[schema(nullable = true)]
    pub client_id: Option<u64>,
    #[schema(format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(format = "date", value_type = String)]
    pub end_date: NaiveDate,
    #[serde(rename = "type")]
    pub kind: TimeOffType,
    pub status: TimeOffStatus,
    pub comment: Option<String>,
    pub manager_email: Option<String>,
    pub manager_comment: Option<String>,
    pub approved_by: Option<u64>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub approved_at: Option<DateTime<Utc>>,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
    #[schema(value_type = String, format = "date-time")]
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<TimeOffRow> for TimeOffResponse {
    type Error = strum::ParseError;

    fn try_from(row: TimeOffRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            employee_id: row.employee_id,
            employee_name: row.employee_name,
            client_id: row.owner_client_id,
            start_date: row.start_date,
            end_date: row.end_date,
            kind: row.kind.parse()?,
            status: row.status.parse()?,
            comment: row.comment,
            manager_email: row.manager_email,
            manager_comment: row.manager_comment,
            approved_by: row.approved_by,
            approved_at: row.approved_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

async fn fetch_request(pool: &MySqlPool, request_id: u64) -> Result<TimeOffRow, ApiError> {
    let sql = format!("{} WHERE r.id = ?", TIME_OFF_SELECT);

    sqlx::query_as::<_, TimeOffRow>(&sql)
        .bind(request_id)
        .fetch_optional(pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, request_id, "Failed to fetch time off request");
            ApiError::Internal
        })?
        .ok_or_else(|| ApiError::not_found("Time off request"))
}

async fn reload(pool: &MySqlPool, request_id: u64) -> Result<TimeOffResponse, ApiError> {
    let row = fetch_request(pool, request_id).await?;
    Ok(TimeOffResponse::try_from(row)?)
}

/// Approve or reject a pending request. The `UPDATE` is guarded on
/// `pending` so a request is decided at most once.
async fn decide(
    pool: &MySqlPool,
    auth: &AuthUser,
    request_id: u64,
    action: TimeOffAction,
    manager_comment: Option<String>,
) -> Result<TimeOffResponse, ApiError> {
    let row = fetch_request(pool, request_id).await?;
    let current: TimeOffStatus = row.status.parse()?;

    let next = authorize_time_off(action, current, &auth.actor(), &row.owner())?
        .ok_or_else(|| ApiError::BadRequest(format!("Cannot {} via a decision", action)))?;

    let result = sqlx::query(
        r#"
        UPDATE time_off_requests
        SET status = ?, manager_comment = COALESCE(?, manager_comment),
            approved_by = ?, approved_at = UTC_TIMESTAMP(), updated_at = UTC_TIMESTAMP()
        WHERE id = ? AND status = ?
        "#,
    )
    .bind(next.as_ref())
    .bind(manager_comment.as_deref())
    .bind(auth.employee_id)
    .bind(request_id)
    .bind(TimeOffStatus::Pending.as_ref())
    .execute(pool)
    .await
    .map_err(|e| {
        tracing::error!(error = %e, request_id, action = %action, "Time off decision failed");
        ApiError::Internal
    })?;

    if result.rows_affected() == 0 {
        return Err(ApiError::BadRequest(
            "Time off request is no longer pending".into(),
        ));
    }

    tracing::info!(request_id, to = %next, actor = auth.employee_id, "Time off request decided");
    reload(pool, request_id).await
}

/* =========================
List time off requests
========================= */
#[utoipa::path(
    get,
    path = "/api/v1/time_off",
    params(TimeOffFilter),
    responses(
        (status = 200, description = "Requests visible to the caller", body = [TimeOffResponse]),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Time Off"
)]
pub async fn list_time_off(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<TimeOffFilter>,
) -> actix_web::Result<impl Responder> {
    let mut qb = QueryBuilder::<MySql>::new(TIME_OFF_SELECT);
    qb.push(" WHERE 1=1");

    match auth.role {
        Role::Consultant => {
            qb.push(" AND r.employee_id = ").push_bind(auth.employee_id);
        }
        Role::ClientManager => {
            qb.push(" AND e.client_id = ").push_bind(auth.client_id);
        }
        Role::DewAdmin => {}
    }

    if let Some(employee_id) = query.employee_id {
        qb.push(" AND r.employee_id = ").push_bind(employee_id);
    }
    if let Some(status) = query.status {
        qb.push(" AND r.status = ").push_bind(status.to_string());
    }
    qb.push(" ORDER BY r.start_date DESC, r.id DESC");

    let rows: Vec<TimeOffRow> = qb
        .build_query_as()
        .fetch_all(pool.get_ref())
        .await
        .map_err(db_error("Failed to list time off requests"))?;

    let data = rows
        .into_iter()
        .map(TimeOffResponse::try_from)
        .collect::<Result<Vec<_>, _>>()
        .map_err(ApiError::from)?;

    Ok(HttpResponse::Ok().json(data))
}

/* =========================
Create time off request
========================= */
#[utoipa::path(
    post,
    path = "/api/v1/time_off",
    request_body = CreateTimeOff,
    responses(
        (status = 201, description = "Pending request created", body = TimeOffResponse),
        (status = 400, description = "start_date after end_date, unknown type or blank manager_email"),
        (status = 403, description = "Only consultants can request time off")
    ),
    security(("bearer_auth" = [])),
    tag = "Time Off"
)]
pub async fn create_time_off(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateTimeOff>,
) -> actix_web::Result<impl Responder> {
    auth.require_consultant("request time off")?;

    let payload = payload.into_inner();
    validate_date_range(payload.start_date, payload.end_date).map_err(ApiError::from)?;
    require_text(&payload.manager_email, "manager_email").map_err(ApiError::from)?;

    let result = sqlx::query(
        r#"
        INSERT INTO time_off_requests
            (employee_id, start_date, end_date, type, status, comment, manager_email)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(auth.employee_id)
    .bind(payload.start_date)
    .bind(payload.end_date)
    .bind(payload.kind.as_ref())
    .bind(TimeOffStatus::Pending.as_ref())
    .bind(&payload.comment)
    .bind(payload.manager_email.trim())
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, employee_id = auth.employee_id, "Failed to create time off request");
        ApiError::Internal
    })?;

    let body = reload(pool.get_ref(), result.last_insert_id()).await?;
    Ok(HttpResponse::Created().json(body))
}

/* =========================
Get time off request
========================= */
#[utoipa::path(
    get,
    path = "/api/v1/time_off/{id}",
    params(("id" = u64, Path, description = "Time off request id")),
    responses(
        (status = 200, description = "Time off request", body = TimeOffResponse),
        (status = 403, description = "Not authorized"),
        (status = 404, description = "Request not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Time Off"
)]
pub async fn get_time_off(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let row = fetch_request(pool.get_ref(), path.into_inner()).await?;
    if !auth.actor().can_view(&row.owner()) {
        return Err(ApiError::not_authorized().into());
    }

    let body = TimeOffResponse::try_from(row).map_err(ApiError::from)?;
    Ok(HttpResponse::Ok().json(body))
}

/* =========================
Update time off request
========================= */
#[utoipa::path(
    put,
    path = "/api/v1/time_off/{id}",
    params(("id" = u64, Path, description = "Time off request id")),
    request_body = UpdateTimeOff,
    responses(
        (status = 200, description = "Updated request", body = TimeOffResponse),
        (status = 400, description = "Request is not pending or dates are inverted"),
        (status = 403, description = "Not authorized"),
        (status = 404, description = "Request not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Time Off"
)]
pub async fn update_time_off(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<UpdateTimeOff>,
) -> actix_web::Result<impl Responder> {
    let request_id = path.into_inner();
    let payload = payload.into_inner();

    if let Some(target) = payload.status {
        let action = match target {
            TimeOffStatus::Approved => TimeOffAction::Approve,
            TimeOffStatus::Rejected => TimeOffAction::Reject,
            TimeOffStatus::Pending => {
                return Err(ApiError::BadRequest(
                    "A decided request cannot be reopened".into(),
                )
                .into());
            }
        };
        let body = decide(pool.get_ref(), &auth, request_id, action, payload.manager_comment).await?;
        return Ok(HttpResponse::Ok().json(body));
    }

    let row = fetch_request(pool.get_ref(), request_id).await?;
    let current: TimeOffStatus = row.status.parse().map_err(ApiError::from)?;
    authorize_time_off(TimeOffAction::Update, current, &auth.actor(), &row.owner())
        .map_err(ApiError::from)?;

    let start = payload.start_date.unwrap_or(row.start_date);
    let end = payload.end_date.unwrap_or(row.end_date);
    validate_date_range(start, end).map_err(ApiError::from)?;

    let result = sqlx::query(
        r#"
        UPDATE time_off_requests
        SET start_date = ?, end_date = ?, type = COALESCE(?, type),
            comment = COALESCE(?, comment), updated_at = UTC_TIMESTAMP()
        WHERE id = ? AND status = ?
        "#,
    )
    .bind(start)
    .bind(end)
    .bind(payload.kind.map(|k| k.to_string()))
    .bind(&payload.comment)
    .bind(request_id)
    .bind(TimeOffStatus::Pending.as_ref())
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, request_id, "Failed to update time off request");
        ApiError::Internal
    })?;

    let body = reload(pool.get_ref(), request_id).await?;
    if result.rows_affected() == 0 && body.status != TimeOffStatus::Pending {
        return Err(ApiError::BadRequest("Time off request is no longer pending".into()).into());
    }

    Ok(HttpResponse::Ok().json(body))
}

/* =========================
Delete time off request
========================= */
#[utoipa::path(
    delete,
    path = "/api/v1/time_off/{id}",
    params(("id" = u64, Path, description = "Time off request id")),
    responses(
        (status = 204, description = "Request deleted"),
        (status = 400, description = "Only pending requests can be deleted"),
        (status = 403, description = "Not authorized"),
        (status = 404, description = "Request not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Time Off"
)]
pub async fn delete_time_off(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let request_id = path.into_inner();
    let row = fetch_request(pool.get_ref(), request_id).await?;
    let current: TimeOffStatus = row.status.parse().map_err(ApiError::from)?;
    authorize_time_off(TimeOffAction::Delete, current, &auth.actor(), &row.owner())
        .map_err(ApiError::from)?;

    let result = sqlx::query("DELETE FROM time_off_requests WHERE id = ? AND status = ?")
        .bind(request_id)
        .bind(TimeOffStatus::Pending.as_ref())
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, request_id, "Failed to delete time off request");
            ApiError::Internal
        })?;

    if result.rows_affected() == 0 {
        return Err(ApiError::BadRequest("Time off request is no longer pending".into()).into());
    }

    Ok(HttpResponse::NoContent().finish())
}

/* =========================
Approve / reject
========================= */
#[utoipa::path(
    post,
    path = "/api/v1/time_off/{id}/approve",
    params(("id" = u64, Path, description = "Time off request id")),
    responses(
        (status = 200, description = "Request approved", body = TimeOffResponse),
        (status = 400, description = "Request is not pending"),
        (status = 403, description = "Not a manager of the requester's client"),
        (status = 404, description = "Request not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Time Off"
)]
pub async fn approve_time_off(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: Option<web::Json<DecisionRequest>>,
) -> actix_web::Result<impl Responder> {
    let comment = payload.and_then(|p| p.into_inner().reason);
    let body = decide(
        pool.get_ref(),
        &auth,
        path.into_inner(),
        TimeOffAction::Approve,
        comment,
    )
    .await?;
    Ok(HttpResponse::Ok().json(body))
}

#[utoipa::path(
    post,
    path = "/api/v1/time_off/{id}/reject",
    params(("id" = u64, Path, description = "Time off request id")),
    request_body(content = DecisionRequest, description = "Optional manager comment"),
    responses(
        (status = 200, description = "Request rejected", body = TimeOffResponse),
        (status = 400, description = "Request is not pending"),
        (status = 403, description = "Not a manager of the requester's client"),
        (status = 404, description = "Request not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Time Off"
)]
pub async fn reject_time_off(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: Option<web::Json<DecisionRequest>>,
) -> actix_web::Result<impl Responder> {
    let comment = payload.and_then(|p| p.into_inner().reason);
    let body = decide(
        pool.get_ref(),
        &auth,
        path.into_inner(),
        TimeOffAction::Reject,
        comment,
    )
    .await?;
    Ok(HttpResponse::Ok().json(body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_payload_uses_type_key() {
        let body = r#"{
            "start_date": "2026-08-01",
            "end_date": "2026-08-03",
            "type": "vacation",
            "manager_email": "boss@client.com"
        }"#;
        let req: CreateTimeOff = serde_json::from_str(body).unwrap();
        assert_eq!(req.kind, TimeOffType::Vacation);
        assert!(req.comment.is_none());
    }

    #[test]
    fn unknown_type_is_rejected_at_deserialization() {
        let body = r#"{
            "start_date": "2026-08-01",
            "end_date": "2026-08-03",
            "type": "sabbatical",
            "manager_email": "boss@client.com"
        }"#;
        assert!(serde_json::from_str::<CreateTimeOff>(body).is_err());
    }

    #[test]
    fn stored_row_converts_to_response() {
        let ts = Utc::now();
        let row = TimeOffRow {
            id: 3,
            employee_id: 7,
            employee_name: "Jane Doe".into(),
            owner_client_id: Some(1),
            start_date: NaiveDate::from_ymd_opt(2026, 8, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2026, 8, 3).unwrap(),
            kind: "sick".into(),
            status: "approved".into(),
            comment: None,
            manager_email: Some("boss@client.com".into()),
            manager_comment: Some("get well".into()),
            approved_by: Some(2),
            approved_at: Some(ts),
            created_at: ts,
            updated_at: ts,
        };

        let resp = TimeOffResponse::try_from(row).unwrap();
        assert_eq!(resp.kind, TimeOffType::Sick);
        assert_eq!(resp.status, TimeOffStatus::Approved);

        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["type"], "sick");
    }
}
