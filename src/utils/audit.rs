use serde_json::Value;
use sqlx::MySqlPool;

use crate::auth::auth::AuthUser;
use crate::model::audit_log::AuditEvent;

/// Appends an audit record. Failures are logged and swallowed; an audit
/// write never fails the request that triggered it.
pub async fn record(
    pool: &MySqlPool,
    event: AuditEvent,
    timesheet_id: Option<u64>,
    actor: &AuthUser,
    details: Value,
) {
    let details = if details.is_null() {
        None
    } else {
        Some(details.to_string())
    };

    if let Err(e) = sqlx::query(
        r#"
        INSERT INTO audit_logs (timesheet_id, event, actor_id, actor_email, actor_role, details)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(timesheet_id)
    .bind(event.as_ref())
    .bind(actor.employee_id)
    .bind(&actor.email)
    .bind(actor.role.as_ref())
    .bind(details)
    .execute(pool)
    .await
    {
        tracing::error!(error = %e, event = %event, ?timesheet_id, "Failed to write audit log");
    }
}
