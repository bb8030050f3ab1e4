use crate::auth::auth::AuthUser;
use crate::auth::password::hash_password;
use crate::error::{ApiError, db_error, is_constraint_violation};
use crate::model::audit_log::AuditEvent;
use crate::model::employee::{Employee, EmployeeRow};
use crate::model::role::Role;
use crate::timekeeping::validation::{require_text, validate_role_client};
use crate::utils::{audit, email_registry};
use actix_web::{HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::{MySql, MySqlPool, QueryBuilder};
use tracing::{debug, error};
use utoipa::{IntoParams, ToSchema};

const EMPLOYEE_SELECT: &str =
    "SELECT id, full_name, email, role, client_id, is_active, created_at, updated_at FROM employees";

#[derive(Deserialize, Serialize, ToSchema)]
pub struct CreateEmployee {
    #[schema(example = "John Doe")]
    pub full_name: String,
    #[schema(example = "john@dewsoftware.com", format = "email")]
    pub email: String,
    #[schema(example = "secret123")]
    pub password: String,
    pub role: Role,
    #[schema(example = 1, nullable = true)]
    pub client_id: Option<u64>,
}

#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
pub struct UpdateEmployee {
    pub full_name: Option<String>,
    pub role: Option<Role>,
    pub client_id: Option<u64>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize, Serialize, IntoParams, ToSchema)]
pub struct EmployeeQuery {
    /// Page number, starting at 1
    pub page: Option<u32>,
    /// Items per page (max 100)
    pub per_page: Option<u32>,
    pub role: Option<Role>,
    pub client_id: Option<u64>,
    /// Search by name or email
    pub search: Option<String>,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct EmployeeListResponse {
    pub data: Vec<Employee>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 20)]
    pub per_page: u32,
    #[schema(example = 42)]
    pub total: i64,
}

async fn fetch_employee(pool: &MySqlPool, employee_id: u64) -> Result<Employee, ApiError> {
    let sql = format!("{} WHERE id = ?", EMPLOYEE_SELECT);

    let row = sqlx::query_as::<_, EmployeeRow>(&sql)
        .bind(employee_id)
        .fetch_optional(pool)
        .await
        .map_err(|e| {
            error!(error = %e, employee_id, "Failed to fetch employee");
            ApiError::Internal
        })?
        .ok_or_else(|| ApiError::not_found("Employee"))?;

    Ok(Employee::try_from(row)?)
}

/// Managers act on employees of their own client only and may neither
/// promote to admin nor move anyone to another client.
fn check_manager_scope(
    auth: &AuthUser,
    target_client: Option<u64>,
    new_role: Option<Role>,
) -> Result<(), ApiError> {
    if auth.role != Role::ClientManager {
        return auth.require_admin();
    }
    if auth.client_id.is_none() || target_client != auth.client_id {
        return Err(ApiError::not_authorized());
    }
    if new_role == Some(Role::DewAdmin) {
        return Err(ApiError::Forbidden("Cannot promote to Dew Admin".into()));
    }
    Ok(())
}

/// WHERE clause shared by the count and page queries of `list_employees`.
fn push_filters(qb: &mut QueryBuilder<'_, MySql>, auth: &AuthUser, query: &EmployeeQuery) {
    qb.push(" WHERE 1=1");
    if auth.role == Role::ClientManager {
        qb.push(" AND client_id = ").push_bind(auth.client_id);
    } else if let Some(client_id) = query.client_id {
        qb.push(" AND client_id = ").push_bind(client_id);
    }
    if let Some(role) = query.role {
        qb.push(" AND role = ").push_bind(role.to_string());
    }
    if let Some(search) = query.search.as_deref().filter(|s| !s.trim().is_empty()) {
        let like = format!("%{}%", search.trim());
        qb.push(" AND (full_name LIKE ")
            .push_bind(like.clone())
            .push(" OR email LIKE ")
            .push_bind(like)
            .push(")");
    }
}

/// Create Employee
#[utoipa::path(
    post,
    path = "/api/v1/employees",
    request_body = CreateEmployee,
    responses(
        (status = 201, description = "Employee created", body = Employee),
        (status = 400, description = "Invalid role/client combination or blank field"),
        (status = 403, description = "Not authorized"),
        (status = 409, description = "Email already registered")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn create_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateEmployee>,
) -> actix_web::Result<impl Responder> {
    let payload = payload.into_inner();
    check_manager_scope(&auth, payload.client_id, Some(payload.role))?;

    require_text(&payload.full_name, "full_name").map_err(ApiError::from)?;
    require_text(&payload.email, "email").map_err(ApiError::from)?;
    require_text(&payload.password, "password").map_err(ApiError::from)?;
    validate_role_client(payload.role, payload.client_id).map_err(ApiError::from)?;

    let email = email_registry::normalize(&payload.email);
    if !email_registry::is_available(&email, pool.get_ref()).await {
        return Err(ApiError::Conflict("Email already registered".into()).into());
    }

    let password_hash = hash_password(&payload.password).map_err(|e| {
        error!(error = %e, "Password hashing failed");
        ApiError::Internal
    })?;

    let result = sqlx::query(
        r#"
        INSERT INTO employees (full_name, email, password_hash, role, client_id, is_active)
        VALUES (?, ?, ?, ?, ?, TRUE)
        "#,
    )
    .bind(payload.full_name.trim())
    .bind(&email)
    .bind(password_hash)
    .bind(payload.role.as_ref())
    .bind(payload.client_id)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        if is_constraint_violation(&e) {
            return ApiError::Conflict("Email already registered or unknown client".into());
        }
        error!(error = %e, "Failed to create employee");
        ApiError::Internal
    })?;

    email_registry::mark_taken(&email).await;

    let employee_id = result.last_insert_id();
    audit::record(
        pool.get_ref(),
        AuditEvent::EmployeeCreated,
        None,
        &auth,
        json!({ "employee_id": employee_id, "role": payload.role, "client_id": payload.client_id }),
    )
    .await;

    let employee = fetch_employee(pool.get_ref(), employee_id).await?;
    Ok(HttpResponse::Created().json(employee))
}

/// List employees: everyone for admins, the own client's staff for managers.
#[utoipa::path(
    get,
    path = "/api/v1/employees",
    params(EmployeeQuery),
    responses(
        (status = 200, description = "Paginated employee list", body = EmployeeListResponse),
        (status = 403, description = "Not authorized")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn list_employees(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<EmployeeQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_manager_or_admin()?;

    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
    let offset = (page - 1) * per_page;

    let mut count_qb = QueryBuilder::<MySql>::new("SELECT COUNT(*) FROM employees");
    push_filters(&mut count_qb, &auth, &query);
    debug!(sql = count_qb.sql(), "Counting employees");

    let total: i64 = count_qb
        .build_query_scalar()
        .fetch_one(pool.get_ref())
        .await
        .map_err(db_error("Failed to count employees"))?;

    let mut data_qb = QueryBuilder::<MySql>::new(EMPLOYEE_SELECT);
    push_filters(&mut data_qb, &auth, &query);
    data_qb
        .push(" ORDER BY id DESC LIMIT ")
        .push_bind(per_page)
        .push(" OFFSET ")
        .push_bind(offset);
    debug!(sql = data_qb.sql(), page, per_page, offset, "Fetching employees");

    let rows: Vec<EmployeeRow> = data_qb
        .build_query_as()
        .fetch_all(pool.get_ref())
        .await
        .map_err(db_error("Failed to fetch employees"))?;

    let data = rows
        .into_iter()
        .map(Employee::try_from)
        .collect::<Result<Vec<_>, _>>()
        .map_err(ApiError::from)?;

    Ok(HttpResponse::Ok().json(EmployeeListResponse {
        data,
        page,
        per_page,
        total,
    }))
}

/// Get Employee by ID
#[utoipa::path(
    get,
    path = "/api/v1/employees/{employee_id}",
    params(("employee_id", Path, description = "Employee ID")),
    responses(
        (status = 200, description = "Employee found", body = Employee),
        (status = 403, description = "Not authorized"),
        (status = 404, description = "Employee not found")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn get_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let employee = fetch_employee(pool.get_ref(), path.into_inner()).await?;

    if employee.id != auth.employee_id {
        check_manager_scope(&auth, employee.client_id, None)?;
    }

    Ok(HttpResponse::Ok().json(employee))
}

/// Update Employee
#[utoipa::path(
    put,
    path = "/api/v1/employees/{employee_id}",
    params(("employee_id", Path, description = "Employee ID")),
    request_body = UpdateEmployee,
    responses(
        (status = 200, description = "Employee updated", body = Employee),
        (status = 400, description = "Invalid role/client combination"),
        (status = 403, description = "Not authorized"),
        (status = 404, description = "Employee not found")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn update_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<UpdateEmployee>,
) -> actix_web::Result<impl Responder> {
    let employee_id = path.into_inner();
    let payload = payload.into_inner();
    let current = fetch_employee(pool.get_ref(), employee_id).await?;

    check_manager_scope(&auth, current.client_id, payload.role)?;
    if auth.role == Role::ClientManager && payload.client_id.is_some_and(|c| Some(c) != auth.client_id) {
        return Err(ApiError::Forbidden("Cannot assign to another client".into()).into());
    }

    let role = payload.role.unwrap_or(current.role);
    // Promoting to admin clears the client; otherwise keep it unless replaced.
    let client_id = match (role, payload.client_id) {
        (Role::DewAdmin, None) => None,
        (_, Some(c)) => Some(c),
        (_, None) => current.client_id,
    };
    validate_role_client(role, client_id).map_err(ApiError::from)?;

    let full_name = match payload.full_name.as_deref() {
        Some(name) => {
            require_text(name, "full_name").map_err(ApiError::from)?;
            name.trim().to_string()
        }
        None => current.full_name.clone(),
    };
    let is_active = payload.is_active.unwrap_or(current.is_active);

    sqlx::query(
        r#"
        UPDATE employees
        SET full_name = ?, role = ?, client_id = ?, is_active = ?, updated_at = UTC_TIMESTAMP()
        WHERE id = ?
        "#,
    )
    .bind(&full_name)
    .bind(role.as_ref())
    .bind(client_id)
    .bind(is_active)
    .bind(employee_id)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        if is_constraint_violation(&e) {
            return ApiError::BadRequest("Unknown client".into());
        }
        error!(error = %e, employee_id, "Failed to update employee");
        ApiError::Internal
    })?;

    audit::record(
        pool.get_ref(),
        AuditEvent::EmployeeUpdated,
        None,
        &auth,
        json!({ "employee_id": employee_id, "changes": payload }),
    )
    .await;

    let employee = fetch_employee(pool.get_ref(), employee_id).await?;
    Ok(HttpResponse::Ok().json(employee))
}

/// Delete Employee
#[utoipa::path(
    delete,
    path = "/api/v1/employees/{employee_id}",
    params(("employee_id", Path, description = "Employee ID")),
    responses(
        (status = 204, description = "Employee deleted"),
        (status = 400, description = "Cannot delete yourself"),
        (status = 403, description = "Not authorized"),
        (status = 404, description = "Employee not found"),
        (status = 409, description = "Employee still owns timesheets or time off requests")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn delete_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let employee_id = path.into_inner();
    let employee = fetch_employee(pool.get_ref(), employee_id).await?;

    check_manager_scope(&auth, employee.client_id, None)?;
    if employee_id == auth.employee_id {
        return Err(ApiError::BadRequest("Cannot delete yourself".into()).into());
    }

    let result = sqlx::query("DELETE FROM employees WHERE id = ?")
        .bind(employee_id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            if is_constraint_violation(&e) {
                return ApiError::Conflict(
                    "Employee still owns timesheets or time off requests".into(),
                );
            }
            error!(error = %e, employee_id, "Failed to delete employee");
            ApiError::Internal
        })?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Employee").into());
    }

    email_registry::forget(&employee.email).await;
    audit::record(
        pool.get_ref(),
        AuditEvent::EmployeeDeleted,
        None,
        &auth,
        json!({ "employee_id": employee_id, "email": employee.email }),
    )
    .await;

    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Role, client_id: Option<u64>) -> AuthUser {
        AuthUser {
            employee_id: 1,
            email: "u@dew.com".into(),
            role,
            client_id,
        }
    }

    #[test]
    fn admin_may_act_on_anyone() {
        let admin = user(Role::DewAdmin, None);
        assert!(check_manager_scope(&admin, Some(9), Some(Role::DewAdmin)).is_ok());
    }

    #[test]
    fn manager_is_confined_to_own_client() {
        let manager = user(Role::ClientManager, Some(3));
        assert!(check_manager_scope(&manager, Some(3), Some(Role::Consultant)).is_ok());
        assert!(check_manager_scope(&manager, Some(4), None).is_err());
        assert!(matches!(
            check_manager_scope(&manager, Some(3), Some(Role::DewAdmin)),
            Err(ApiError::Forbidden(_))
        ));
    }

    #[test]
    fn consultant_is_refused() {
        let consultant = user(Role::Consultant, Some(3));
        assert!(check_manager_scope(&consultant, Some(3), None).is_err());
    }
}
