use crate::auth::auth::AuthUser;
use crate::error::{ApiError, db_error, is_constraint_violation};
use crate::model::audit_log::AuditEvent;
use crate::model::client::Client;
use crate::model::role::Role;
use crate::timekeeping::validation::require_text;
use crate::utils::audit;
use actix_web::{HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use utoipa::ToSchema;

#[derive(Deserialize, Serialize, ToSchema)]
pub struct CreateClient {
    #[schema(example = "PayPal Inc.")]
    pub name: String,
    /// Short unique code, e.g. `paypal`
    #[schema(example = "paypal")]
    pub code: String,
}

#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
pub struct UpdateClient {
    pub name: Option<String>,
    pub code: Option<String>,
}

const CLIENT_SELECT: &str = "SELECT id, name, code, created_at, updated_at FROM clients";

async fn fetch_client(pool: &MySqlPool, client_id: u64) -> Result<Client, ApiError> {
    let sql = format!("{} WHERE id = ?", CLIENT_SELECT);

    sqlx::query_as::<_, Client>(&sql)
        .bind(client_id)
        .fetch_optional(pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, client_id, "Failed to fetch client");
            ApiError::Internal
        })?
        .ok_or_else(|| ApiError::not_found("Client"))
}

fn code_taken(e: &sqlx::Error) -> Option<ApiError> {
    is_constraint_violation(e).then(|| ApiError::BadRequest("Client code already exists".into()))
}

#[utoipa::path(
    get,
    path = "/api/v1/clients",
    responses(
        (status = 200, description = "All clients for admins, the own client for managers", body = [Client]),
        (status = 403, description = "Not authorized")
    ),
    tag = "Client",
    security(("bearer_auth" = []))
)]
pub async fn list_clients(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    auth.require_manager_or_admin()?;

    let clients = if auth.role == Role::ClientManager {
        let sql = format!("{} WHERE id = ?", CLIENT_SELECT);
        sqlx::query_as::<_, Client>(&sql)
            .bind(auth.client_id)
            .fetch_all(pool.get_ref())
            .await
    } else {
        let sql = format!("{} ORDER BY name", CLIENT_SELECT);
        sqlx::query_as::<_, Client>(&sql).fetch_all(pool.get_ref()).await
    }
    .map_err(db_error("Failed to list clients"))?;

    Ok(HttpResponse::Ok().json(clients))
}

#[utoipa::path(
    get,
    path = "/api/v1/clients/{client_id}",
    params(("client_id", Path, description = "Client ID")),
    responses(
        (status = 200, description = "Client found", body = Client),
        (status = 403, description = "Not authorized"),
        (status = 404, description = "Client not found")
    ),
    tag = "Client",
    security(("bearer_auth" = []))
)]
pub async fn get_client(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let client_id = path.into_inner();
    let client = fetch_client(pool.get_ref(), client_id).await?;

    if !auth.role.is_admin() && auth.client_id != Some(client_id) {
        return Err(ApiError::not_authorized().into());
    }

    Ok(HttpResponse::Ok().json(client))
}

#[utoipa::path(
    post,
    path = "/api/v1/clients",
    request_body = CreateClient,
    responses(
        (status = 201, description = "Client created", body = Client),
        (status = 400, description = "Blank field or client code already exists"),
        (status = 403, description = "Dew Admin access required")
    ),
    tag = "Client",
    security(("bearer_auth" = []))
)]
pub async fn create_client(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateClient>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;
    require_text(&payload.name, "name").map_err(ApiError::from)?;
    require_text(&payload.code, "code").map_err(ApiError::from)?;

    let result = sqlx::query("INSERT INTO clients (name, code) VALUES (?, ?)")
        .bind(payload.name.trim())
        .bind(payload.code.trim())
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            code_taken(&e).unwrap_or_else(|| {
                tracing::error!(error = %e, "Failed to create client");
                ApiError::Internal
            })
        })?;

    let client_id = result.last_insert_id();
    audit::record(
        pool.get_ref(),
        AuditEvent::ClientCreated,
        None,
        &auth,
        json!({ "client_id": client_id, "code": payload.code.trim() }),
    )
    .await;

    let client = fetch_client(pool.get_ref(), client_id).await?;
    Ok(HttpResponse::Created().json(client))
}

#[utoipa::path(
    put,
    path = "/api/v1/clients/{client_id}",
    params(("client_id", Path, description = "Client ID")),
    request_body = UpdateClient,
    responses(
        (status = 200, description = "Client updated", body = Client),
        (status = 400, description = "Client code already exists"),
        (status = 403, description = "Dew Admin access required"),
        (status = 404, description = "Client not found")
    ),
    tag = "Client",
    security(("bearer_auth" = []))
)]
pub async fn update_client(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<UpdateClient>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;
    let client_id = path.into_inner();
    fetch_client(pool.get_ref(), client_id).await?;

    let name = payload.name.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let code = payload.code.as_deref().map(str::trim).filter(|s| !s.is_empty());

    sqlx::query(
        r#"
        UPDATE clients
        SET name = COALESCE(?, name), code = COALESCE(?, code), updated_at = UTC_TIMESTAMP()
        WHERE id = ?
        "#,
    )
    .bind(name)
    .bind(code)
    .bind(client_id)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        code_taken(&e).unwrap_or_else(|| {
            tracing::error!(error = %e, client_id, "Failed to update client");
            ApiError::Internal
        })
    })?;

    audit::record(
        pool.get_ref(),
        AuditEvent::ClientUpdated,
        None,
        &auth,
        json!({ "client_id": client_id, "changes": &*payload }),
    )
    .await;

    let client = fetch_client(pool.get_ref(), client_id).await?;
    Ok(HttpResponse::Ok().json(client))
}

#[utoipa::path(
    delete,
    path = "/api/v1/clients/{client_id}",
    params(("client_id", Path, description = "Client ID")),
    responses(
        (status = 204, description = "Client deleted"),
        (status = 403, description = "Dew Admin access required"),
        (status = 404, description = "Client not found"),
        (status = 409, description = "Client still has employees")
    ),
    tag = "Client",
    security(("bearer_auth" = []))
)]
pub async fn delete_client(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;
    let client_id = path.into_inner();

    let result = sqlx::query("DELETE FROM clients WHERE id = ?")
        .bind(client_id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            if is_constraint_violation(&e) {
                return ApiError::Conflict("Client still has employees".into());
            }
            tracing::error!(error = %e, client_id, "Failed to delete client");
            ApiError::Internal
        })?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Client").into());
    }

    audit::record(
        pool.get_ref(),
        AuditEvent::ClientDeleted,
        None,
        &auth,
        json!({ "client_id": client_id }),
    )
    .await;

    Ok(HttpResponse::NoContent().finish())
}
