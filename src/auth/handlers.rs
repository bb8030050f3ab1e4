use crate::{
    auth::{
        auth::AuthUser,
        jwt::{TokenSubject, generate_access_token, generate_refresh_token, verify_token},
        password::{hash_password, verify_password},
    },
    config::Config,
    error::{ApiError, db_error, is_constraint_violation},
    model::{audit_log::AuditEvent, employee::Employee, employee::EmployeeRow, role::Role},
    models::{CredentialsRow, LoginRequest, RefreshRequest, SignupRequest, TokenResponse, TokenType},
    timekeeping::validation::{require_text, validate_role_client},
    utils::{audit, email_registry},
};
use actix_web::{HttpResponse, Responder, web};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{debug, error, info, instrument};

const MIN_PASSWORD_LEN: usize = 6;

const CREDENTIALS_SELECT: &str =
    "SELECT id, email, full_name, password_hash, role, client_id, is_active FROM employees";

fn bad_credentials() -> ApiError {
    ApiError::Unauthorized("Incorrect email or password".into())
}

/// Issues an access/refresh pair for `user` and records the refresh token
/// so it can be rotated or revoked later.
async fn issue_tokens(
    user: &CredentialsRow,
    role: Role,
    pool: &MySqlPool,
    config: &Config,
) -> Result<TokenResponse, ApiError> {
    let subject = TokenSubject {
        employee_id: user.id,
        email: user.email.clone(),
        role,
        client_id: user.client_id,
    };

    let access_token = generate_access_token(&subject, &config.jwt_secret, config.access_token_ttl)
        .map_err(|e| {
            error!(error = %e, "Failed to sign access token");
            ApiError::Internal
        })?;
    let (refresh_token, refresh_claims) =
        generate_refresh_token(&subject, &config.jwt_secret, config.refresh_token_ttl).map_err(
            |e| {
                error!(error = %e, "Failed to sign refresh token");
                ApiError::Internal
            },
        )?;

    debug!(employee_id = user.id, jti = %refresh_claims.jti, "Storing refresh token");

    sqlx::query(
        r#"
        INSERT INTO refresh_tokens (employee_id, jti, expires_at)
        VALUES (?, ?, FROM_UNIXTIME(?))
        "#,
    )
    .bind(user.id)
    .bind(&refresh_claims.jti)
    .bind(refresh_claims.exp as i64)
    .execute(pool)
    .await
    .map_err(db_error("Failed to store refresh token"))?;

    Ok(TokenResponse {
        access_token,
        refresh_token,
        token_type: "bearer".to_string(),
        user_id: user.id,
        email: user.email.clone(),
        role,
        full_name: user.full_name.clone(),
        client_id: user.client_id,
    })
}

async fn fetch_credentials_by_email(
    pool: &MySqlPool,
    email: &str,
) -> Result<Option<CredentialsRow>, ApiError> {
    let sql = format!("{} WHERE email = ?", CREDENTIALS_SELECT);
    sqlx::query_as::<_, CredentialsRow>(&sql)
        .bind(email)
        .fetch_optional(pool)
        .await
        .map_err(db_error("Database error while fetching credentials"))
}

async fn fetch_credentials_by_id(
    pool: &MySqlPool,
    employee_id: u64,
) -> Result<Option<CredentialsRow>, ApiError> {
    let sql = format!("{} WHERE id = ?", CREDENTIALS_SELECT);
    sqlx::query_as::<_, CredentialsRow>(&sql)
        .bind(employee_id)
        .fetch_optional(pool)
        .await
        .map_err(db_error("Database error while fetching credentials"))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in", body = TokenResponse),
        (status = 401, description = "Incorrect email or password, or account disabled")
    ),
    tag = "Auth"
)]
#[instrument(name = "auth_login", skip(pool, config, payload), fields(email = %payload.email))]
pub async fn login(
    payload: web::Json<LoginRequest>,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> actix_web::Result<impl Responder> {
    info!("Login request received");

    if payload.email.trim().is_empty() || payload.password.is_empty() {
        return Err(ApiError::BadRequest("Email and password are required".into()).into());
    }

    let email = email_registry::normalize(&payload.email);
    let user = match fetch_credentials_by_email(pool.get_ref(), &email).await? {
        Some(user) => user,
        None => {
            info!("Invalid credentials: unknown email");
            return Err(bad_credentials().into());
        }
    };

    if let Err(e) = verify_password(&payload.password, &user.password_hash) {
        info!(error = %e, "Invalid credentials: password mismatch");
        return Err(bad_credentials().into());
    }

    if !user.is_active {
        info!(employee_id = user.id, "Login refused: account disabled");
        return Err(ApiError::Unauthorized("Account is disabled".into()).into());
    }

    let role: Role = user.role.parse().map_err(ApiError::from)?;
    let tokens = issue_tokens(&user, role, pool.get_ref(), &config).await?;

    let actor = AuthUser {
        employee_id: user.id,
        email: user.email.clone(),
        role,
        client_id: user.client_id,
    };
    audit::record(pool.get_ref(), AuditEvent::UserLogin, None, &actor, json!(null)).await;

    info!(employee_id = user.id, "Login successful");
    Ok(HttpResponse::Ok().json(tokens))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Account created and signed in", body = TokenResponse),
        (status = 400, description = "Email already registered, invalid client or role/client mismatch")
    ),
    tag = "Auth"
)]
#[instrument(name = "auth_signup", skip(pool, config, payload), fields(email = %payload.email, role = %payload.role))]
pub async fn signup(
    payload: web::Json<SignupRequest>,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> actix_web::Result<impl Responder> {
    let payload = payload.into_inner();

    require_text(&payload.email, "email").map_err(ApiError::from)?;
    require_text(&payload.full_name, "full_name").map_err(ApiError::from)?;
    if payload.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::BadRequest(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        ))
        .into());
    }
    validate_role_client(payload.role, payload.client_id).map_err(ApiError::from)?;

    let email = email_registry::normalize(&payload.email);
    if !email_registry::is_available(&email, pool.get_ref()).await {
        return Err(ApiError::BadRequest("Email already registered".into()).into());
    }

    if let Some(client_id) = payload.client_id {
        let found: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM clients WHERE id = ?")
            .bind(client_id)
            .fetch_one(pool.get_ref())
            .await
            .map_err(db_error("Failed to look up client"))?;
        if found == 0 {
            return Err(ApiError::BadRequest("Invalid client ID".into()).into());
        }
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
    .bind(&password_hash)
    .bind(payload.role.as_ref())
    .bind(payload.client_id)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        if is_constraint_violation(&e) {
            return ApiError::BadRequest("Email already registered".into());
        }
        error!(error = %e, "Failed to register employee");
        ApiError::Internal
    })?;

    email_registry::mark_taken(&email).await;

    let user = CredentialsRow {
        id: result.last_insert_id(),
        email,
        full_name: payload.full_name.trim().to_string(),
        password_hash,
        role: payload.role.to_string(),
        client_id: payload.client_id,
        is_active: true,
    };
    let tokens = issue_tokens(&user, payload.role, pool.get_ref(), &config).await?;

    info!(employee_id = user.id, "Signup successful");
    Ok(HttpResponse::Created().json(tokens))
}

#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    responses(
        (status = 200, description = "The signed-in employee", body = Employee),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn me(auth: AuthUser, pool: web::Data<MySqlPool>) -> actix_web::Result<impl Responder> {
    let row = sqlx::query_as::<_, EmployeeRow>(
        r#"
        SELECT id, full_name, email, role, client_id, is_active, created_at, updated_at
        FROM employees
        WHERE id = ?
        "#,
    )
    .bind(auth.employee_id)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(db_error("Failed to fetch current employee"))?
    .ok_or_else(|| ApiError::Unauthorized("Could not validate credentials".into()))?;

    let employee = Employee::try_from(row).map_err(ApiError::from)?;
    Ok(HttpResponse::Ok().json(employee))
}

/// Rotates a refresh token: the presented one is revoked and a fresh pair
/// is issued. Role and client are re-read so changes take effect here.
#[utoipa::path(
    post,
    path = "/api/v1/auth/refresh",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New token pair", body = TokenResponse),
        (status = 401, description = "Refresh token invalid, expired or revoked")
    ),
    tag = "Auth"
)]
#[instrument(name = "auth_refresh", skip_all)]
pub async fn refresh_token(
    payload: web::Json<RefreshRequest>,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> actix_web::Result<impl Responder> {
    let unauthorized = || ApiError::Unauthorized("Invalid refresh token".into());

    let claims = verify_token(&payload.refresh_token, &config.jwt_secret).map_err(|e| {
        debug!(error = %e, "Refresh token rejected");
        unauthorized()
    })?;
    if claims.token_type != TokenType::Refresh {
        return Err(unauthorized().into());
    }

    // Revoking is the guard: only one of two concurrent refreshes wins.
    let revoked = sqlx::query(
        r#"
        UPDATE refresh_tokens
        SET revoked = TRUE
        WHERE jti = ? AND employee_id = ? AND revoked = FALSE AND expires_at > UTC_TIMESTAMP()
        "#,
    )
    .bind(&claims.jti)
    .bind(claims.employee_id)
    .execute(pool.get_ref())
    .await
    .map_err(db_error("Failed to revoke refresh token"))?;

    if revoked.rows_affected() == 0 {
        info!(employee_id = claims.employee_id, "Refresh token unknown or already used");
        return Err(unauthorized().into());
    }

    let user = fetch_credentials_by_id(pool.get_ref(), claims.employee_id)
        .await?
        .filter(|u| u.is_active)
        .ok_or_else(unauthorized)?;

    let role: Role = user.role.parse().map_err(ApiError::from)?;
    let tokens = issue_tokens(&user, role, pool.get_ref(), &config).await?;
    Ok(HttpResponse::Ok().json(tokens))
}

/// Revokes the presented refresh token. Always answers 204 so the caller
/// can sign out locally regardless.
#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    request_body = RefreshRequest,
    responses((status = 204, description = "Signed out")),
    tag = "Auth"
)]
pub async fn logout(
    payload: web::Json<RefreshRequest>,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> impl Responder {
    let claims = match verify_token(&payload.refresh_token, &config.jwt_secret) {
        Ok(c) if c.token_type == TokenType::Refresh => c,
        _ => return HttpResponse::NoContent().finish(),
    };

    if let Err(e) = sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE jti = ?")
        .bind(&claims.jti)
        .execute(pool.get_ref())
        .await
    {
        error!(error = %e, "Failed to revoke refresh token on logout");
    }

    let actor = AuthUser {
        employee_id: claims.employee_id,
        email: claims.sub,
        role: claims.role,
        client_id: claims.client_id,
    };
    audit::record(pool.get_ref(), AuditEvent::UserLogout, None, &actor, json!(null)).await;

    HttpResponse::NoContent().finish()
}
