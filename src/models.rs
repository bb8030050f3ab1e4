use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::model::role::Role;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[schema(example = "jane@dewsoftware.com")]
    pub email: String,
    #[schema(example = "secret123")]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SignupRequest {
    #[schema(example = "jane@dewsoftware.com")]
    pub email: String,
    #[schema(example = "secret123")]
    pub password: String,
    #[schema(example = "Jane Doe")]
    pub full_name: String,
    pub role: Role,
    #[schema(example = 1, nullable = true)]
    pub client_id: Option<u64>,
}

/// Returned by login and signup; also everything a client needs to build
/// its session.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    #[schema(example = "bearer")]
    pub token_type: String,
    pub user_id: u64,
    pub email: String,
    pub role: Role,
    pub full_name: String,
    pub client_id: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(FromRow)]
pub struct CredentialsRow {
    pub id: u64,
    pub email: String,
    pub full_name: String,
    pub password_hash: String,
    pub role: String,
    pub client_id: Option<u64>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub employee_id: u64,
    /// Email of the signed-in employee.
    pub sub: String,
    pub role: Role,
    pub client_id: Option<u64>,
    pub exp: usize,
    pub jti: String,

    pub token_type: TokenType,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum TokenType {
    Access,
    Refresh,
}
