use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use derive_more::Display;
use serde_json::json;

use crate::timekeeping::{GateError, ValidationError};

/// Error returned by handlers. Every variant renders as `{"detail": "..."}`,
/// the body shape clients surface verbatim.
#[derive(Debug, Display)]
pub enum ApiError {
    #[display(fmt = "{}", _0)]
    BadRequest(String),
    #[display(fmt = "{}", _0)]
    Unauthorized(String),
    #[display(fmt = "{}", _0)]
    Forbidden(String),
    #[display(fmt = "{}", _0)]
    NotFound(String),
    #[display(fmt = "{}", _0)]
    Conflict(String),
    #[display(fmt = "Internal Server Error")]
    Internal,
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({ "detail": self.to_string() }))
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}

impl From<GateError> for ApiError {
    fn from(e: GateError) -> Self {
        if e.is_forbidden() {
            ApiError::Forbidden(e.to_string())
        } else {
            ApiError::BadRequest(e.to_string())
        }
    }
}

impl ApiError {
    pub fn not_found(what: &str) -> Self {
        ApiError::NotFound(format!("{} not found", what))
    }

    pub fn not_authorized() -> Self {
        ApiError::Forbidden("Not authorized".to_string())
    }
}

/// Logs a storage failure under `context` and hides it behind a 500.
pub fn db_error(context: &'static str) -> impl FnOnce(sqlx::Error) -> ApiError {
    move |e| {
        tracing::error!(error = %e, "{}", context);
        ApiError::Internal
    }
}

/// A stored enum column holding a value the code does not know.
impl From<strum::ParseError> for ApiError {
    fn from(e: strum::ParseError) -> Self {
        tracing::error!(error = %e, "Unrecognized value in database column");
        ApiError::Internal
    }
}

/// MySQL reports unique and foreign key violations as SQLSTATE 23000.
pub fn is_constraint_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23000"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    #[actix_web::test]
    async fn error_body_carries_detail() {
        let resp = ApiError::from(ValidationError::OutNotAfterIn).error_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body = to_bytes(resp.into_body()).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["detail"], "Out time must be after In time");
    }

    #[test]
    fn gate_errors_map_to_403_or_400() {
        let forbidden = GateError::Forbidden {
            action: "approve".into(),
            subject: "timesheet",
        };
        assert_eq!(ApiError::from(forbidden).status_code(), StatusCode::FORBIDDEN);

        let wrong_status = GateError::InvalidStatus {
            action: "submit".into(),
            status: "submitted".into(),
            subject: "timesheet",
        };
        assert_eq!(ApiError::from(wrong_status).status_code(), StatusCode::BAD_REQUEST);
    }
}
