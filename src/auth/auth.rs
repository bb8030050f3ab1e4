use crate::config::Config;
use crate::error::ApiError;
use crate::model::role::Role;
use crate::models::TokenType;
use crate::timekeeping::Actor;
use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload, web::Data};
use futures::future::{Ready, ready};

use super::jwt::verify_token;

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub employee_id: u64,
    pub email: String,
    pub role: Role,

    /// Absent only for admins.
    pub client_id: Option<u64>,
}

pub(crate) fn bearer_token(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}

/// Decodes an access token into the caller's identity.
pub(crate) fn authenticate(token: &str, config: &Config) -> Result<AuthUser, ApiError> {
    let claims = verify_token(token, &config.jwt_secret)
        .map_err(|_| ApiError::Unauthorized("Could not validate credentials".into()))?;

    if claims.token_type != TokenType::Access {
        return Err(ApiError::Unauthorized("Access token required".into()));
    }

    Ok(AuthUser {
        employee_id: claims.employee_id,
        email: claims.sub,
        role: claims.role,
        client_id: claims.client_id,
    })
}

impl FromRequest for AuthUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        // Already resolved by the auth middleware on protected scopes.
        if let Some(user) = req.extensions().get::<AuthUser>() {
            return ready(Ok(user.clone()));
        }

        let token = match bearer_token(req) {
            Some(t) => t,
            None => return ready(Err(ApiError::Unauthorized("Missing token".into()).into())),
        };

        let config = match req.app_data::<Data<Config>>() {
            Some(c) => c,
            None => {
                tracing::error!("Config missing from app data");
                return ready(Err(ApiError::Internal.into()));
            }
        };

        ready(authenticate(token, config).map_err(Into::into))
    }
}

impl AuthUser {
    pub fn actor(&self) -> Actor {
        Actor {
            employee_id: self.employee_id,
            role: self.role,
            client_id: self.client_id,
        }
    }

    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.role.is_admin() {
            Ok(())
        } else {
            Err(ApiError::Forbidden("Dew Admin access required".into()))
        }
    }

    pub fn require_manager_or_admin(&self) -> Result<(), ApiError> {
        if self.role.is_manager_or_admin() {
            Ok(())
        } else {
            Err(ApiError::Forbidden("Client Manager or Dew Admin access required".into()))
        }
    }

    pub fn require_consultant(&self, what: &str) -> Result<(), ApiError> {
        if self.role == Role::Consultant {
            Ok(())
        } else {
            Err(ApiError::Forbidden(format!("Only consultants can {}", what)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::{TokenSubject, generate_access_token, generate_refresh_token};
    use actix_web::{App, HttpResponse, http::StatusCode, test, web};

    async fn whoami(user: AuthUser) -> HttpResponse {
        HttpResponse::Ok().body(format!("{}:{}", user.employee_id, user.role))
    }

    fn subject() -> TokenSubject {
        TokenSubject {
            employee_id: 7,
            email: "c@dew.com".into(),
            role: Role::Consultant,
            client_id: Some(1),
        }
    }

    #[actix_web::test]
    async fn extracts_user_from_bearer_token() {
        let config = Config::for_secret("test-secret");
        let token = generate_access_token(&subject(), &config.jwt_secret, 60).unwrap();
        let app = test::init_service(
            App::new()
                .app_data(Data::new(config))
                .route("/whoami", web::get().to(whoami)),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/whoami")
            .insert_header(("Authorization", format!("Bearer {token}")))
            .to_request();
        let body = test::call_and_read_body(&app, req).await;
        assert_eq!(body, web::Bytes::from_static(b"7:consultant"));
    }

    #[actix_web::test]
    async fn missing_or_refresh_token_is_401() {
        let config = Config::for_secret("test-secret");
        let (refresh, _) = generate_refresh_token(&subject(), &config.jwt_secret, 60).unwrap();
        let app = test::init_service(
            App::new()
                .app_data(Data::new(config))
                .route("/whoami", web::get().to(whoami)),
        )
        .await;

        let resp = test::call_service(&app, test::TestRequest::get().uri("/whoami").to_request()).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let req = test::TestRequest::get()
            .uri("/whoami")
            .insert_header(("Authorization", format!("Bearer {refresh}")))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }
}
