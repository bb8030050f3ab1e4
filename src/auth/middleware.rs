use crate::auth::auth::{authenticate, bearer_token};
use crate::config::Config;
use actix_web::middleware::Next;
use actix_web::{
    Error, HttpMessage, HttpResponse,
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
    web::Data,
};
use serde_json::json;

/// Rejects requests without a valid access token before they reach a
/// handler, and stores the resolved `AuthUser` in request extensions.
pub async fn auth_middleware(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let config = req
        .app_data::<Data<Config>>()
        .cloned()
        .ok_or_else(|| actix_web::error::ErrorInternalServerError("App config missing"))?;

    let token = match bearer_token(req.request()) {
        Some(t) => t.to_owned(),
        None => {
            let resp = HttpResponse::Unauthorized()
                .json(json!({"detail": "Missing or malformed Authorization header"}));
            return Ok(req.into_response(resp.map_into_boxed_body()));
        }
    };

    let auth_user = match authenticate(&token, &config) {
        Ok(user) => user,
        Err(e) => {
            tracing::debug!(error = %e, path = req.path(), "Rejected request token");
            let resp = HttpResponse::Unauthorized().json(json!({"detail": e.to_string()}));
            return Ok(req.into_response(resp.map_into_boxed_body()));
        }
    };

    req.extensions_mut().insert(auth_user);

    next.call(req).await
}
