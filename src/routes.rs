use crate::{
    api::{client, dashboard, employee, time_off, timesheet},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfig, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use std::sync::Arc;

/// Per-route limiter allowing `requests_per_min` with an equal burst.
fn build_limiter(requests_per_min: u32) -> Option<Governor<PeerIpKeyExtractor, NoOpMiddleware>> {
    let requests_per_min = requests_per_min.max(1);
    let cfg = GovernorConfigBuilder::default()
        .milliseconds_per_request((60_000 / u64::from(requests_per_min)).max(1))
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()?;
    Some(Governor::new(&cfg))
}

fn limiter(requests_per_min: u32) -> Arc<Governor<PeerIpKeyExtractor, NoOpMiddleware>> {
    // finish() only fails on a zero period or burst, both excluded above.
    Arc::new(
        build_limiter(requests_per_min)
            .unwrap_or_else(|| Governor::new(&GovernorConfig::default())),
    )
}

pub fn configure(cfg: &mut web::ServiceConfig, config: &Config) {
    let login_limiter = limiter(config.rate_login_per_min);
    let signup_limiter = limiter(config.rate_signup_per_min);
    let refresh_limiter = limiter(config.rate_refresh_per_min);
    let protected_limiter = limiter(config.rate_protected_per_min);

    // Public routes. Registered before the protected scope, which shares the
    // prefix and would otherwise swallow them.
    cfg.service(
        web::scope(&format!("{}/auth", config.api_prefix))
            .service(
                web::resource("/login")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(handlers::login)),
            )
            .service(
                web::resource("/signup")
                    .wrap(signup_limiter)
                    .route(web::post().to(handlers::signup)),
            )
            .service(
                web::resource("/refresh")
                    .wrap(refresh_limiter)
                    .route(web::post().to(handlers::refresh_token)),
            )
            .service(
                web::resource("/logout")
                    .wrap(login_limiter)
                    .route(web::post().to(handlers::logout)),
            )
            .service(
                web::resource("/me")
                    .wrap(from_fn(auth_middleware))
                    .route(web::get().to(handlers::me)),
            ),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware))
            .wrap(protected_limiter)
            .service(
                web::scope("/timesheets")
                    .service(
                        web::resource("")
                            .route(web::get().to(timesheet::list_timesheets))
                            .route(web::post().to(timesheet::create_timesheet)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(timesheet::get_timesheet))
                            .route(web::put().to(timesheet::update_timesheet))
                            .route(web::delete().to(timesheet::delete_timesheet)),
                    )
                    .service(
                        web::resource("/{id}/entries").route(web::post().to(timesheet::add_entry)),
                    )
                    .service(
                        web::resource("/{id}/entries/{entry_id}")
                            .route(web::delete().to(timesheet::delete_entry)),
                    )
                    .service(
                        web::resource("/{id}/submit")
                            .route(web::post().to(timesheet::submit_timesheet)),
                    )
                    .service(
                        web::resource("/{id}/approve")
                            .route(web::post().to(timesheet::approve_timesheet)),
                    )
                    .service(
                        web::resource("/{id}/reject")
                            .route(web::post().to(timesheet::reject_timesheet)),
                    ),
            )
            .service(
                web::scope("/time_off")
                    .service(
                        web::resource("")
                            .route(web::get().to(time_off::list_time_off))
                            .route(web::post().to(time_off::create_time_off)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(time_off::get_time_off))
                            .route(web::put().to(time_off::update_time_off))
                            .route(web::delete().to(time_off::delete_time_off)),
                    )
                    .service(
                        web::resource("/{id}/approve")
                            .route(web::post().to(time_off::approve_time_off)),
                    )
                    .service(
                        web::resource("/{id}/reject")
                            .route(web::post().to(time_off::reject_time_off)),
                    ),
            )
            .service(
                web::scope("/employees")
                    .service(
                        web::resource("")
                            .route(web::get().to(employee::list_employees))
                            .route(web::post().to(employee::create_employee)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(employee::get_employee))
                            .route(web::put().to(employee::update_employee))
                            .route(web::delete().to(employee::delete_employee)),
                    ),
            )
            .service(
                web::scope("/clients")
                    .service(
                        web::resource("")
                            .route(web::get().to(client::list_clients))
                            .route(web::post().to(client::create_client)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(client::get_client))
                            .route(web::put().to(client::update_client))
                            .route(web::delete().to(client::delete_client)),
                    ),
            )
            .service(
                web::resource("/dashboard/summary")
                    .route(web::get().to(dashboard::dashboard_summary)),
            ),
    );
}

// LOGIN / SIGNUP
//  ├─ access_token (30 min)
//  └─ refresh_token (7 days, stored in refresh_tokens)

// API REQUEST
//  └─ Authorization: Bearer access_token

// ACCESS EXPIRED
//  └─ POST /auth/refresh with refresh_token
//       └─ old refresh token revoked, new pair returned

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{
        App,
        http::StatusCode,
        test::{TestRequest, call_service, init_service, read_body},
        web::Data,
    };

    #[actix_web::test]
    async fn protected_routes_require_a_token() {
        let config = Config::for_secret("test-secret");
        let app = init_service(
            App::new()
                .app_data(Data::new(config.clone()))
                .configure(|cfg| configure(cfg, &config)),
        )
        .await;

        for uri in [
            "/api/v1/timesheets",
            "/api/v1/time_off",
            "/api/v1/employees",
            "/api/v1/clients",
            "/api/v1/dashboard/summary",
            "/api/v1/auth/me",
        ] {
            let req = TestRequest::get()
                .uri(uri)
                .peer_addr("127.0.0.1:4000".parse().unwrap())
                .to_request();
            let resp = call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "{uri}");

            let body = read_body(resp).await;
            let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
            assert!(value["detail"].is_string(), "{uri}");
        }
    }

    #[test]
    fn limiter_accepts_zero_rate() {
        assert!(build_limiter(0).is_some());
        assert!(build_limiter(60).is_some());
    }

    #[test]
    fn limiter_handles_rates_above_one_per_millisecond() {
        assert!(build_limiter(120_000).is_some());
    }
}
