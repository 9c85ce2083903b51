use crate::{
    api::{checkin, leave_application, report, settings, weekly_working_hours, workday},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use std::sync::Arc;

// Helper to build per-route limiter
fn build_limiter(requests_per_min: u32) -> anyhow::Result<Governor<PeerIpKeyExtractor, NoOpMiddleware>> {
    let requests_per_min = requests_per_min.max(1);
    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(60_000 / requests_per_min as u64)
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .ok_or_else(|| anyhow::anyhow!("invalid rate limit: {requests_per_min} per minute"))?;
    Ok(Governor::new(&cfg))
}

/// Per-scope rate limiters, built once at startup.
#[derive(Clone)]
pub struct Limiters {
    login: Arc<Governor<PeerIpKeyExtractor, NoOpMiddleware>>,
    refresh: Arc<Governor<PeerIpKeyExtractor, NoOpMiddleware>>,
    protected: Arc<Governor<PeerIpKeyExtractor, NoOpMiddleware>>,
}

impl Limiters {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            login: Arc::new(build_limiter(config.rate_login_per_min)?),
            refresh: Arc::new(build_limiter(config.rate_refresh_per_min)?),
            protected: Arc::new(build_limiter(config.rate_protected_per_min)?),
        })
    }
}

pub fn configure(cfg: &mut web::ServiceConfig, config: &Config, limiters: Limiters) {
    // Public routes
    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/login")
                    .wrap(limiters.login.clone())
                    .route(web::post().to(handlers::login)),
            )
            .service(
                web::resource("/refresh")
                    .wrap(limiters.refresh.clone())
                    .route(web::post().to(handlers::refresh_token)),
            )
            .service(
                web::resource("/logout")
                    .wrap(limiters.login.clone())
                    .route(web::post().to(handlers::logout)),
            ),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware))
            .wrap(limiters.protected.clone())
            .service(
                web::scope("/checkin")
                    .service(
                        web::resource("")
                            .route(web::post().to(checkin::check_in))
                            .route(web::get().to(checkin::list_checkins)),
                    )
                    .service(web::resource("/record").route(web::post().to(checkin::record_checkin))),
            )
            .service(
                web::scope("/workday")
                    .service(web::resource("").route(web::post().to(workday::create)))
                    // fixed segments before /{id}
                    .service(web::resource("/preview").route(web::get().to(workday::preview)))
                    .service(web::resource("/bulk").route(web::post().to(workday::bulk)))
                    .service(
                        web::resource("/bulk/background")
                            .route(web::post().to(workday::bulk_background)),
                    )
                    .service(web::resource("/unmarked").route(web::get().to(workday::unmarked)))
                    .service(
                        web::resource("/unmarked-range")
                            .route(web::get().to(workday::unmarked_in_range)),
                    )
                    .service(web::resource("/created").route(web::get().to(workday::created)))
                    .service(web::resource("/holiday").route(web::get().to(workday::is_holiday)))
                    .service(web::resource("/{id}").route(web::get().to(workday::get)))
                    .service(
                        web::resource("/{id}/recompute").route(web::put().to(workday::recompute)),
                    ),
            )
            .service(
                web::scope("/weekly-working-hours")
                    .service(
                        web::resource("")
                            .route(web::post().to(weekly_working_hours::create))
                            .route(web::get().to(weekly_working_hours::list)),
                    )
                    .service(
                        web::resource("/update-year")
                            .route(web::post().to(weekly_working_hours::set_year)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(weekly_working_hours::get))
                            .route(web::put().to(weekly_working_hours::update)),
                    ),
            )
            .service(
                web::scope("/leave")
                    // /leave
                    .service(
                        web::resource("")
                            .route(web::get().to(leave_application::leave_list))
                            .route(web::post().to(leave_application::create_leave)),
                    )
                    // /leave/{id}
                    .service(
                        web::resource("/{id}").route(web::get().to(leave_application::get_leave)),
                    )
                    .service(
                        web::resource("/{id}/approve")
                            .route(web::put().to(leave_application::approve_leave)),
                    )
                    .service(
                        web::resource("/{id}/reject")
                            .route(web::put().to(leave_application::reject_leave)),
                    )
                    .service(
                        web::resource("/{id}/cancel")
                            .route(web::put().to(leave_application::cancel_leave)),
                    ),
            )
            .service(
                web::scope("/report")
                    .service(web::resource("/work-hour").route(web::get().to(report::work_hour))),
            )
            .service(
                web::scope("/settings")
                    .service(
                        web::resource("")
                            .route(web::get().to(settings::get_settings))
                            .route(web::put().to(settings::update_settings)),
                    )
                    .service(
                        web::resource("/anniversary-recipients")
                            .route(web::get().to(settings::get_anniversary_recipients))
                            .route(web::put().to(settings::update_anniversary_recipients)),
                    )
                    .service(web::resource("/ics").route(web::get().to(settings::download_ics)))
                    .service(
                        web::resource("/ics/regenerate")
                            .route(web::post().to(settings::regenerate_ics)),
                    ),
            ),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_rate_is_clamped_instead_of_failing() {
        assert!(build_limiter(0).is_ok());
        assert!(build_limiter(60).is_ok());
    }
}

// LOGIN
//  ├─ access_token
//  └─ refresh_token

// API REQUEST
//  └─ Authorization: Bearer access_token

// ACCESS EXPIRED
//  └─ POST /auth/refresh with refresh_token
//       └─ returns a new pair, the old refresh token is revoked
