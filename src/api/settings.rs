use crate::auth::auth::AuthUser;
use crate::calendar::export::{export_path, read_calendar, regenerate_calendar};
use crate::config::Config;
use crate::error::HrError;
use crate::model::settings::HrAddonSettings;
use crate::settings::{
    anniversary_recipient_ids, cached_settings, save_settings, set_anniversary_recipients,
};
use actix_web::{HttpResponse, Responder, http::header, web};
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use utoipa::ToSchema;

#[derive(Serialize, Deserialize, ToSchema)]
pub struct AnniversaryRecipients {
    #[schema(example = json!([1, 2]))]
    pub employee_ids: Vec<u64>,
}

#[utoipa::path(
    get,
    path = "/api/settings",
    responses(
        (status = 200, description = "Current settings", body = HrAddonSettings),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Settings"
)]
pub async fn get_settings(auth: AuthUser, pool: web::Data<MySqlPool>) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let settings = cached_settings(pool.get_ref()).await?;
    Ok(HttpResponse::Ok().json(settings))
}

/// Saves the settings and rewrites the calendar export under its
/// (possibly new) name.
#[utoipa::path(
    put,
    path = "/api/settings",
    request_body = HrAddonSettings,
    responses(
        (status = 200, description = "Settings saved", body = HrAddonSettings),
        (status = 400, description = "Invalid settings"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Settings"
)]
pub async fn update_settings(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    payload: web::Json<HrAddonSettings>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;
    let settings = payload.into_inner();
    save_settings(pool.get_ref(), &settings, &config.ics_default_dir).await?;
    tracing::info!(user = %auth.username, "HR addon settings updated");

    if let Err(e) = regenerate_calendar(pool.get_ref(), &settings, &config.ics_default_dir).await {
        tracing::warn!(error = %e, "Calendar export after settings change failed");
    }
    Ok(HttpResponse::Ok().json(settings))
}

#[utoipa::path(
    get,
    path = "/api/settings/anniversary-recipients",
    responses((status = 200, description = "Employees receiving anniversary reminders", body = AnniversaryRecipients)),
    security(("bearer_auth" = [])),
    tag = "Settings"
)]
pub async fn get_anniversary_recipients(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let employee_ids = anniversary_recipient_ids(pool.get_ref()).await?;
    Ok(HttpResponse::Ok().json(AnniversaryRecipients { employee_ids }))
}

#[utoipa::path(
    put,
    path = "/api/settings/anniversary-recipients",
    request_body = AnniversaryRecipients,
    responses(
        (status = 200, description = "Recipients replaced", body = AnniversaryRecipients),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Settings"
)]
pub async fn update_anniversary_recipients(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<AnniversaryRecipients>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    set_anniversary_recipients(pool.get_ref(), &payload.employee_ids).await?;
    let employee_ids = anniversary_recipient_ids(pool.get_ref()).await?;
    Ok(HttpResponse::Ok().json(AnniversaryRecipients { employee_ids }))
}

/// Downloads the exported leave calendar.
#[utoipa::path(
    get,
    path = "/api/settings/ics",
    responses(
        (status = 200, description = "iCalendar file", content_type = "text/calendar", body = String),
        (status = 404, description = "File not yet exported")
    ),
    security(("bearer_auth" = [])),
    tag = "Settings"
)]
pub async fn download_ics(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> actix_web::Result<impl Responder> {
    let settings = cached_settings(pool.get_ref()).await?;
    let path = export_path(&settings, &config.ics_default_dir);
    let content = read_calendar(&path).await?;

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| HrError::NotFound("Calendar file has no name".to_string()))?
        .to_string();

    Ok(HttpResponse::Ok()
        .content_type("text/calendar; charset=utf-8")
        .insert_header((
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{file_name}\""),
        ))
        .body(content))
}

/// Rebuilds the calendar export from all leave applications.
#[utoipa::path(
    post,
    path = "/api/settings/ics/regenerate",
    responses(
        (status = 200, description = "Export rewritten", body = Object, example = json!({
            "path": "/var/lib/hr_addon/leave_calendar.ics"
        })),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Settings"
)]
pub async fn regenerate_ics(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let settings = cached_settings(pool.get_ref()).await?;
    let path = regenerate_calendar(pool.get_ref(), &settings, &config.ics_default_dir).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "path": path.display().to_string() })))
}
