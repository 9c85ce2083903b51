use crate::auth::auth::AuthUser;
use crate::model::weekly_working_hours::WeeklyWorkingHours;
use crate::weekly_hours::{
    FiscalYearRange, WeeklyWorkingHoursDetail, WeeklyWorkingHoursReq, create_weekly_working_hours,
    get_weekly_working_hours, list_weekly_working_hours, update_weekly_working_hours, update_year,
};
use actix_web::{HttpResponse, Responder, web};
use chrono::Local;
use serde::Deserialize;
use sqlx::MySqlPool;
use utoipa::IntoParams;

#[derive(Deserialize, IntoParams)]
pub struct WeeklyHoursQuery {
    pub employee_id: u64,
}

#[utoipa::path(
    post,
    path = "/api/weekly-working-hours",
    request_body = WeeklyWorkingHoursReq,
    responses(
        (status = 201, description = "Created", body = WeeklyWorkingHoursDetail),
        (status = 400, description = "Inactive employee, missing dates or overlapping record")
    ),
    security(("bearer_auth" = [])),
    tag = "Weekly Working Hours"
)]
pub async fn create(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<WeeklyWorkingHoursReq>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let today = Local::now().date_naive();
    let created = create_weekly_working_hours(pool.get_ref(), &payload, today).await?;
    Ok(HttpResponse::Created().json(created))
}

#[utoipa::path(
    get,
    path = "/api/weekly-working-hours",
    params(WeeklyHoursQuery),
    responses((status = 200, description = "Records of the employee", body = [WeeklyWorkingHours])),
    security(("bearer_auth" = [])),
    tag = "Weekly Working Hours"
)]
pub async fn list(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<WeeklyHoursQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_self_or_hr(query.employee_id)?;
    let rows = list_weekly_working_hours(pool.get_ref(), query.employee_id).await?;
    Ok(HttpResponse::Ok().json(rows))
}

#[utoipa::path(
    get,
    path = "/api/weekly-working-hours/{id}",
    params(("id" = u64, Path, description = "Weekly Working Hours id")),
    responses(
        (status = 200, description = "Record with daily hours", body = WeeklyWorkingHoursDetail),
        (status = 404, description = "Not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Weekly Working Hours"
)]
pub async fn get(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let detail = get_weekly_working_hours(pool.get_ref(), path.into_inner()).await?;
    auth.require_self_or_hr(detail.record.employee_id)?;
    Ok(HttpResponse::Ok().json(detail))
}

#[utoipa::path(
    put,
    path = "/api/weekly-working-hours/{id}",
    params(("id" = u64, Path, description = "Weekly Working Hours id")),
    request_body = WeeklyWorkingHoursReq,
    responses(
        (status = 200, description = "Updated", body = WeeklyWorkingHoursDetail),
        (status = 400, description = "Validation failed")
    ),
    security(("bearer_auth" = [])),
    tag = "Weekly Working Hours"
)]
pub async fn update(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<WeeklyWorkingHoursReq>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let updated = update_weekly_working_hours(pool.get_ref(), path.into_inner(), &payload).await?;
    Ok(HttpResponse::Ok().json(updated))
}

/// Moves all permanent employees' records onto the active fiscal year.
#[utoipa::path(
    post,
    path = "/api/weekly-working-hours/update-year",
    responses(
        (status = 200, description = "Dates applied", body = FiscalYearRange),
        (status = 400, description = "No active fiscal year found.")
    ),
    security(("bearer_auth" = [])),
    tag = "Weekly Working Hours"
)]
pub async fn set_year(auth: AuthUser, pool: web::Data<MySqlPool>) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let range = update_year(pool.get_ref()).await?;
    Ok(HttpResponse::Ok().json(range))
}
