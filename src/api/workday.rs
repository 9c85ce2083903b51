use crate::auth::auth::AuthUser;
use crate::model::employee::fetch_employee;
use crate::model::workday::{Workday, WorkdayCheckin, WorkdayStatus};
use crate::queue::JobQueue;
use crate::settings::cached_settings;
use crate::workday::compute::WorkdayLog;
use crate::workday::service::{
    BulkOutcome, BulkWorkdayJob, CreatedWorkday, actual_employee_log, bulk_process_workdays,
    create_workday, created_workdays, date_is_in_holiday_list, get_workday, get_workday_checkins,
    recompute_workday, unmarked_days, unmarked_range,
};
use crate::utils::dates::format_dotted;
use actix_web::{HttpResponse, Responder, web};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, ToSchema)]
pub struct CreateWorkday {
    #[schema(example = 1)]
    pub employee_id: u64,
    #[schema(example = "2024-03-04", format = "date", value_type = String)]
    pub log_date: NaiveDate,
    /// Defaults to Present
    pub status: Option<WorkdayStatus>,
}

#[derive(Serialize, ToSchema)]
pub struct WorkdayResponse {
    #[serde(flatten)]
    pub workday: Workday,
    pub checkins: Vec<WorkdayCheckin>,
}

#[derive(Deserialize, IntoParams)]
pub struct EmployeeDateQuery {
    pub employee_id: u64,
    #[param(value_type = String, format = "date", example = "2024-03-04")]
    pub date: NaiveDate,
}

#[derive(Deserialize, IntoParams)]
pub struct UnmarkedQuery {
    pub employee_id: u64,
    /// English month name, e.g. "March"
    #[param(example = "March")]
    pub month: String,
    #[serde(default)]
    pub exclude_holidays: bool,
}

#[derive(Deserialize, IntoParams)]
pub struct RangeQuery {
    pub employee_id: u64,
    #[param(value_type = String, format = "date")]
    pub from: NaiveDate,
    #[param(value_type = String, format = "date")]
    pub to: NaiveDate,
}

#[derive(Serialize, ToSchema)]
pub struct HolidayResponse {
    pub is_holiday: bool,
}

async fn workday_response(pool: &MySqlPool, workday: Workday) -> actix_web::Result<WorkdayResponse> {
    let checkins = get_workday_checkins(pool, workday.id).await?;
    Ok(WorkdayResponse { workday, checkins })
}

#[utoipa::path(
    post,
    path = "/api/workday",
    request_body = CreateWorkday,
    responses(
        (status = 201, description = "Workday computed and saved", body = WorkdayResponse),
        (status = 400, description = "Validation failed", body = Object, example = json!({
            "message": "Workday already exists for employee: EMP-001, on the given date: 04.03.2024"
        })),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Workday"
)]
pub async fn create(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateWorkday>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let settings = cached_settings(pool.get_ref()).await?;
    let workday = create_workday(
        pool.get_ref(),
        &settings,
        payload.employee_id,
        payload.log_date,
        payload.status.unwrap_or(WorkdayStatus::Present),
    )
    .await?;
    Ok(HttpResponse::Created().json(workday_response(pool.get_ref(), workday).await?))
}

#[utoipa::path(
    get,
    path = "/api/workday/{id}",
    params(("id" = u64, Path, description = "Workday id")),
    responses(
        (status = 200, description = "Workday with its check-ins", body = WorkdayResponse),
        (status = 404, description = "Workday not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Workday"
)]
pub async fn get(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let workday = get_workday(pool.get_ref(), path.into_inner()).await?;
    auth.require_self_or_hr(workday.employee_id)?;
    Ok(HttpResponse::Ok().json(workday_response(pool.get_ref(), workday).await?))
}

#[utoipa::path(
    put,
    path = "/api/workday/{id}/recompute",
    params(("id" = u64, Path, description = "Workday id")),
    responses(
        (status = 200, description = "Workday recomputed", body = WorkdayResponse),
        (status = 404, description = "Workday not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Workday"
)]
pub async fn recompute(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let settings = cached_settings(pool.get_ref()).await?;
    let workday = recompute_workday(pool.get_ref(), &settings, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(workday_response(pool.get_ref(), workday).await?))
}

/// Computes the day without saving anything.
#[utoipa::path(
    get,
    path = "/api/workday/preview",
    params(EmployeeDateQuery),
    responses(
        (status = 200, description = "Computed log", body = WorkdayLog),
        (status = 400, description = "No or ambiguous Weekly Working Hours")
    ),
    security(("bearer_auth" = [])),
    tag = "Workday"
)]
pub async fn preview(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<EmployeeDateQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_self_or_hr(query.employee_id)?;
    let settings = cached_settings(pool.get_ref()).await?;
    let employee = fetch_employee(pool.get_ref(), query.employee_id).await?;
    let log = actual_employee_log(pool.get_ref(), &settings, &employee, query.date).await?;
    Ok(HttpResponse::Ok().json(log))
}

#[utoipa::path(
    post,
    path = "/api/workday/bulk",
    request_body = BulkWorkdayJob,
    responses(
        (status = 200, description = "Processed dates", body = BulkOutcome),
        (status = 400, description = "Employee inactive or no dates")
    ),
    security(("bearer_auth" = [])),
    tag = "Workday"
)]
pub async fn bulk(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<BulkWorkdayJob>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let settings = cached_settings(pool.get_ref()).await?;
    let outcome = bulk_process_workdays(pool.get_ref(), &settings, &payload).await?;
    Ok(HttpResponse::Ok().json(outcome))
}

#[utoipa::path(
    post,
    path = "/api/workday/bulk/background",
    request_body = BulkWorkdayJob,
    responses(
        (status = 202, description = "Job queued", body = Object, example = json!({
            "message": "Workday creation queued"
        }))
    ),
    security(("bearer_auth" = [])),
    tag = "Workday"
)]
pub async fn bulk_background(
    auth: AuthUser,
    queue: web::Data<JobQueue>,
    payload: web::Json<BulkWorkdayJob>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    queue.enqueue(payload.into_inner())?;
    Ok(HttpResponse::Accepted().json(serde_json::json!({
        "message": "Workday creation queued"
    })))
}

#[utoipa::path(
    get,
    path = "/api/workday/unmarked",
    params(UnmarkedQuery),
    responses(
        (status = 200, description = "Days of the month without a workday, dd.MM.yyyy", body = [String])
    ),
    security(("bearer_auth" = [])),
    tag = "Workday"
)]
pub async fn unmarked(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<UnmarkedQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_self_or_hr(query.employee_id)?;
    let today = Local::now().date_naive();
    let days = unmarked_days(
        pool.get_ref(),
        query.employee_id,
        &query.month,
        query.exclude_holidays,
        today,
    )
    .await?;
    let formatted: Vec<String> = days.into_iter().map(format_dotted).collect();
    Ok(HttpResponse::Ok().json(formatted))
}

#[utoipa::path(
    get,
    path = "/api/workday/unmarked-range",
    params(RangeQuery),
    responses(
        (status = 200, description = "Dates without a workday in the range", body = [String])
    ),
    security(("bearer_auth" = [])),
    tag = "Workday"
)]
pub async fn unmarked_in_range(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<RangeQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_self_or_hr(query.employee_id)?;
    let days = unmarked_range(pool.get_ref(), query.employee_id, query.from, query.to).await?;
    Ok(HttpResponse::Ok().json(days))
}

#[utoipa::path(
    get,
    path = "/api/workday/created",
    params(RangeQuery),
    responses(
        (status = 200, description = "Workdays in the range", body = [CreatedWorkday])
    ),
    security(("bearer_auth" = [])),
    tag = "Workday"
)]
pub async fn created(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<RangeQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_self_or_hr(query.employee_id)?;
    let rows = created_workdays(pool.get_ref(), query.employee_id, query.from, query.to).await?;
    Ok(HttpResponse::Ok().json(rows))
}

#[utoipa::path(
    get,
    path = "/api/workday/holiday",
    params(EmployeeDateQuery),
    responses(
        (status = 200, description = "Whether the date is in the employee's holiday list", body = HolidayResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Workday"
)]
pub async fn is_holiday(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<EmployeeDateQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_self_or_hr(query.employee_id)?;
    let employee = fetch_employee(pool.get_ref(), query.employee_id).await?;
    let is_holiday = date_is_in_holiday_list(pool.get_ref(), &employee, query.date).await?;
    Ok(HttpResponse::Ok().json(HolidayResponse { is_holiday }))
}
