use crate::auth::auth::AuthUser;
use crate::error::HrResult;
use crate::model::employee::fetch_active_employee;
use crate::model::employee_checkin::{EmployeeCheckin, LogType};
use crate::workday::service::employee_checkins;
use actix_web::{HttpResponse, Responder, web};
use chrono::{Local, NaiveDate, NaiveDateTime};
use serde::Deserialize;
use sqlx::MySqlPool;
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, ToSchema)]
pub struct CheckinReq {
    #[schema(example = "IN")]
    pub log_type: LogType,
}

#[derive(Deserialize, ToSchema)]
pub struct RecordCheckinReq {
    #[schema(example = 1)]
    pub employee_id: u64,
    #[schema(example = "OUT")]
    pub log_type: LogType,
    #[schema(example = "2024-03-04T16:30:00", value_type = String, format = "date-time")]
    pub time: NaiveDateTime,
    #[serde(default)]
    pub skip_auto_attendance: bool,
}

#[derive(Deserialize, IntoParams)]
pub struct CheckinQuery {
    /// Defaults to the caller's own employee
    pub employee_id: Option<u64>,
    #[param(value_type = String, format = "date", example = "2024-03-04")]
    pub date: NaiveDate,
}

async fn insert_checkin(
    pool: &MySqlPool,
    employee_id: u64,
    log_type: LogType,
    time: NaiveDateTime,
    skip_auto_attendance: bool,
) -> HrResult<EmployeeCheckin> {
    fetch_active_employee(pool, employee_id).await?;

    let result = sqlx::query(
        r#"
        INSERT INTO employee_checkins (employee_id, log_type, time, skip_auto_attendance)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(employee_id)
    .bind(log_type.as_ref())
    .bind(time)
    .bind(skip_auto_attendance)
    .execute(pool)
    .await?;

    tracing::info!(employee_id, log_type = %log_type, %time, "Check-in recorded");
    Ok(EmployeeCheckin {
        id: result.last_insert_id(),
        employee_id,
        log_type: log_type.to_string(),
        time,
        skip_auto_attendance,
        attendance_id: None,
    })
}

/// Records an IN or OUT event for the caller at the current time.
#[utoipa::path(
    post,
    path = "/api/checkin",
    request_body = CheckinReq,
    responses(
        (status = 201, description = "Check-in recorded", body = EmployeeCheckin),
        (status = 400, description = "Employee not active"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "No employee profile")
    ),
    security(("bearer_auth" = [])),
    tag = "Checkin"
)]
pub async fn check_in(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CheckinReq>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.own_employee_id()?;
    let now = Local::now().naive_local();
    let checkin = insert_checkin(pool.get_ref(), employee_id, payload.log_type, now, false).await?;
    Ok(HttpResponse::Created().json(checkin))
}

/// Records an event for any employee at a given time (HR/Admin).
#[utoipa::path(
    post,
    path = "/api/checkin/record",
    request_body = RecordCheckinReq,
    responses(
        (status = 201, description = "Check-in recorded", body = EmployeeCheckin),
        (status = 400, description = "Employee not active"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Employee not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Checkin"
)]
pub async fn record_checkin(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<RecordCheckinReq>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let checkin = insert_checkin(
        pool.get_ref(),
        payload.employee_id,
        payload.log_type,
        payload.time,
        payload.skip_auto_attendance,
    )
    .await?;
    Ok(HttpResponse::Created().json(checkin))
}

#[utoipa::path(
    get,
    path = "/api/checkin",
    params(CheckinQuery),
    responses(
        (status = 200, description = "Events of the day in time order", body = [EmployeeCheckin]),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Checkin"
)]
pub async fn list_checkins(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<CheckinQuery>,
) -> actix_web::Result<impl Responder> {
    let employee_id = match query.employee_id {
        Some(id) => id,
        None => auth.own_employee_id()?,
    };
    auth.require_self_or_hr(employee_id)?;

    let checkins = employee_checkins(pool.get_ref(), employee_id, query.date).await?;
    Ok(HttpResponse::Ok().json(checkins))
}
