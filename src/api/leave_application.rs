use crate::auth::auth::AuthUser;
use crate::calendar::export::regenerate_calendar;
use crate::config::Config;
use crate::error::{HrError, HrResult};
use crate::model::employee::fetch_active_employee;
use crate::model::leave_application::{LeaveApplication, LeaveStatus};
use crate::settings::cached_settings;
use crate::utils::error_log::log_error;
use actix_web::{HttpResponse, Responder, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, ToSchema)]
pub struct CreateLeave {
    /// Defaults to the caller's own employee; HR may apply for anyone
    pub employee_id: Option<u64>,
    #[schema(example = "Annual Leave")]
    pub leave_type: String,
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub from_date: NaiveDate,
    #[schema(example = "2026-01-03", format = "date", value_type = String)]
    pub to_date: NaiveDate,
    #[serde(default)]
    pub half_day: bool,
    pub description: Option<String>,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct LeaveFilter {
    #[schema(example = 123)]
    /// Filter by employee ID
    pub employee_id: Option<u64>,
    #[schema(example = "Approved")]
    /// Filter by leave status
    pub status: Option<LeaveStatus>,
    #[schema(example = 1)]
    /// Pagination page number (start with 1)
    pub page: Option<u64>,
    #[schema(example = 10)]
    /// Pagination per page number
    pub per_page: Option<u64>,
}

#[derive(Serialize, ToSchema)]
pub struct LeaveListResponse {
    pub data: Vec<LeaveApplication>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 10)]
    pub per_page: u32,
    #[schema(example = 1)]
    pub total: i64,
}

// Helper enum for typed SQLx binding
enum FilterValue<'a> {
    U64(u64),
    Str(&'a str),
}

const LEAVE_COLUMNS: &str =
    "id, employee_id, leave_type, from_date, to_date, half_day, status, description, created_at";

/// `(page, per_page, offset)` with the page clamped to `1..=u32::MAX` and
/// `per_page` to `1..=100`.
pub fn page_window(page: Option<u64>, per_page: Option<u64>) -> (u32, u32, u64) {
    let per_page = per_page.unwrap_or(10).clamp(1, 100) as u32;
    let page = page.unwrap_or(1).clamp(1, u64::from(u32::MAX)) as u32;
    let offset = u64::from(page - 1).saturating_mul(u64::from(per_page));
    (page, per_page, offset)
}

/// Allowed status transitions.
pub fn can_transition(from: LeaveStatus, to: LeaveStatus) -> bool {
    matches!(
        (from, to),
        (LeaveStatus::Open, LeaveStatus::Approved)
            | (LeaveStatus::Open, LeaveStatus::Rejected)
            | (LeaveStatus::Open, LeaveStatus::Cancelled)
            | (LeaveStatus::Approved, LeaveStatus::Cancelled)
    )
}

async fn fetch_leave(pool: &MySqlPool, leave_id: u64) -> HrResult<LeaveApplication> {
    let sql = format!("SELECT {LEAVE_COLUMNS} FROM leave_applications WHERE id = ?");
    sqlx::query_as::<_, LeaveApplication>(&sql)
        .bind(leave_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| HrError::NotFound("Leave application not found".to_string()))
}

/// Rewrites the calendar export after a leave change. Export failures are
/// logged and do not undo the change.
async fn refresh_calendar(pool: &MySqlPool, config: &Config) {
    let result = match cached_settings(pool).await {
        Ok(settings) => regenerate_calendar(pool, &settings, &config.ics_default_dir)
            .await
            .map(|_| ()),
        Err(e) => Err(e),
    };
    if let Err(e) = result {
        log_error(pool, "Leave calendar export failed", &e.to_string()).await;
    }
}

async fn set_status(
    pool: &MySqlPool,
    config: &Config,
    leave_id: u64,
    to: LeaveStatus,
) -> HrResult<LeaveApplication> {
    let leave = fetch_leave(pool, leave_id).await?;
    let from = leave
        .status
        .parse::<LeaveStatus>()
        .map_err(|_| HrError::Validation(format!("Unknown leave status '{}'", leave.status)))?;
    if !can_transition(from, to) {
        return Err(HrError::Validation(format!(
            "Leave application is {} and cannot be {}",
            from,
            to.as_ref().to_lowercase()
        )));
    }

    let result = sqlx::query("UPDATE leave_applications SET status = ? WHERE id = ? AND status = ?")
        .bind(to.as_ref())
        .bind(leave_id)
        .bind(from.as_ref())
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(HrError::validation("Leave application was changed concurrently"));
    }

    tracing::info!(leave_id, from = %from, to = %to, "Leave status changed");
    refresh_calendar(pool, config).await;
    fetch_leave(pool, leave_id).await
}

#[utoipa::path(
    post,
    path = "/api/leave",
    request_body(content = CreateLeave, description = "Leave application payload", content_type = "application/json"),
    responses(
        (status = 201, description = "Leave application created", body = LeaveApplication),
        (status = 400, description = "Bad request"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn create_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    payload: web::Json<CreateLeave>,
) -> actix_web::Result<impl Responder> {
    let employee_id = match payload.employee_id {
        Some(id) => id,
        None => auth.own_employee_id()?,
    };
    auth.require_self_or_hr(employee_id)?;

    if payload.from_date > payload.to_date {
        return Err(HrError::validation("from_date cannot be after to_date").into());
    }
    if payload.leave_type.trim().is_empty() {
        return Err(HrError::validation("Leave type is required").into());
    }
    fetch_active_employee(pool.get_ref(), employee_id).await?;

    let result = sqlx::query(
        r#"
        INSERT INTO leave_applications
            (employee_id, leave_type, from_date, to_date, half_day, status, description)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(employee_id)
    .bind(payload.leave_type.trim())
    .bind(payload.from_date)
    .bind(payload.to_date)
    .bind(payload.half_day)
    .bind(LeaveStatus::Open.as_ref())
    .bind(payload.description.as_deref())
    .execute(pool.get_ref())
    .await
    .map_err(HrError::from)?;

    refresh_calendar(pool.get_ref(), &config).await;
    let leave = fetch_leave(pool.get_ref(), result.last_insert_id()).await?;
    Ok(HttpResponse::Created().json(leave))
}

#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/approve",
    params(("leave_id" = u64, Path, description = "ID of the leave application to approve")),
    responses(
        (status = 200, description = "Leave approved", body = LeaveApplication),
        (status = 400, description = "Leave application already processed"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave application not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn approve_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let leave = set_status(pool.get_ref(), &config, path.into_inner(), LeaveStatus::Approved).await?;
    Ok(HttpResponse::Ok().json(leave))
}

#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/reject",
    params(("leave_id" = u64, Path, description = "ID of the leave application to reject")),
    responses(
        (status = 200, description = "Leave rejected", body = LeaveApplication),
        (status = 400, description = "Leave application already processed"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave application not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn reject_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let leave = set_status(pool.get_ref(), &config, path.into_inner(), LeaveStatus::Rejected).await?;
    Ok(HttpResponse::Ok().json(leave))
}

#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/cancel",
    params(("leave_id" = u64, Path, description = "ID of the leave application to cancel")),
    responses(
        (status = 200, description = "Leave cancelled", body = LeaveApplication),
        (status = 400, description = "Leave application cannot be cancelled"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave application not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn cancel_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let leave_id = path.into_inner();
    let leave = fetch_leave(pool.get_ref(), leave_id).await?;
    auth.require_self_or_hr(leave.employee_id)?;
    let leave = set_status(pool.get_ref(), &config, leave_id, LeaveStatus::Cancelled).await?;
    Ok(HttpResponse::Ok().json(leave))
}

#[utoipa::path(
    get,
    path = "/api/leave/{leave_id}",
    params(("leave_id" = u64, Path, description = "ID of the leave application to fetch")),
    responses(
        (status = 200, description = "Leave application found", body = LeaveApplication),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave application not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn get_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let leave = fetch_leave(pool.get_ref(), path.into_inner()).await?;
    auth.require_self_or_hr(leave.employee_id)?;
    Ok(HttpResponse::Ok().json(leave))
}

#[utoipa::path(
    get,
    path = "/api/leave",
    params(LeaveFilter),
    responses(
        (status = 200, description = "Paginated leave list", body = LeaveListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn leave_list(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<LeaveFilter>,
) -> actix_web::Result<impl Responder> {
    // employees only ever see their own applications
    let employee_id = if auth.is_hr_or_admin() {
        query.employee_id
    } else {
        Some(auth.own_employee_id()?)
    };

    let (page, per_page, offset) = page_window(query.page, query.per_page);

    let mut where_sql = String::from(" WHERE 1=1");
    let mut args: Vec<FilterValue> = Vec::new();

    if let Some(emp_id) = employee_id {
        where_sql.push_str(" AND employee_id = ?");
        args.push(FilterValue::U64(emp_id));
    }

    if let Some(status) = query.status.as_ref() {
        where_sql.push_str(" AND status = ?");
        args.push(FilterValue::Str(status.as_ref()));
    }

    let count_sql = format!("SELECT COUNT(*) FROM leave_applications{}", where_sql);
    let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
    for arg in &args {
        count_q = match arg {
            FilterValue::U64(v) => count_q.bind(*v),
            FilterValue::Str(s) => count_q.bind(*s),
        };
    }
    let total = count_q.fetch_one(pool.get_ref()).await.map_err(HrError::from)?;

    let data_sql = format!(
        "SELECT {LEAVE_COLUMNS} FROM leave_applications{} ORDER BY created_at DESC LIMIT ? OFFSET ?",
        where_sql
    );
    let mut data_q = sqlx::query_as::<_, LeaveApplication>(&data_sql);
    for arg in args {
        data_q = match arg {
            FilterValue::U64(v) => data_q.bind(v),
            FilterValue::Str(s) => data_q.bind(s),
        };
    }
    let leaves = data_q
        .bind(per_page)
        .bind(offset)
        .fetch_all(pool.get_ref())
        .await
        .map_err(HrError::from)?;

    Ok(HttpResponse::Ok().json(LeaveListResponse {
        data: leaves,
        page,
        per_page,
        total,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_open_leaves_are_decided() {
        assert!(can_transition(LeaveStatus::Open, LeaveStatus::Approved));
        assert!(can_transition(LeaveStatus::Open, LeaveStatus::Rejected));
        assert!(!can_transition(LeaveStatus::Approved, LeaveStatus::Rejected));
        assert!(!can_transition(LeaveStatus::Rejected, LeaveStatus::Approved));
    }

    #[test]
    fn pagination_defaults_and_limits() {
        assert_eq!(page_window(None, None), (1, 10, 0));
        assert_eq!(page_window(Some(0), Some(0)), (1, 1, 0));
        assert_eq!(page_window(Some(3), Some(500)), (3, 100, 200));
    }

    #[test]
    fn huge_page_does_not_overflow() {
        let (page, per_page, offset) = page_window(Some(u64::MAX), Some(100));
        assert_eq!(page, u32::MAX);
        assert_eq!(per_page, 100);
        assert_eq!(offset, u64::from(u32::MAX - 1) * 100);
    }

    #[test]
    fn approved_leave_can_still_be_cancelled() {
        assert!(can_transition(LeaveStatus::Approved, LeaveStatus::Cancelled));
        assert!(!can_transition(LeaveStatus::Cancelled, LeaveStatus::Approved));
        assert!(!can_transition(LeaveStatus::Cancelled, LeaveStatus::Cancelled));
    }
}
