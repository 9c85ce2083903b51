use crate::auth::auth::AuthUser;
use crate::report::work_hour::{WorkHourFilter, WorkHourReport, work_hour_report};
use actix_web::{HttpResponse, Responder, web};
use sqlx::MySqlPool;

/// Work hours per workday with the target differences. Employees only see
/// their own rows.
#[utoipa::path(
    get,
    path = "/api/report/work-hour",
    params(WorkHourFilter),
    responses(
        (status = 200, description = "Report columns and rows", body = WorkHourReport),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Report"
)]
pub async fn work_hour(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<WorkHourFilter>,
) -> actix_web::Result<impl Responder> {
    let mut filter = query.into_inner();
    if !auth.is_hr_or_admin() {
        let own = auth.own_employee_id()?;
        auth.require_self_or_hr(filter.employee_id.unwrap_or(own))?;
        filter.employee_id = Some(own);
    }

    let report = work_hour_report(pool.get_ref(), &filter).await?;
    Ok(HttpResponse::Ok().json(report))
}
