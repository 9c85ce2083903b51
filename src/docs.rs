use crate::api::checkin::{CheckinReq, RecordCheckinReq};
use crate::api::leave_application::{CreateLeave, LeaveFilter, LeaveListResponse};
use crate::api::settings::AnniversaryRecipients;
use crate::api::workday::{CreateWorkday, HolidayResponse, WorkdayResponse};
use crate::auth::handlers::{LoginReqDto, LoginResponse};
use crate::model::employee_checkin::{EmployeeCheckin, LogType};
use crate::model::leave_application::{LeaveApplication, LeaveStatus};
use crate::model::settings::{AlertChannel, BreakCalculationMode, HrAddonSettings};
use crate::model::weekly_working_hours::{DailyHoursDetail, WeeklyWorkingHours};
use crate::model::workday::{Workday, WorkdayCheckin, WorkdayStatus};
use crate::report::work_hour::{ReportColumn, WorkHourReport, WorkHourRow};
use crate::weekly_hours::{FiscalYearRange, WeeklyWorkingHoursDetail, WeeklyWorkingHoursReq};
use crate::workday::compute::WorkdayLog;
use crate::workday::service::{BulkFlag, BulkOutcome, BulkWorkdayJob, CreatedWorkday};
use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "HR Addon API",
        version = "0.1.0",
        description = r#"
## HR Addon

Time tracking and HR automation on top of an employee database.

### Key Features
- **Workdays**
  - Daily work log computed from check-ins against weekly target hours
  - Bulk and background creation of missing workdays
- **Weekly Working Hours**
  - Per-employee target hours per weekday with overlap checks
- **Leave**
  - Leave applications exported as an iCalendar file
- **Reports**
  - Work hour report with target differences
- **Notifications**
  - Work anniversary reminders and failed scheduled job alerts

### Security
All `/api` endpoints require a **JWT Bearer** access token.
"#,
    ),
    paths(
        crate::auth::handlers::login,
        crate::auth::handlers::refresh_token,
        crate::auth::handlers::logout,

        crate::api::checkin::check_in,
        crate::api::checkin::record_checkin,
        crate::api::checkin::list_checkins,

        crate::api::workday::create,
        crate::api::workday::get,
        crate::api::workday::recompute,
        crate::api::workday::preview,
        crate::api::workday::bulk,
        crate::api::workday::bulk_background,
        crate::api::workday::unmarked,
        crate::api::workday::unmarked_in_range,
        crate::api::workday::created,
        crate::api::workday::is_holiday,

        crate::api::weekly_working_hours::create,
        crate::api::weekly_working_hours::list,
        crate::api::weekly_working_hours::get,
        crate::api::weekly_working_hours::update,
        crate::api::weekly_working_hours::set_year,

        crate::api::leave_application::leave_list,
        crate::api::leave_application::get_leave,
        crate::api::leave_application::create_leave,
        crate::api::leave_application::approve_leave,
        crate::api::leave_application::reject_leave,
        crate::api::leave_application::cancel_leave,

        crate::api::report::work_hour,

        crate::api::settings::get_settings,
        crate::api::settings::update_settings,
        crate::api::settings::get_anniversary_recipients,
        crate::api::settings::update_anniversary_recipients,
        crate::api::settings::download_ics,
        crate::api::settings::regenerate_ics
    ),
    components(
        schemas(
            LoginReqDto,
            LoginResponse,
            CheckinReq,
            RecordCheckinReq,
            EmployeeCheckin,
            LogType,
            CreateWorkday,
            WorkdayResponse,
            HolidayResponse,
            Workday,
            WorkdayCheckin,
            WorkdayStatus,
            WorkdayLog,
            BulkFlag,
            BulkWorkdayJob,
            BulkOutcome,
            CreatedWorkday,
            WeeklyWorkingHours,
            DailyHoursDetail,
            WeeklyWorkingHoursReq,
            WeeklyWorkingHoursDetail,
            FiscalYearRange,
            CreateLeave,
            LeaveFilter,
            LeaveApplication,
            LeaveStatus,
            LeaveListResponse,
            ReportColumn,
            WorkHourRow,
            WorkHourReport,
            HrAddonSettings,
            BreakCalculationMode,
            AlertChannel,
            AnniversaryRecipients
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Login and token rotation"),
        (name = "Checkin", description = "Employee check-in events"),
        (name = "Workday", description = "Daily work logs"),
        (name = "Weekly Working Hours", description = "Target hours per weekday"),
        (name = "Leave", description = "Leave management APIs"),
        (name = "Report", description = "Reports"),
        (name = "Settings", description = "HR addon settings and calendar export"),
    )
)]
pub struct ApiDoc;

pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_declares_bearer_scheme() {
        let doc = ApiDoc::openapi();
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
        assert!(doc.paths.paths.contains_key("/api/workday/{id}"));
    }
}
