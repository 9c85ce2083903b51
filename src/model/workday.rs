use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema)]
pub enum WorkdayStatus {
    Present,
    Absent,
    #[strum(serialize = "Half Day")]
    #[serde(rename = "Half Day")]
    HalfDay,
    #[strum(serialize = "On Leave")]
    #[serde(rename = "On Leave")]
    OnLeave,
    #[strum(serialize = "Work From Home")]
    #[serde(rename = "Work From Home")]
    WorkFromHome,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Workday {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = 1)]
    pub employee_id: u64,
    #[schema(example = "Acme GmbH")]
    pub company: String,
    #[schema(example = "2024-03-04", format = "date", value_type = String)]
    pub log_date: NaiveDate,
    #[schema(example = "Present")]
    pub status: String,
    pub hours_worked: f64,
    pub break_hours: f64,
    pub total_work_seconds: f64,
    pub total_break_seconds: f64,
    pub target_hours: f64,
    pub total_target_seconds: f64,
    pub expected_break_hours: f64,
    pub break_minutes: i64,
    pub actual_working_hours: f64,
    pub manual_workday: bool,
    #[schema(format = "date-time", value_type = Option<String>)]
    pub first_checkin: Option<NaiveDateTime>,
    #[schema(format = "date-time", value_type = Option<String>)]
    pub last_checkout: Option<NaiveDateTime>,
    pub attendance_id: Option<u64>,
}

pub const WORKDAY_COLUMNS: &str = "id, employee_id, company, log_date, status, hours_worked, \
    break_hours, total_work_seconds, total_break_seconds, target_hours, total_target_seconds, \
    expected_break_hours, break_minutes, actual_working_hours, manual_workday, first_checkin, \
    last_checkout, attendance_id";

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct WorkdayCheckin {
    pub checkin_id: u64,
    #[schema(example = "IN")]
    pub log_type: String,
    #[schema(format = "date-time", value_type = String)]
    pub log_time: NaiveDateTime,
    pub skip_auto_attendance: bool,
}
