use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum LogType {
    In,
    Out,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct EmployeeCheckin {
    #[schema(example = 10)]
    pub id: u64,
    #[schema(example = 1)]
    pub employee_id: u64,
    #[schema(example = "IN")]
    pub log_type: String,
    #[schema(example = "2024-03-04T08:00:00", value_type = String, format = "date-time")]
    pub time: NaiveDateTime,
    pub skip_auto_attendance: bool,
    pub attendance_id: Option<u64>,
}
