use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct WeeklyWorkingHours {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = "AC-2024-EMP-001-0001")]
    pub title: String,
    #[schema(example = 1)]
    pub employee_id: u64,
    #[schema(example = "Acme GmbH")]
    pub company: String,
    #[schema(example = "2024-01-01", format = "date", value_type = String)]
    pub valid_from: NaiveDate,
    #[schema(example = "2024-12-31", format = "date", value_type = String)]
    pub valid_to: NaiveDate,
    pub no_break_hours: bool,
    pub set_target_hours_to_zero_when_date_is_holiday: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct DailyHoursDetail {
    /// Weekday name, e.g. "Monday"
    #[schema(example = "Monday")]
    pub day: String,
    #[schema(example = 8.0)]
    pub hours: f64,
    #[schema(example = 30)]
    pub break_minutes: i64,
}

/// The weekly record matching a date together with that weekday's detail row.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DailyTargetRow {
    pub id: u64,
    pub title: String,
    pub employee_id: u64,
    pub valid_from: NaiveDate,
    pub valid_to: NaiveDate,
    pub no_break_hours: bool,
    pub set_target_hours_to_zero_when_date_is_holiday: bool,
    pub day: String,
    pub hours: f64,
    pub break_minutes: i64,
}
