use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema)]
pub enum LeaveStatus {
    Open,
    Approved,
    Rejected,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct LeaveApplication {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = 1000)]
    pub employee_id: u64,
    #[schema(example = "Annual Leave")]
    pub leave_type: String,
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub from_date: NaiveDate,
    #[schema(example = "2026-01-03", format = "date", value_type = String)]
    pub to_date: NaiveDate,
    pub half_day: bool,
    #[schema(example = "Approved")]
    pub status: String,
    pub description: Option<String>,
    #[schema(example = "2026-01-01T00:00:00Z", format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,
}

/// Leave row joined with the employee name, as exported to the calendar.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LeaveCalendarEntry {
    pub id: u64,
    pub employee_name: String,
    pub leave_type: String,
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
    pub status: String,
    pub description: Option<String>,
}
