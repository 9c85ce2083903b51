use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::{MySql, MySqlPool, QueryBuilder};
use utoipa::{IntoParams, ToSchema};

use crate::error::HrResult;
use crate::model::workday::{WORKDAY_COLUMNS, Workday};

const SECONDS_PER_HOUR: f64 = 3600.0;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ReportColumn {
    pub fieldname: &'static str,
    pub label: &'static str,
    pub width: u16,
}

pub fn columns() -> Vec<ReportColumn> {
    let col = |fieldname, label, width| ReportColumn { fieldname, label, width };
    vec![
        col("log_date", "Date", 110),
        col("name", "Work Day", 200),
        col("status", "Status", 80),
        col("total_work_seconds", "Work Hours", 110),
        col("expected_break_hours", "Expected Break Hours", 80),
        col("actual_working_seconds", "Actual Working Hours", 110),
        col("total_target_seconds", "Target Seconds", 80),
        col("actual_diff_log", "Diff (Actual Working Hours - Target Seconds)", 110),
        col("first_in", "First Checkin", 100),
        col("last_out", "Last Checkout", 100),
        col("attendance", "Attendance", 160),
    ]
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct WorkHourFilter {
    #[param(value_type = Option<String>, format = "date")]
    pub date_from_filter: Option<NaiveDate>,
    #[param(value_type = Option<String>, format = "date")]
    pub date_to_filter: Option<NaiveDate>,
    pub employee_id: Option<u64>,
}

impl WorkHourFilter {
    /// The date range only applies when both ends are given.
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        self.date_from_filter.zip(self.date_to_filter)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct WorkHourRow {
    pub name: u64,
    #[schema(value_type = String, format = "date")]
    pub log_date: NaiveDate,
    pub employee: u64,
    pub attendance: Option<u64>,
    pub status: String,
    pub total_work_seconds: f64,
    pub total_break_seconds: f64,
    pub actual_working_seconds: f64,
    pub expected_break_hours: f64,
    pub target_hours: f64,
    pub total_target_seconds: f64,
    pub diff_log: f64,
    pub actual_diff_log: f64,
    /// Time of day, HH:MM:SS
    pub first_in: Option<String>,
    pub last_out: Option<String>,
}

impl From<&Workday> for WorkHourRow {
    fn from(w: &Workday) -> Self {
        let work_seconds = w.hours_worked * SECONDS_PER_HOUR;
        let actual_seconds = w.actual_working_hours * SECONDS_PER_HOUR;
        let actual_diff_log = if w.actual_working_hours < 0.0 {
            actual_seconds
        } else {
            actual_seconds - w.total_target_seconds
        };

        Self {
            name: w.id,
            log_date: w.log_date,
            employee: w.employee_id,
            attendance: w.attendance_id,
            status: w.status.clone(),
            total_work_seconds: work_seconds,
            total_break_seconds: w.break_hours * SECONDS_PER_HOUR,
            actual_working_seconds: actual_seconds,
            expected_break_hours: w.expected_break_hours * SECONDS_PER_HOUR,
            target_hours: w.target_hours,
            total_target_seconds: w.total_target_seconds,
            diff_log: work_seconds.max(0.0) - w.total_target_seconds,
            actual_diff_log,
            first_in: w.first_checkin.map(|t| t.format("%H:%M:%S").to_string()),
            last_out: w.last_checkout.map(|t| t.format("%H:%M:%S").to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct WorkHourReport {
    pub columns: Vec<ReportColumn>,
    pub data: Vec<WorkHourRow>,
}

pub async fn work_hour_report(pool: &MySqlPool, filter: &WorkHourFilter) -> HrResult<WorkHourReport> {
    let mut qb: QueryBuilder<MySql> =
        QueryBuilder::new(format!("SELECT {WORKDAY_COLUMNS} FROM workdays WHERE 1 = 1"));
    if let Some((from, to)) = filter.date_range() {
        qb.push(" AND log_date >= ").push_bind(from);
        qb.push(" AND log_date <= ").push_bind(to);
    }
    if let Some(employee_id) = filter.employee_id {
        qb.push(" AND employee_id = ").push_bind(employee_id);
    }
    qb.push(" ORDER BY log_date ASC");

    let workdays = qb.build_query_as::<Workday>().fetch_all(pool).await?;
    Ok(WorkHourReport {
        columns: columns(),
        data: workdays.iter().map(WorkHourRow::from).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn workday(hours_worked: f64, actual: f64, target_hours: f64) -> Workday {
        let date = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        Workday {
            id: 9,
            employee_id: 1,
            company: "Acme".into(),
            log_date: date,
            status: "Present".into(),
            hours_worked,
            break_hours: 0.5,
            total_work_seconds: hours_worked * 3600.0,
            total_break_seconds: 1800.0,
            target_hours,
            total_target_seconds: target_hours * 3600.0,
            expected_break_hours: 0.5,
            break_minutes: 30,
            actual_working_hours: actual,
            manual_workday: false,
            first_checkin: date.and_hms_opt(8, 0, 0),
            last_checkout: date.and_hms_opt(16, 30, 0),
            attendance_id: None,
        }
    }

    #[test]
    fn diffs_against_target() {
        let row = WorkHourRow::from(&workday(8.5, 8.0, 7.0));
        assert_eq!(row.total_work_seconds, 30_600.0);
        assert_eq!(row.diff_log, 30_600.0 - 25_200.0);
        assert_eq!(row.actual_diff_log, 28_800.0 - 25_200.0);
        assert_eq!(row.expected_break_hours, 1800.0);
        assert_eq!(row.first_in.as_deref(), Some("08:00:00"));
        assert_eq!(row.last_out.as_deref(), Some("16:30:00"));
    }

    #[test]
    fn negative_actual_is_reported_as_is() {
        let row = WorkHourRow::from(&workday(0.0, -8.0, 8.0));
        assert_eq!(row.actual_diff_log, -28_800.0);
        assert_eq!(row.diff_log, -28_800.0);
    }

    #[test]
    fn negative_worked_hours_clamp_to_zero_in_diff() {
        let row = WorkHourRow::from(&workday(-36.0, -36.0, 8.0));
        assert_eq!(row.diff_log, -28_800.0);
    }

    #[test]
    fn date_range_needs_both_ends() {
        let from = NaiveDate::from_ymd_opt(2024, 3, 1);
        let to = NaiveDate::from_ymd_opt(2024, 3, 31);
        let half = WorkHourFilter { date_from_filter: from, ..Default::default() };
        assert_eq!(half.date_range(), None);
        let full = WorkHourFilter { date_from_filter: from, date_to_filter: to, employee_id: None };
        assert_eq!(full.date_range(), from.zip(to));
    }

    #[test]
    fn column_set_is_fixed() {
        let labels: Vec<&str> = columns().iter().map(|c| c.label).collect();
        assert_eq!(labels.first(), Some(&"Date"));
        assert_eq!(labels.last(), Some(&"Attendance"));
        assert_eq!(labels.len(), 11);
    }
}
