use std::collections::HashSet;

use chrono::{Datelike, Days, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use utoipa::ToSchema;

use super::compute::{
    BreakSettings, DailyTarget, DayPolicy, WorkdayLog, apply_comp_off, apply_leave_status,
    compute_day,
};
use super::unmarked::{Employment, check_range, unmarked_days_in_month, unmarked_days_in_range};
use crate::error::{HrError, HrResult};
use crate::model::employee::{Employee, active_employee_ids, fetch_active_employee, fetch_employee};
use crate::model::employee_checkin::EmployeeCheckin;
use crate::model::settings::HrAddonSettings;
use crate::model::weekly_working_hours::DailyTargetRow;
use crate::model::workday::{WORKDAY_COLUMNS, Workday, WorkdayCheckin, WorkdayStatus};
use crate::queue::JobQueue;
use crate::utils::dates::{format_dotted, last_day_of_month, month_number, weekday_name};
use crate::utils::error_log::log_error;

/// What a bulk run does with the missing dates it finds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum BulkFlag {
    #[serde(rename = "Create workday")]
    CreateWorkday,
    #[serde(rename = "List missing")]
    ListMissing,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BulkWorkdayJob {
    pub employee_id: u64,
    #[schema(value_type = Vec<String>, example = json!(["2024-03-04"]))]
    pub unmarked_days: Vec<NaiveDate>,
    pub flag: BulkFlag,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BulkOutcome {
    /// Dates (dd.MM.yyyy) that were processed
    pub missing_dates: Vec<String>,
    pub flag: BulkFlag,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CreatedWorkday {
    #[schema(example = "04.03.2024")]
    pub log_date: String,
    pub id: u64,
}

/// Leave applications affecting a day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DayOverrides {
    pub comp_off: bool,
    pub on_leave: bool,
}

/// Splits approved leave types covering a day into comp-time and regular leave.
pub fn classify_leaves(leave_types: &[String], comp_off_types: &[String]) -> DayOverrides {
    let is_comp_off = |t: &String| comp_off_types.iter().any(|c| c.eq_ignore_ascii_case(t));
    DayOverrides {
        comp_off: leave_types.iter().any(is_comp_off),
        on_leave: leave_types.iter().any(|t| !is_comp_off(t)),
    }
}

/// Runs the day overrides on a freshly computed log.
pub fn finalize_log(
    log: &mut WorkdayLog,
    status: WorkdayStatus,
    overrides: DayOverrides,
) -> WorkdayStatus {
    if overrides.comp_off {
        apply_comp_off(log);
    }
    apply_leave_status(log, status, overrides.on_leave)
}

pub async fn employee_checkins(
    pool: &MySqlPool,
    employee_id: u64,
    date: NaiveDate,
) -> HrResult<Vec<EmployeeCheckin>> {
    let rows = sqlx::query_as::<_, EmployeeCheckin>(
        r#"
        SELECT id, employee_id, log_type, time, skip_auto_attendance, attendance_id
        FROM employee_checkins
        WHERE employee_id = ? AND DATE(time) = ?
        ORDER BY time ASC
        "#,
    )
    .bind(employee_id)
    .bind(date)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// The weekly working hours row valid on `date` for that weekday.
pub async fn daily_target(
    pool: &MySqlPool,
    employee_id: u64,
    date: NaiveDate,
) -> HrResult<DailyTargetRow> {
    let mut rows = sqlx::query_as::<_, DailyTargetRow>(
        r#"
        SELECT w.id, w.title, w.employee_id, w.valid_from, w.valid_to, w.no_break_hours,
               w.set_target_hours_to_zero_when_date_is_holiday,
               d.day, d.hours, d.break_minutes
        FROM weekly_working_hours w
        JOIN daily_hours_details d ON d.weekly_working_hours_id = w.id
        WHERE w.employee_id = ?
          AND d.day = ?
          AND w.valid_from <= ?
          AND w.valid_to >= ?
        "#,
    )
    .bind(employee_id)
    .bind(weekday_name(date.weekday()))
    .bind(date)
    .bind(date)
    .fetch_all(pool)
    .await?;

    match rows.len() {
        0 => Err(HrError::Validation(format!(
            "Please create Weekly Working Hours for the selected Employee:{} first for date : {}.",
            employee_id, date
        ))),
        1 => Ok(rows.remove(0)),
        _ => {
            let titles: Vec<&str> = rows.iter().map(|r| r.title.as_str()).collect();
            Err(HrError::Validation(format!(
                "There exist multiple Weekly Working Hours for the Date {}: {}",
                date,
                titles.join(", ")
            )))
        }
    }
}

pub async fn attendance_on(
    pool: &MySqlPool,
    employee_id: u64,
    date: NaiveDate,
) -> HrResult<Option<u64>> {
    let id = sqlx::query_scalar::<_, u64>(
        r#"
        SELECT id FROM attendance
        WHERE employee_id = ? AND attendance_date = ? AND submitted = TRUE
        ORDER BY id ASC
        LIMIT 1
        "#,
    )
    .bind(employee_id)
    .bind(date)
    .fetch_optional(pool)
    .await?;
    Ok(id)
}

pub async fn holidays_between(
    pool: &MySqlPool,
    employee: &Employee,
    from: NaiveDate,
    to: NaiveDate,
) -> HrResult<HashSet<NaiveDate>> {
    let Some(holiday_list_id) = employee.holiday_list_id else {
        tracing::warn!(employee_id = employee.id, "Holiday list not set");
        return Ok(HashSet::new());
    };
    let dates = sqlx::query_scalar::<_, NaiveDate>(
        r#"
        SELECT holiday_date FROM holidays
        WHERE holiday_list_id = ? AND holiday_date BETWEEN ? AND ?
        "#,
    )
    .bind(holiday_list_id)
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await?;
    Ok(dates.into_iter().collect())
}

pub async fn date_is_in_holiday_list(pool: &MySqlPool, employee: &Employee, date: NaiveDate) -> HrResult<bool> {
    Ok(holidays_between(pool, employee, date, date).await?.contains(&date))
}

async fn leave_overrides(
    pool: &MySqlPool,
    employee_id: u64,
    date: NaiveDate,
    comp_off_types: &[String],
) -> HrResult<DayOverrides> {
    let leave_types = sqlx::query_scalar::<_, String>(
        r#"
        SELECT leave_type FROM leave_applications
        WHERE employee_id = ? AND from_date <= ? AND to_date >= ? AND status = 'Approved'
        "#,
    )
    .bind(employee_id)
    .bind(date)
    .bind(date)
    .fetch_all(pool)
    .await?;
    Ok(classify_leaves(&leave_types, comp_off_types))
}

/// Computes the day's log without applying leave overrides or saving.
pub async fn actual_employee_log(
    pool: &MySqlPool,
    settings: &HrAddonSettings,
    employee: &Employee,
    date: NaiveDate,
) -> HrResult<WorkdayLog> {
    let checkins = employee_checkins(pool, employee.id, date).await?;
    let target_row = daily_target(pool, employee.id, date).await?;
    let is_holiday = date_is_in_holiday_list(pool, employee, date).await?;
    let fallback_attendance = if checkins.is_empty() {
        attendance_on(pool, employee.id, date).await?
    } else {
        None
    };

    let target = DailyTarget {
        hours: target_row.hours,
        break_minutes: target_row.break_minutes,
    };
    let policy = DayPolicy {
        no_break_hours: target_row.no_break_hours,
        target_zero_on_holiday: target_row.set_target_hours_to_zero_when_date_is_holiday,
        is_holiday,
    };

    let log = compute_day(&checkins, target, policy, BreakSettings::from(settings), fallback_attendance);
    if log.has_unpaired_checkins() {
        tracing::warn!(
            employee_id = employee.id,
            %date,
            checkins = log.checkins.len(),
            "Check-ins must be in pairs"
        );
    }
    Ok(log)
}

async fn workday_exists(pool: &MySqlPool, employee_id: u64, date: NaiveDate) -> HrResult<bool> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM workdays WHERE employee_id = ? AND log_date = ?",
    )
    .bind(employee_id)
    .bind(date)
    .fetch_one(pool)
    .await?;
    Ok(count > 0)
}

/// The full validation pipeline: compute, comp-time, duplicate check, leave.
async fn evaluate_workday(
    pool: &MySqlPool,
    settings: &HrAddonSettings,
    employee: &Employee,
    date: NaiveDate,
    status: WorkdayStatus,
    is_new: bool,
) -> HrResult<(WorkdayLog, WorkdayStatus)> {
    let mut log = actual_employee_log(pool, settings, employee, date).await?;
    let overrides = leave_overrides(pool, employee.id, date, &settings.comp_off_leave_types).await?;

    if is_new && workday_exists(pool, employee.id, date).await? {
        return Err(HrError::Validation(format!(
            "Workday already exists for employee: {}, on the given date: {}",
            employee.employee_code,
            format_dotted(date)
        )));
    }

    let status = finalize_log(&mut log, status, overrides);
    Ok((log, status))
}

pub async fn get_workday(pool: &MySqlPool, id: u64) -> HrResult<Workday> {
    let sql = format!("SELECT {WORKDAY_COLUMNS} FROM workdays WHERE id = ?");
    sqlx::query_as::<_, Workday>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| HrError::NotFound(format!("Workday {} not found", id)))
}

pub async fn get_workday_checkins(pool: &MySqlPool, workday_id: u64) -> HrResult<Vec<WorkdayCheckin>> {
    let rows = sqlx::query_as::<_, WorkdayCheckin>(
        r#"
        SELECT checkin_id, log_type, log_time, skip_auto_attendance
        FROM workday_checkins
        WHERE workday_id = ?
        ORDER BY log_time ASC
        "#,
    )
    .bind(workday_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

async fn write_checkin_rows(
    tx: &mut sqlx::Transaction<'_, sqlx::MySql>,
    workday_id: u64,
    checkins: &[EmployeeCheckin],
) -> HrResult<()> {
    sqlx::query("DELETE FROM workday_checkins WHERE workday_id = ?")
        .bind(workday_id)
        .execute(&mut **tx)
        .await?;
    for c in checkins {
        sqlx::query(
            r#"
            INSERT INTO workday_checkins (workday_id, checkin_id, log_type, log_time, skip_auto_attendance)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(workday_id)
        .bind(c.id)
        .bind(&c.log_type)
        .bind(c.time)
        .bind(c.skip_auto_attendance)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

fn bind_log<'q>(
    query: sqlx::query::Query<'q, sqlx::MySql, sqlx::mysql::MySqlArguments>,
    status: WorkdayStatus,
    log: &'q WorkdayLog,
) -> sqlx::query::Query<'q, sqlx::MySql, sqlx::mysql::MySqlArguments> {
    query
        .bind(status.as_ref().to_string())
        .bind(log.hours_worked)
        .bind(log.break_hours)
        .bind(log.total_work_seconds)
        .bind(log.total_break_seconds)
        .bind(log.target_hours)
        .bind(log.total_target_seconds)
        .bind(log.expected_break_hours)
        .bind(log.break_minutes)
        .bind(log.actual_working_hours)
        .bind(log.manual_workday)
        .bind(log.first_checkin)
        .bind(log.last_checkout)
        .bind(log.attendance_id)
}

/// Validates and inserts a new workday.
pub async fn create_workday(
    pool: &MySqlPool,
    settings: &HrAddonSettings,
    employee_id: u64,
    log_date: NaiveDate,
    status: WorkdayStatus,
) -> HrResult<Workday> {
    let employee = fetch_employee(pool, employee_id).await?;
    let (log, status) = evaluate_workday(pool, settings, &employee, log_date, status, true).await?;

    let mut tx = pool.begin().await?;
    let insert = sqlx::query(
        r#"
        INSERT INTO workdays (
            employee_id, company, log_date, status, hours_worked, break_hours,
            total_work_seconds, total_break_seconds, target_hours, total_target_seconds,
            expected_break_hours, break_minutes, actual_working_hours, manual_workday,
            first_checkin, last_checkout, attendance_id
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(employee.id)
    .bind(&employee.company)
    .bind(log_date);
    let result = bind_log(insert, status, &log).execute(&mut *tx).await?;
    let workday_id = result.last_insert_id();
    write_checkin_rows(&mut tx, workday_id, &log.checkins).await?;
    tx.commit().await?;

    tracing::info!(workday_id, employee_id, %log_date, status = %status, "Workday created");
    get_workday(pool, workday_id).await
}

/// Re-runs the computation for an existing workday, keeping its status
/// unless leave rules change it.
pub async fn recompute_workday(
    pool: &MySqlPool,
    settings: &HrAddonSettings,
    workday_id: u64,
) -> HrResult<Workday> {
    let existing = get_workday(pool, workday_id).await?;
    let employee = fetch_employee(pool, existing.employee_id).await?;
    let status = existing
        .status
        .parse::<WorkdayStatus>()
        .unwrap_or(WorkdayStatus::Present);
    let (log, status) =
        evaluate_workday(pool, settings, &employee, existing.log_date, status, false).await?;

    let mut tx = pool.begin().await?;
    let update = sqlx::query(
        r#"
        UPDATE workdays SET
            status = ?, hours_worked = ?, break_hours = ?, total_work_seconds = ?,
            total_break_seconds = ?, target_hours = ?, total_target_seconds = ?,
            expected_break_hours = ?, break_minutes = ?, actual_working_hours = ?,
            manual_workday = ?, first_checkin = ?, last_checkout = ?, attendance_id = ?
        WHERE id = ?
        "#,
    );
    bind_log(update, status, &log)
        .bind(workday_id)
        .execute(&mut *tx)
        .await?;
    write_checkin_rows(&mut tx, workday_id, &log.checkins).await?;
    tx.commit().await?;

    get_workday(pool, workday_id).await
}

/// Creates (or just lists) workdays for the given dates. Failures on
/// individual dates are logged and do not stop the run.
pub async fn bulk_process_workdays(
    pool: &MySqlPool,
    settings: &HrAddonSettings,
    job: &BulkWorkdayJob,
) -> HrResult<BulkOutcome> {
    fetch_active_employee(pool, job.employee_id).await?;
    if job.unmarked_days.is_empty() {
        return Err(HrError::validation("Please select a date"));
    }

    let mut missing_dates = Vec::with_capacity(job.unmarked_days.len());
    for date in &job.unmarked_days {
        let outcome = async {
            if job.flag == BulkFlag::CreateWorkday && !workday_exists(pool, job.employee_id, *date).await? {
                create_workday(pool, settings, job.employee_id, *date, WorkdayStatus::Present).await?;
            }
            Ok::<_, HrError>(())
        }
        .await;

        match outcome {
            Ok(()) => missing_dates.push(format_dotted(*date)),
            Err(e) => {
                log_error(
                    pool,
                    "bulk_process_workdays() error",
                    &format!(
                        "Something went wrong in Workday Creation for employee {} on {}: {}",
                        job.employee_id, date, e
                    ),
                )
                .await;
            }
        }
    }

    Ok(BulkOutcome {
        missing_dates,
        flag: job.flag,
    })
}

fn employment(employee: &Employee) -> Employment {
    Employment {
        joining: employee.date_of_joining,
        relieving: employee.relieving_date,
    }
}

pub async fn unmarked_days(
    pool: &MySqlPool,
    employee_id: u64,
    month: &str,
    exclude_holidays: bool,
    today: NaiveDate,
) -> HrResult<Vec<NaiveDate>> {
    let month = month_number(month)
        .ok_or_else(|| HrError::Validation(format!("Unknown month '{}'", month)))?;
    let employee = fetch_employee(pool, employee_id).await?;

    let holidays = match (exclude_holidays, NaiveDate::from_ymd_opt(today.year(), month, 1)) {
        (true, Some(first)) => {
            let last = last_day_of_month(today.year(), month).unwrap_or(first);
            holidays_between(pool, &employee, first, last).await?
        }
        _ => HashSet::new(),
    };

    Ok(unmarked_days_in_month(today.year(), month, employment(&employee), &holidays, today))
}

pub async fn unmarked_range(
    pool: &MySqlPool,
    employee_id: u64,
    from: NaiveDate,
    to: NaiveDate,
) -> HrResult<Vec<NaiveDate>> {
    check_range(from, to)?;
    let employee = fetch_employee(pool, employee_id).await?;
    let marked = sqlx::query_scalar::<_, NaiveDate>(
        "SELECT log_date FROM workdays WHERE employee_id = ? AND log_date BETWEEN ? AND ?",
    )
    .bind(employee_id)
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await?
    .into_iter()
    .collect::<HashSet<_>>();

    Ok(unmarked_days_in_range(from, to, employment(&employee), &marked))
}

pub async fn created_workdays(
    pool: &MySqlPool,
    employee_id: u64,
    from: NaiveDate,
    to: NaiveDate,
) -> HrResult<Vec<CreatedWorkday>> {
    check_range(from, to)?;
    let rows = sqlx::query_as::<_, (NaiveDate, u64)>(
        r#"
        SELECT log_date, id FROM workdays
        WHERE employee_id = ? AND log_date BETWEEN ? AND ?
        ORDER BY log_date ASC
        "#,
    )
    .bind(employee_id)
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(date, id)| CreatedWorkday {
            log_date: format_dotted(date),
            id,
        })
        .collect())
}

/// Enqueues creation of the last seven days' missing workdays for every
/// active employee. Per-employee failures are logged and skipped.
pub async fn generate_workdays_for_past_week(
    pool: &MySqlPool,
    queue: &JobQueue,
    today: NaiveDate,
) -> HrResult<usize> {
    let week_ago = today.checked_sub_days(Days::new(7)).unwrap_or(today);
    let mut enqueued = 0;

    for employee_id in active_employee_ids(pool).await? {
        let days = match unmarked_range(pool, employee_id, week_ago, today).await {
            Ok(days) => days,
            Err(e) => {
                log_error(
                    pool,
                    "Error during fetching unmarked days",
                    &format!("Creating Workday, Got Error: {} while fetching unmarked days for: {}", e, employee_id),
                )
                .await;
                continue;
            }
        };
        if days.is_empty() {
            continue;
        }

        let job = BulkWorkdayJob {
            employee_id,
            unmarked_days: days,
            flag: BulkFlag::CreateWorkday,
        };
        match queue.enqueue(job) {
            Ok(()) => enqueued += 1,
            Err(e) => {
                log_error(
                    pool,
                    "Error during bulk processing for employee",
                    &format!("employee: {}, error: {}", employee_id, e),
                )
                .await;
            }
        }
    }
    Ok(enqueued)
}

/// Whether the weekly generation job is due at `now`.
pub fn generation_due(settings: &HrAddonSettings, now: NaiveDateTime) -> bool {
    settings.enabled && now.weekday() == settings.day && now.hour() == u32::from(settings.time)
}

/// Scheduler entry point for the weekly workday generation. Returns the
/// number of enqueued jobs, or `None` when the run is not due.
pub async fn generate_workdays_scheduled_job(
    pool: &MySqlPool,
    settings: &HrAddonSettings,
    queue: &JobQueue,
    now: NaiveDateTime,
) -> HrResult<Option<usize>> {
    if !settings.enabled {
        return Ok(None);
    }
    if !generation_due(settings, now) {
        tracing::debug!(
            today = %now.weekday(),
            hour = now.hour(),
            expected_day = %settings.day,
            expected_hour = settings.time,
            "Workday generation not due"
        );
        return Ok(None);
    }

    let enqueued = generate_workdays_for_past_week(pool, queue, now.date()).await?;
    tracing::info!(enqueued, "Workday generation enqueued");
    Ok(Some(enqueued))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::settings::BreakCalculationMode;
    use crate::workday::compute::compute_without_checkins;
    use chrono::Weekday;

    fn comp_off_types() -> Vec<String> {
        HrAddonSettings::default().comp_off_leave_types
    }

    #[test]
    fn classifies_comp_off_and_regular_leave() {
        let types = comp_off_types();
        assert_eq!(
            classify_leaves(&["Compensatory Off".into()], &types),
            DayOverrides { comp_off: true, on_leave: false }
        );
        assert_eq!(
            classify_leaves(&["Sick Leave".into()], &types),
            DayOverrides { comp_off: false, on_leave: true }
        );
        assert_eq!(classify_leaves(&[], &types), DayOverrides::default());
        assert_eq!(
            classify_leaves(&["freizeitausgleich (nicht buchen!)".into(), "Annual".into()], &types),
            DayOverrides { comp_off: true, on_leave: true }
        );
    }

    #[test]
    fn leave_wins_over_comp_off() {
        let target = DailyTarget { hours: 8.0, break_minutes: 30 };
        let mut log = compute_without_checkins(target, DayPolicy::default(), None);
        let status = finalize_log(
            &mut log,
            WorkdayStatus::Present,
            DayOverrides { comp_off: true, on_leave: true },
        );
        assert_eq!(status, WorkdayStatus::OnLeave);
        assert_eq!(log.actual_working_hours, 0.0);
        assert_eq!(log.total_work_seconds, 0.0);
        assert_eq!(log.hours_worked, 0.0);
    }

    #[test]
    fn comp_off_alone_keeps_status() {
        let target = DailyTarget { hours: 8.0, break_minutes: 30 };
        let mut log = compute_without_checkins(target, DayPolicy::default(), None);
        let status = finalize_log(
            &mut log,
            WorkdayStatus::Present,
            DayOverrides { comp_off: true, on_leave: false },
        );
        assert_eq!(status, WorkdayStatus::Present);
        assert_eq!(log.actual_working_hours, -8.0);
        assert_eq!(log.total_work_seconds, -28_800.0);
    }

    #[test]
    fn generation_due_only_on_configured_day_and_hour() {
        let settings = HrAddonSettings {
            enabled: true,
            day: Weekday::Mon,
            time: 6,
            workday_break_calculation_mechanism: BreakCalculationMode::FromCheckins,
            ..HrAddonSettings::default()
        };
        let monday = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        assert!(generation_due(&settings, monday.and_hms_opt(6, 15, 0).unwrap()));
        assert!(!generation_due(&settings, monday.and_hms_opt(7, 0, 0).unwrap()));
        let tuesday = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        assert!(!generation_due(&settings, tuesday.and_hms_opt(6, 0, 0).unwrap()));

        let disabled = HrAddonSettings { enabled: false, ..settings };
        assert!(!generation_due(&disabled, monday.and_hms_opt(6, 0, 0).unwrap()));
    }
}
