use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use utoipa::ToSchema;

use crate::error::{HrError, HrResult};
use crate::model::employee::fetch_active_employee;
use crate::model::weekly_working_hours::{DailyHoursDetail, WeeklyWorkingHours};
use crate::utils::dates::weekday_name;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct WeeklyWorkingHoursReq {
    #[schema(example = 1)]
    pub employee_id: u64,
    #[schema(example = "2024-01-01", value_type = Option<String>, format = "date")]
    pub valid_from: Option<NaiveDate>,
    #[schema(example = "2024-12-31", value_type = Option<String>, format = "date")]
    pub valid_to: Option<NaiveDate>,
    #[serde(default)]
    pub no_break_hours: bool,
    #[serde(default)]
    pub set_target_hours_to_zero_when_date_is_holiday: bool,
    pub hours: Vec<DailyHoursDetail>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct WeeklyWorkingHoursDetail {
    #[serde(flatten)]
    pub record: WeeklyWorkingHours,
    pub hours: Vec<DailyHoursDetail>,
}

#[derive(Debug, Clone, Copy, Serialize, ToSchema)]
pub struct FiscalYearRange {
    #[schema(value_type = String, format = "date")]
    pub year_start_date: NaiveDate,
    #[schema(value_type = String, format = "date")]
    pub year_end_date: NaiveDate,
}

pub fn name_prefix(company_abbr: &str, year: i32, employee_code: &str) -> String {
    format!("{}-{}-{}-", company_abbr, year, employee_code)
}

/// Next title in the prefix's series given the titles already taken.
pub fn next_title<'a>(prefix: &str, taken: impl IntoIterator<Item = &'a str>) -> String {
    let last = taken
        .into_iter()
        .filter_map(|t| t.strip_prefix(prefix))
        .filter_map(|n| n.parse::<u32>().ok())
        .max()
        .unwrap_or(0);
    format!("{}{:04}", prefix, last + 1)
}

/// True when one range fully contains the other.
pub fn ranges_contain(a: (NaiveDate, NaiveDate), b: (NaiveDate, NaiveDate)) -> bool {
    (a.0 <= b.0 && a.1 >= b.1) || (a.0 >= b.0 && a.1 <= b.1)
}

fn required_range(req: &WeeklyWorkingHoursReq) -> HrResult<(NaiveDate, NaiveDate)> {
    match (req.valid_from, req.valid_to) {
        (Some(from), Some(to)) if from <= to => Ok((from, to)),
        (Some(_), Some(_)) => Err(HrError::validation("From Date must be before To Date.")),
        _ => Err(HrError::validation("From Date and To Date are required.")),
    }
}

/// Normalizes the weekday names and rejects duplicates or unknown days.
fn normalize_details(details: &[DailyHoursDetail]) -> HrResult<Vec<DailyHoursDetail>> {
    let mut seen: Vec<Weekday> = Vec::with_capacity(details.len());
    let mut out = Vec::with_capacity(details.len());
    for d in details {
        let day = d
            .day
            .trim()
            .parse::<Weekday>()
            .map_err(|_| HrError::Validation(format!("Unknown day '{}'", d.day)))?;
        if seen.contains(&day) {
            return Err(HrError::Validation(format!("{} is listed twice", weekday_name(day))));
        }
        if d.hours < 0.0 || d.break_minutes < 0 {
            return Err(HrError::Validation(format!(
                "Hours and break minutes for {} cannot be negative",
                weekday_name(day)
            )));
        }
        seen.push(day);
        out.push(DailyHoursDetail {
            day: weekday_name(day).to_string(),
            hours: d.hours,
            break_minutes: d.break_minutes,
        });
    }
    Ok(out)
}

async fn check_overlaps(
    pool: &MySqlPool,
    employee_id: u64,
    employee_code: &str,
    range: (NaiveDate, NaiveDate),
    exclude_id: Option<u64>,
) -> HrResult<()> {
    let existing = sqlx::query_as::<_, (u64, String, NaiveDate, NaiveDate)>(
        "SELECT id, title, valid_from, valid_to FROM weekly_working_hours WHERE employee_id = ?",
    )
    .bind(employee_id)
    .fetch_all(pool)
    .await?;

    let clashes: Vec<String> = existing
        .into_iter()
        .filter(|(id, ..)| Some(*id) != exclude_id)
        .filter(|(_, _, from, to)| ranges_contain((*from, *to), range))
        .map(|(_, title, ..)| title)
        .collect();

    if clashes.is_empty() {
        return Ok(());
    }
    Err(HrError::Validation(format!(
        "Following Weekly Working Hours record already exists for {} for the specified date range: {}",
        employee_code,
        clashes.join(", ")
    )))
}

async fn company_abbr(pool: &MySqlPool, company: &str) -> HrResult<String> {
    sqlx::query_scalar::<_, String>("SELECT abbr FROM companies WHERE name = ?")
        .bind(company)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| HrError::Validation(format!("Company {} has no abbreviation", company)))
}

async fn write_details(
    tx: &mut sqlx::Transaction<'_, sqlx::MySql>,
    weekly_id: u64,
    details: &[DailyHoursDetail],
) -> HrResult<()> {
    sqlx::query("DELETE FROM daily_hours_details WHERE weekly_working_hours_id = ?")
        .bind(weekly_id)
        .execute(&mut **tx)
        .await?;
    for d in details {
        sqlx::query(
            "INSERT INTO daily_hours_details (weekly_working_hours_id, day, hours, break_minutes) VALUES (?, ?, ?, ?)",
        )
        .bind(weekly_id)
        .bind(&d.day)
        .bind(d.hours)
        .bind(d.break_minutes)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

pub async fn create_weekly_working_hours(
    pool: &MySqlPool,
    req: &WeeklyWorkingHoursReq,
    today: NaiveDate,
) -> HrResult<WeeklyWorkingHoursDetail> {
    let employee = fetch_active_employee(pool, req.employee_id).await?;
    let range = required_range(req)?;
    let details = normalize_details(&req.hours)?;
    check_overlaps(pool, employee.id, &employee.employee_code, range, None).await?;

    let prefix = name_prefix(
        &company_abbr(pool, &employee.company).await?,
        today.year(),
        &employee.employee_code,
    );

    let mut tx = pool.begin().await?;
    let taken = sqlx::query_scalar::<_, String>(
        "SELECT title FROM weekly_working_hours WHERE title LIKE ? FOR UPDATE",
    )
    .bind(format!("{}%", prefix))
    .fetch_all(&mut *tx)
    .await?;
    let title = next_title(&prefix, taken.iter().map(String::as_str));

    let result = sqlx::query(
        r#"
        INSERT INTO weekly_working_hours (
            title, employee_id, company, valid_from, valid_to, no_break_hours,
            set_target_hours_to_zero_when_date_is_holiday
        )
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&title)
    .bind(employee.id)
    .bind(&employee.company)
    .bind(range.0)
    .bind(range.1)
    .bind(req.no_break_hours)
    .bind(req.set_target_hours_to_zero_when_date_is_holiday)
    .execute(&mut *tx)
    .await?;
    let id = result.last_insert_id();
    write_details(&mut tx, id, &details).await?;
    tx.commit().await?;

    tracing::info!(id, title = %title, employee_id = employee.id, "Weekly working hours created");
    get_weekly_working_hours(pool, id).await
}

pub async fn update_weekly_working_hours(
    pool: &MySqlPool,
    id: u64,
    req: &WeeklyWorkingHoursReq,
) -> HrResult<WeeklyWorkingHoursDetail> {
    let current = get_weekly_working_hours(pool, id).await?;
    if current.record.employee_id != req.employee_id {
        return Err(HrError::validation("Employee cannot be changed"));
    }
    let employee = fetch_active_employee(pool, req.employee_id).await?;
    let range = required_range(req)?;
    let details = normalize_details(&req.hours)?;
    check_overlaps(pool, employee.id, &employee.employee_code, range, Some(id)).await?;

    let mut tx = pool.begin().await?;
    sqlx::query(
        r#"
        UPDATE weekly_working_hours
        SET valid_from = ?, valid_to = ?, no_break_hours = ?,
            set_target_hours_to_zero_when_date_is_holiday = ?
        WHERE id = ?
        "#,
    )
    .bind(range.0)
    .bind(range.1)
    .bind(req.no_break_hours)
    .bind(req.set_target_hours_to_zero_when_date_is_holiday)
    .bind(id)
    .execute(&mut *tx)
    .await?;
    write_details(&mut tx, id, &details).await?;
    tx.commit().await?;

    get_weekly_working_hours(pool, id).await
}

pub async fn get_weekly_working_hours(pool: &MySqlPool, id: u64) -> HrResult<WeeklyWorkingHoursDetail> {
    let record = sqlx::query_as::<_, WeeklyWorkingHours>(
        r#"
        SELECT id, title, employee_id, company, valid_from, valid_to, no_break_hours,
               set_target_hours_to_zero_when_date_is_holiday
        FROM weekly_working_hours WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| HrError::NotFound(format!("Weekly Working Hours {} not found", id)))?;

    let hours = sqlx::query_as::<_, DailyHoursDetail>(
        r#"
        SELECT day, hours, break_minutes FROM daily_hours_details
        WHERE weekly_working_hours_id = ?
        ORDER BY FIELD(day, 'Monday', 'Tuesday', 'Wednesday', 'Thursday', 'Friday', 'Saturday', 'Sunday')
        "#,
    )
    .bind(id)
    .fetch_all(pool)
    .await?;

    Ok(WeeklyWorkingHoursDetail { record, hours })
}

pub async fn list_weekly_working_hours(
    pool: &MySqlPool,
    employee_id: u64,
) -> HrResult<Vec<WeeklyWorkingHours>> {
    let rows = sqlx::query_as::<_, WeeklyWorkingHours>(
        r#"
        SELECT id, title, employee_id, company, valid_from, valid_to, no_break_hours,
               set_target_hours_to_zero_when_date_is_holiday
        FROM weekly_working_hours
        WHERE employee_id = ?
        ORDER BY valid_from DESC
        "#,
    )
    .bind(employee_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Moves every permanent employee's records onto the active fiscal year.
pub async fn update_year(pool: &MySqlPool) -> HrResult<FiscalYearRange> {
    let (year_start_date, year_end_date) = sqlx::query_as::<_, (NaiveDate, NaiveDate)>(
        "SELECT year_start_date, year_end_date FROM fiscal_years WHERE disabled = FALSE ORDER BY id LIMIT 1",
    )
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| HrError::validation("No active fiscal year found."))?;

    let result = sqlx::query(
        r#"
        UPDATE weekly_working_hours
        SET valid_from = ?, valid_to = ?
        WHERE employee_id IN (SELECT id FROM employees WHERE permanent = TRUE)
        "#,
    )
    .bind(year_start_date)
    .bind(year_end_date)
    .execute(pool)
    .await?;

    tracing::info!(
        updated = result.rows_affected(),
        %year_start_date,
        %year_end_date,
        "Weekly working hours moved to fiscal year"
    );
    Ok(FiscalYearRange {
        year_start_date,
        year_end_date,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn titles_count_up_per_prefix() {
        let prefix = name_prefix("AC", 2024, "EMP-001");
        assert_eq!(prefix, "AC-2024-EMP-001-");
        assert_eq!(next_title(&prefix, []), "AC-2024-EMP-001-0001");
        assert_eq!(
            next_title(&prefix, ["AC-2024-EMP-001-0001", "AC-2024-EMP-001-0007", "AC-2023-EMP-001-0009"]),
            "AC-2024-EMP-001-0008"
        );
    }

    #[test]
    fn containment_counts_as_overlap_either_way() {
        let year = (d(2024, 1, 1), d(2024, 12, 31));
        let spring = (d(2024, 3, 1), d(2024, 5, 31));
        assert!(ranges_contain(year, spring));
        assert!(ranges_contain(spring, year));
        assert!(ranges_contain(year, year));
    }

    #[test]
    fn partial_overlap_is_not_flagged() {
        let h1 = (d(2024, 1, 1), d(2024, 6, 30));
        let straddle = (d(2024, 6, 1), d(2024, 12, 31));
        assert!(!ranges_contain(h1, straddle));
    }

    #[test]
    fn dates_are_required() {
        let req = WeeklyWorkingHoursReq {
            employee_id: 1,
            valid_from: Some(d(2024, 1, 1)),
            valid_to: None,
            no_break_hours: false,
            set_target_hours_to_zero_when_date_is_holiday: false,
            hours: vec![],
        };
        let err = required_range(&req).unwrap_err();
        assert_eq!(err.to_string(), "From Date and To Date are required.");
    }

    #[test]
    fn day_names_are_normalized() {
        let details = vec![
            DailyHoursDetail { day: "mon".into(), hours: 8.0, break_minutes: 30 },
            DailyHoursDetail { day: "Friday".into(), hours: 6.0, break_minutes: 0 },
        ];
        let out = normalize_details(&details).unwrap();
        assert_eq!(out[0].day, "Monday");
        assert_eq!(out[1].day, "Friday");

        let dup = vec![
            DailyHoursDetail { day: "Monday".into(), hours: 8.0, break_minutes: 30 },
            DailyHoursDetail { day: "mon".into(), hours: 8.0, break_minutes: 30 },
        ];
        assert!(normalize_details(&dup).is_err());
    }
}
