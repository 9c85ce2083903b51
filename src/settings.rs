use std::path::Path;
use std::time::Duration;

use moka::future::Cache;
use once_cell::sync::Lazy;
use sqlx::MySqlPool;

use crate::calendar::export::{export_path, remove_calendar};
use crate::error::{HrError, HrResult};
use crate::model::settings::{HrAddonSettings, SettingsRow};

const SETTINGS_ROW_ID: u8 = 1;

/// Cached copy of the settings row. Updates through [`save_settings`]
/// invalidate it; out-of-band edits show up after the TTL.
static SETTINGS_CACHE: Lazy<Cache<u8, HrAddonSettings>> = Lazy::new(|| {
    Cache::builder()
        .max_capacity(1)
        .time_to_live(Duration::from_secs(300))
        .build()
});

pub async fn cached_settings(pool: &MySqlPool) -> HrResult<HrAddonSettings> {
    if let Some(settings) = SETTINGS_CACHE.get(&SETTINGS_ROW_ID).await {
        return Ok(settings);
    }
    let settings = load_settings(pool).await?;
    SETTINGS_CACHE
        .insert(SETTINGS_ROW_ID, settings.clone())
        .await;
    Ok(settings)
}

pub async fn invalidate_settings() {
    SETTINGS_CACHE.invalidate(&SETTINGS_ROW_ID).await;
}

/// Reads the singleton row; a missing row yields the defaults.
pub async fn load_settings(pool: &MySqlPool) -> HrResult<HrAddonSettings> {
    let row = sqlx::query_as::<_, SettingsRow>(
        r#"
        SELECT enabled, day, time, workday_break_calculation_mechanism,
               swap_hours_worked_and_actual_working_hours,
               enable_work_anniversaries_notification,
               anniversary_notification_email_recipient_role,
               notification_x_days_before,
               enable_work_anniversaries_notification_for_leave_approvers,
               name_of_calendar_export_ics_file, ics_folder_path,
               enable_failed_job_alerts, failed_job_alert_channel,
               failed_job_alert_recipients, comp_off_leave_types
        FROM hr_addon_settings
        WHERE id = ?
        "#,
    )
    .bind(SETTINGS_ROW_ID)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => HrAddonSettings::try_from(row).map_err(HrError::Validation),
        None => Ok(HrAddonSettings::default()),
    }
}

pub fn validate_settings(settings: &HrAddonSettings) -> HrResult<()> {
    if settings.time > 23 {
        return Err(HrError::validation("Time must be an hour between 0 and 23"));
    }
    if settings.notification_x_days_before < 0 {
        return Err(HrError::validation("Notification days before cannot be negative"));
    }
    let name = settings.name_of_calendar_export_ics_file.trim();
    if name.is_empty() || name.contains(['/', '\\']) {
        return Err(HrError::validation(
            "Name of calendar export file must be a plain file name",
        ));
    }
    Ok(())
}

/// Persists the settings. A renamed calendar export removes the old file.
pub async fn save_settings(
    pool: &MySqlPool,
    settings: &HrAddonSettings,
    default_ics_dir: &Path,
) -> HrResult<()> {
    validate_settings(settings)?;
    let previous = load_settings(pool).await?;

    sqlx::query(
        r#"
        INSERT INTO hr_addon_settings (
            id, enabled, day, time, workday_break_calculation_mechanism,
            swap_hours_worked_and_actual_working_hours,
            enable_work_anniversaries_notification,
            anniversary_notification_email_recipient_role,
            notification_x_days_before,
            enable_work_anniversaries_notification_for_leave_approvers,
            name_of_calendar_export_ics_file, ics_folder_path,
            enable_failed_job_alerts, failed_job_alert_channel,
            failed_job_alert_recipients, comp_off_leave_types
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON DUPLICATE KEY UPDATE
            enabled = VALUES(enabled),
            day = VALUES(day),
            time = VALUES(time),
            workday_break_calculation_mechanism = VALUES(workday_break_calculation_mechanism),
            swap_hours_worked_and_actual_working_hours = VALUES(swap_hours_worked_and_actual_working_hours),
            enable_work_anniversaries_notification = VALUES(enable_work_anniversaries_notification),
            anniversary_notification_email_recipient_role = VALUES(anniversary_notification_email_recipient_role),
            notification_x_days_before = VALUES(notification_x_days_before),
            enable_work_anniversaries_notification_for_leave_approvers = VALUES(enable_work_anniversaries_notification_for_leave_approvers),
            name_of_calendar_export_ics_file = VALUES(name_of_calendar_export_ics_file),
            ics_folder_path = VALUES(ics_folder_path),
            enable_failed_job_alerts = VALUES(enable_failed_job_alerts),
            failed_job_alert_channel = VALUES(failed_job_alert_channel),
            failed_job_alert_recipients = VALUES(failed_job_alert_recipients),
            comp_off_leave_types = VALUES(comp_off_leave_types)
        "#,
    )
    .bind(SETTINGS_ROW_ID)
    .bind(settings.enabled)
    .bind(settings.day.to_string())
    .bind(settings.time)
    .bind(settings.workday_break_calculation_mechanism.as_ref())
    .bind(settings.swap_hours_worked_and_actual_working_hours)
    .bind(settings.enable_work_anniversaries_notification)
    .bind(settings.anniversary_notification_email_recipient_role.as_deref())
    .bind(settings.notification_x_days_before)
    .bind(settings.enable_work_anniversaries_notification_for_leave_approvers)
    .bind(settings.name_of_calendar_export_ics_file.trim())
    .bind(settings.ics_folder_path.as_deref())
    .bind(settings.enable_failed_job_alerts)
    .bind(settings.failed_job_alert_channel.as_ref())
    .bind(settings.failed_job_alert_recipients.join(","))
    .bind(settings.comp_off_leave_types.join(","))
    .execute(pool)
    .await?;

    invalidate_settings().await;

    let old_path = export_path(&previous, default_ics_dir);
    if old_path != export_path(settings, default_ics_dir) {
        if let Err(e) = remove_calendar(&old_path).await {
            tracing::warn!(error = %e, path = %old_path.display(), "Could not remove old calendar export");
        }
    }
    Ok(())
}

/// Employees listed to receive today's anniversary reminders.
pub async fn anniversary_recipient_ids(pool: &MySqlPool) -> HrResult<Vec<u64>> {
    let ids = sqlx::query_scalar::<_, u64>(
        "SELECT employee_id FROM anniversary_notification_recipients ORDER BY id",
    )
    .fetch_all(pool)
    .await?;
    Ok(ids)
}

pub async fn set_anniversary_recipients(pool: &MySqlPool, employee_ids: &[u64]) -> HrResult<()> {
    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM anniversary_notification_recipients")
        .execute(&mut *tx)
        .await?;
    for id in employee_ids {
        sqlx::query("INSERT IGNORE INTO anniversary_notification_recipients (employee_id) VALUES (?)")
            .bind(id)
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_path_like_file_names() {
        let mut s = HrAddonSettings::default();
        s.name_of_calendar_export_ics_file = "../etc/passwd".into();
        assert!(validate_settings(&s).is_err());

        s.name_of_calendar_export_ics_file = "   ".into();
        assert!(validate_settings(&s).is_err());

        s.name_of_calendar_export_ics_file = "Urlaubskalender".into();
        assert!(validate_settings(&s).is_ok());
    }

    #[test]
    fn rejects_negative_lead_days() {
        let mut s = HrAddonSettings::default();
        s.notification_x_days_before = -1;
        assert!(validate_settings(&s).is_err());
    }
}
