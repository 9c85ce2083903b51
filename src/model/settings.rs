use chrono::Weekday;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

/// How break time is derived for a workday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema)]
pub enum BreakCalculationMode {
    #[strum(serialize = "Break Hours from Employee Checkins")]
    #[serde(rename = "Break Hours from Employee Checkins")]
    FromCheckins,
    #[strum(serialize = "Break Hours from Weekly Working Hours")]
    #[serde(rename = "Break Hours from Weekly Working Hours")]
    FromWeeklyWorkingHours,
    #[strum(serialize = "Break Hours from Weekly Working Hours if Shorter breaks")]
    #[serde(rename = "Break Hours from Weekly Working Hours if Shorter breaks")]
    FromWeeklyWorkingHoursIfShorter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema)]
pub enum AlertChannel {
    Email,
    #[strum(serialize = "System Notification")]
    #[serde(rename = "System Notification")]
    SystemNotification,
}

/// Raw singleton row as stored.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SettingsRow {
    pub enabled: bool,
    pub day: String,
    pub time: u8,
    pub workday_break_calculation_mechanism: String,
    pub swap_hours_worked_and_actual_working_hours: bool,
    pub enable_work_anniversaries_notification: bool,
    pub anniversary_notification_email_recipient_role: Option<String>,
    pub notification_x_days_before: i64,
    pub enable_work_anniversaries_notification_for_leave_approvers: bool,
    pub name_of_calendar_export_ics_file: String,
    pub ics_folder_path: Option<String>,
    pub enable_failed_job_alerts: bool,
    pub failed_job_alert_channel: String,
    pub failed_job_alert_recipients: Option<String>,
    pub comp_off_leave_types: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct HrAddonSettings {
    /// Enables the weekly workday generation job
    pub enabled: bool,
    #[schema(value_type = String, example = "Monday")]
    pub day: Weekday,
    /// Hour of day (0-23) the generation job runs
    #[schema(example = 1)]
    pub time: u8,
    pub workday_break_calculation_mechanism: BreakCalculationMode,
    pub swap_hours_worked_and_actual_working_hours: bool,
    pub enable_work_anniversaries_notification: bool,
    #[schema(example = "HR Manager")]
    pub anniversary_notification_email_recipient_role: Option<String>,
    #[schema(example = 7)]
    pub notification_x_days_before: i64,
    pub enable_work_anniversaries_notification_for_leave_approvers: bool,
    #[schema(example = "leave_calendar")]
    pub name_of_calendar_export_ics_file: String,
    pub ics_folder_path: Option<String>,
    pub enable_failed_job_alerts: bool,
    pub failed_job_alert_channel: AlertChannel,
    pub failed_job_alert_recipients: Vec<String>,
    pub comp_off_leave_types: Vec<String>,
}

impl Default for HrAddonSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            day: Weekday::Mon,
            time: 1,
            workday_break_calculation_mechanism: BreakCalculationMode::FromCheckins,
            swap_hours_worked_and_actual_working_hours: false,
            enable_work_anniversaries_notification: false,
            anniversary_notification_email_recipient_role: None,
            notification_x_days_before: 7,
            enable_work_anniversaries_notification_for_leave_approvers: false,
            name_of_calendar_export_ics_file: "leave_calendar".to_string(),
            ics_folder_path: None,
            enable_failed_job_alerts: false,
            failed_job_alert_channel: AlertChannel::Email,
            failed_job_alert_recipients: Vec::new(),
            comp_off_leave_types: vec![
                "Compensatory Off".to_string(),
                "Freizeitausgleich (Nicht buchen!)".to_string(),
            ],
        }
    }
}

fn split_list(raw: Option<&str>) -> Vec<String> {
    raw.unwrap_or_default()
        .split(|c| c == ',' || c == '\n')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

impl TryFrom<SettingsRow> for HrAddonSettings {
    type Error = String;

    fn try_from(row: SettingsRow) -> Result<Self, Self::Error> {
        let day = row
            .day
            .parse::<Weekday>()
            .map_err(|_| format!("invalid weekday '{}'", row.day))?;
        if row.time > 23 {
            return Err(format!("invalid hour {}", row.time));
        }
        let workday_break_calculation_mechanism = row
            .workday_break_calculation_mechanism
            .parse()
            .map_err(|_| {
                format!(
                    "invalid break calculation mechanism '{}'",
                    row.workday_break_calculation_mechanism
                )
            })?;
        let failed_job_alert_channel = row
            .failed_job_alert_channel
            .parse()
            .map_err(|_| format!("invalid alert channel '{}'", row.failed_job_alert_channel))?;

        Ok(Self {
            enabled: row.enabled,
            day,
            time: row.time,
            workday_break_calculation_mechanism,
            swap_hours_worked_and_actual_working_hours: row
                .swap_hours_worked_and_actual_working_hours,
            enable_work_anniversaries_notification: row.enable_work_anniversaries_notification,
            anniversary_notification_email_recipient_role: row
                .anniversary_notification_email_recipient_role
                .filter(|r| !r.trim().is_empty()),
            notification_x_days_before: row.notification_x_days_before,
            enable_work_anniversaries_notification_for_leave_approvers: row
                .enable_work_anniversaries_notification_for_leave_approvers,
            name_of_calendar_export_ics_file: row.name_of_calendar_export_ics_file,
            ics_folder_path: row.ics_folder_path.filter(|p| !p.trim().is_empty()),
            enable_failed_job_alerts: row.enable_failed_job_alerts,
            failed_job_alert_channel,
            failed_job_alert_recipients: split_list(row.failed_job_alert_recipients.as_deref()),
            comp_off_leave_types: split_list(row.comp_off_leave_types.as_deref()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> SettingsRow {
        SettingsRow {
            enabled: true,
            day: "Friday".into(),
            time: 18,
            workday_break_calculation_mechanism:
                "Break Hours from Weekly Working Hours if Shorter breaks".into(),
            swap_hours_worked_and_actual_working_hours: false,
            enable_work_anniversaries_notification: true,
            anniversary_notification_email_recipient_role: Some("".into()),
            notification_x_days_before: 3,
            enable_work_anniversaries_notification_for_leave_approvers: false,
            name_of_calendar_export_ics_file: "urlaub".into(),
            ics_folder_path: None,
            enable_failed_job_alerts: true,
            failed_job_alert_channel: "System Notification".into(),
            failed_job_alert_recipients: Some("a@x.test, b@x.test,\n".into()),
            comp_off_leave_types: Some("Compensatory Off".into()),
        }
    }

    #[test]
    fn converts_stored_row() {
        let s = HrAddonSettings::try_from(row()).unwrap();
        assert_eq!(s.day, Weekday::Fri);
        assert_eq!(
            s.workday_break_calculation_mechanism,
            BreakCalculationMode::FromWeeklyWorkingHoursIfShorter
        );
        assert_eq!(s.failed_job_alert_channel, AlertChannel::SystemNotification);
        assert_eq!(s.failed_job_alert_recipients, vec!["a@x.test", "b@x.test"]);
        assert_eq!(s.anniversary_notification_email_recipient_role, None);
        assert_eq!(s.comp_off_leave_types, vec!["Compensatory Off"]);
    }

    #[test]
    fn rejects_unknown_mechanism_and_hour() {
        let mut r = row();
        r.workday_break_calculation_mechanism = "Guess".into();
        assert!(HrAddonSettings::try_from(r).is_err());

        let mut r = row();
        r.time = 24;
        assert!(HrAddonSettings::try_from(r).is_err());
    }

    #[test]
    fn mode_names_round_trip_through_strum() {
        for mode in [
            BreakCalculationMode::FromCheckins,
            BreakCalculationMode::FromWeeklyWorkingHours,
            BreakCalculationMode::FromWeeklyWorkingHoursIfShorter,
        ] {
            assert_eq!(mode.to_string().parse::<BreakCalculationMode>().unwrap(), mode);
        }
    }
}
