use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::Utc;
use sqlx::MySqlPool;

use super::ics::{CalendarEvent, render_calendar};
use crate::error::{HrError, HrResult};
use crate::model::leave_application::LeaveCalendarEntry;
use crate::model::settings::HrAddonSettings;

/// `{folder}/{name}.ics`, using the configured folder when set.
pub fn export_path(settings: &HrAddonSettings, default_dir: &Path) -> PathBuf {
    export_path_for(
        settings.ics_folder_path.as_deref().map(Path::new),
        &settings.name_of_calendar_export_ics_file,
        default_dir,
    )
}

pub fn export_path_for(folder: Option<&Path>, file_name: &str, default_dir: &Path) -> PathBuf {
    folder
        .unwrap_or(default_dir)
        .join(format!("{file_name}.ics"))
}

async fn fetch_exported_leaves(pool: &MySqlPool) -> HrResult<Vec<LeaveCalendarEntry>> {
    let entries = sqlx::query_as::<_, LeaveCalendarEntry>(
        r#"
        SELECT
            la.id,
            CONCAT(e.first_name, ' ', e.last_name) AS employee_name,
            la.leave_type,
            la.from_date,
            la.to_date,
            la.status,
            la.description
        FROM leave_applications la
        JOIN employees e ON e.id = la.employee_id
        WHERE la.status IN ('Approved', 'Cancelled')
        ORDER BY la.from_date ASC, la.id ASC
        "#,
    )
    .fetch_all(pool)
    .await?;
    Ok(entries)
}

/// Rebuilds the whole calendar file from the current leave applications.
pub async fn regenerate_calendar(
    pool: &MySqlPool,
    settings: &HrAddonSettings,
    default_dir: &Path,
) -> HrResult<PathBuf> {
    let entries = fetch_exported_leaves(pool).await?;
    let events: Vec<CalendarEvent> = entries.iter().filter_map(CalendarEvent::from_leave).collect();
    let content = render_calendar(&settings.name_of_calendar_export_ics_file, &events, Utc::now());

    let path = export_path(settings, default_dir);
    write_calendar(&path, &content).await?;
    tracing::info!(path = %path.display(), events = events.len(), "Leave calendar exported");
    Ok(path)
}

/// Writes via a temporary sibling file so readers never see a partial file.
pub async fn write_calendar(path: &Path, content: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let tmp = path.with_extension("ics.tmp");
    tokio::fs::write(&tmp, content).await?;
    tokio::fs::rename(&tmp, path).await
}

pub async fn read_calendar(path: &Path) -> HrResult<String> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => Ok(content),
        Err(e) if e.kind() == ErrorKind::NotFound => Err(HrError::NotFound(format!(
            "File '{}' not found.",
            path.display()
        ))),
        Err(e) => Err(e.into()),
    }
}

/// Removes an export; a file that is already gone is not an error.
pub async fn remove_calendar(path: &Path) -> std::io::Result<()> {
    match tokio::fs::remove_file(path).await {
        Err(e) if e.kind() != ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}
