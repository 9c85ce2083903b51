use sqlx::MySqlPool;

use super::{Mail, Notifier, escape_html};
use crate::error::HrResult;
use crate::model::role::Role;
use crate::model::scheduled_job_log::{JobStatus, ScheduledJobLog};
use crate::model::settings::{AlertChannel, HrAddonSettings};

#[derive(Debug, Clone, PartialEq)]
pub enum AlertAction {
    Email(Mail),
    SystemNotification {
        users: Vec<String>,
        subject: String,
        body: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlannedAlert {
    pub log_id: u64,
    pub action: AlertAction,
}

pub fn alert_subject(log: &ScheduledJobLog) -> String {
    format!("Scheduled Job Failed: {}", log.job_type)
}

pub fn alert_body(log: &ScheduledJobLog) -> String {
    format!(
        "<p>The scheduled job <b>{}</b> failed at {}.</p><pre>{}</pre>",
        escape_html(&log.job_type),
        log.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
        escape_html(log.details.as_deref().unwrap_or("No details recorded"))
    )
}

/// One alert per failed entry. Returns nothing when the channel has no one
/// to deliver to, which leaves the entries unreported.
pub fn plan_alerts(
    failures: &[ScheduledJobLog],
    channel: AlertChannel,
    email_recipients: &[String],
    admin_users: &[String],
) -> Vec<PlannedAlert> {
    let has_audience = match channel {
        AlertChannel::Email => !email_recipients.is_empty(),
        AlertChannel::SystemNotification => !admin_users.is_empty(),
    };
    if !has_audience {
        return Vec::new();
    }

    failures
        .iter()
        .map(|log| {
            let subject = alert_subject(log);
            let body = alert_body(log);
            let action = match channel {
                AlertChannel::Email => AlertAction::Email(Mail {
                    recipients: email_recipients.to_vec(),
                    subject,
                    html_body: body,
                }),
                AlertChannel::SystemNotification => AlertAction::SystemNotification {
                    users: admin_users.to_vec(),
                    subject,
                    body,
                },
            };
            PlannedAlert {
                log_id: log.id,
                action,
            }
        })
        .collect()
}

pub async fn unreported_failures(pool: &MySqlPool) -> HrResult<Vec<ScheduledJobLog>> {
    let rows = sqlx::query_as::<_, ScheduledJobLog>(
        r#"
        SELECT id, job_type, status, details, created_at, reported
        FROM scheduled_job_logs
        WHERE status = ? AND reported = FALSE
        ORDER BY created_at ASC
        "#,
    )
    .bind(JobStatus::Failed.as_ref())
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

async fn active_admin_users(pool: &MySqlPool) -> HrResult<Vec<String>> {
    let users = sqlx::query_scalar::<_, String>(
        "SELECT username FROM users WHERE role_id = ? AND is_active = TRUE ORDER BY id",
    )
    .bind(Role::Admin.id())
    .fetch_all(pool)
    .await?;
    Ok(users)
}

async fn insert_notifications(
    pool: &MySqlPool,
    users: &[String],
    subject: &str,
    body: &str,
) -> HrResult<()> {
    let mut tx = pool.begin().await?;
    for user in users {
        sqlx::query("INSERT INTO notification_logs (for_user, subject, body) VALUES (?, ?, ?)")
            .bind(user)
            .bind(subject)
            .bind(body)
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;
    Ok(())
}

async fn mark_reported(pool: &MySqlPool, log_id: u64) -> HrResult<()> {
    sqlx::query("UPDATE scheduled_job_logs SET reported = TRUE WHERE id = ?")
        .bind(log_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Alerts about failed scheduled jobs not reported yet. A failed dispatch
/// leaves its entry for the next run. Returns the number of entries reported.
pub async fn send_failed_job_alerts(
    pool: &MySqlPool,
    notifier: &dyn Notifier,
    settings: &HrAddonSettings,
) -> HrResult<usize> {
    if !settings.enable_failed_job_alerts {
        return Ok(0);
    }

    let failures = unreported_failures(pool).await?;
    if failures.is_empty() {
        return Ok(0);
    }

    let admins = match settings.failed_job_alert_channel {
        AlertChannel::SystemNotification => active_admin_users(pool).await?,
        AlertChannel::Email => Vec::new(),
    };
    let plan = plan_alerts(
        &failures,
        settings.failed_job_alert_channel,
        &settings.failed_job_alert_recipients,
        &admins,
    );
    if plan.is_empty() {
        tracing::warn!(
            failures = failures.len(),
            channel = %settings.failed_job_alert_channel,
            "Failed job alerts have no recipients"
        );
        return Ok(0);
    }

    let mut reported = 0;
    for alert in plan {
        let dispatched = match &alert.action {
            AlertAction::Email(mail) => notifier.send_mail(mail).await,
            AlertAction::SystemNotification { users, subject, body } => {
                insert_notifications(pool, users, subject, body).await
            }
        };
        match dispatched {
            Ok(()) => {
                mark_reported(pool, alert.log_id).await?;
                reported += 1;
            }
            Err(e) => {
                tracing::error!(error = %e, log_id = alert.log_id, "Failed job alert not delivered");
            }
        }
    }
    Ok(reported)
}
