use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, Utc};
use sqlx::MySqlPool;
use tokio::time::{MissedTickBehavior, interval};

use crate::error::HrResult;
use crate::model::scheduled_job_log::JobStatus;
use crate::notifications::SharedNotifier;
use crate::notifications::anniversary::send_work_anniversary_notifications;
use crate::notifications::failed_jobs::send_failed_job_alerts;
use crate::queue::JobQueue;
use crate::settings::cached_settings;
use crate::utils::error_log::log_error;
use crate::workday::service::generate_workdays_scheduled_job;

pub const JOB_GENERATE_WORKDAYS: &str = "generate_workdays_scheduled_job";
pub const JOB_WORK_ANNIVERSARIES: &str = "send_work_anniversary_notification";
pub const JOB_FAILED_JOB_ALERTS: &str = "send_failed_job_alerts";

pub struct Scheduler {
    pool: MySqlPool,
    queue: JobQueue,
    notifier: SharedNotifier,
    tick: Duration,
    last_daily_run: Option<NaiveDate>,
}

/// Whether the once-a-day jobs still have to run for `today`.
pub fn daily_due(last_run: Option<NaiveDate>, today: NaiveDate) -> bool {
    last_run.is_none_or(|last| last < today)
}

/// Local date of the latest `Complete` run of `job_type`, if any.
pub async fn last_complete_run(pool: &MySqlPool, job_type: &str) -> HrResult<Option<NaiveDate>> {
    let at = sqlx::query_scalar::<_, Option<DateTime<Utc>>>(
        "SELECT MAX(created_at) FROM scheduled_job_logs WHERE job_type = ? AND status = ?",
    )
    .bind(job_type)
    .bind(JobStatus::Complete.as_ref())
    .fetch_one(pool)
    .await?;
    Ok(at.map(|at| at.with_timezone(&Local).date_naive()))
}

pub async fn record_job_run(pool: &MySqlPool, job_type: &str, status: JobStatus, details: Option<&str>) {
    if let Err(e) = sqlx::query("INSERT INTO scheduled_job_logs (job_type, status, details) VALUES (?, ?, ?)")
        .bind(job_type)
        .bind(status.as_ref())
        .bind(details)
        .execute(pool)
        .await
    {
        tracing::error!(error = %e, job_type, "Failed to record scheduled job run");
    }
}

impl Scheduler {
    pub fn new(pool: MySqlPool, queue: JobQueue, notifier: SharedNotifier, tick: Duration) -> Self {
        Self {
            pool,
            queue,
            notifier,
            tick,
            last_daily_run: None,
        }
    }

    pub fn spawn(self) {
        actix_web::rt::spawn(self.run());
    }

    async fn run(mut self) {
        let mut ticker = interval(self.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tracing::info!(tick_secs = self.tick.as_secs(), "Scheduler started");
        loop {
            ticker.tick().await;
            self.tick_once(Local::now().naive_local()).await;
        }
    }

    async fn tick_once(&mut self, now: NaiveDateTime) {
        let settings = match cached_settings(&self.pool).await {
            Ok(settings) => settings,
            Err(e) => {
                log_error(&self.pool, "Scheduler could not load settings", &e.to_string()).await;
                return;
            }
        };

        let pool = &self.pool;
        let queue = &self.queue;
        let notifier = self.notifier.as_ref();

        if settings.enabled {
            self.guarded(JOB_GENERATE_WORKDAYS, async {
                let enqueued = generate_workdays_scheduled_job(pool, &settings, queue, now).await?;
                Ok(enqueued.map(|n| format!("{} employees enqueued", n)))
            })
            .await;
        }

        if settings.enable_failed_job_alerts {
            self.guarded(JOB_FAILED_JOB_ALERTS, async {
                let reported = send_failed_job_alerts(pool, notifier, &settings).await?;
                Ok((reported > 0).then(|| format!("{} failures reported", reported)))
            })
            .await;
        }

        let today = now.date();
        if daily_due(self.last_daily_run, today) {
            // the job log survives restarts, the in-memory marker does not
            let persisted = match last_complete_run(pool, JOB_WORK_ANNIVERSARIES).await {
                Ok(persisted) => persisted,
                Err(e) => {
                    log_error(pool, "Scheduler could not read the job log", &e.to_string()).await;
                    return;
                }
            };
            let last_run = self.last_daily_run.max(persisted);
            self.last_daily_run = Some(today);
            if daily_due(last_run, today) && settings.enable_work_anniversaries_notification {
                self.guarded(JOB_WORK_ANNIVERSARIES, async {
                    let sent = send_work_anniversary_notifications(pool, notifier, &settings, today).await?;
                    Ok(Some(format!("{} mails sent", sent)))
                })
                .await;
            }
        }
    }

    /// Runs one job, catching its error. Failures land in the job log and the
    /// error log; a success is logged only when the job reports details.
    async fn guarded<F>(&self, job_type: &str, job: F)
    where
        F: Future<Output = HrResult<Option<String>>>,
    {
        match job.await {
            Ok(Some(details)) => {
                record_job_run(&self.pool, job_type, JobStatus::Complete, Some(&details)).await;
            }
            Ok(None) => {}
            Err(e) => {
                let message = e.to_string();
                log_error(&self.pool, job_type, &message).await;
                record_job_run(&self.pool, job_type, JobStatus::Failed, Some(&message)).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn daily_jobs_run_once_per_date() {
        let mon = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        let tue = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        assert!(daily_due(None, mon));
        assert!(!daily_due(Some(mon), mon));
        assert!(daily_due(Some(mon), tue));
    }

    #[test]
    fn logged_run_counts_after_a_restart() {
        let mon = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        let in_memory: Option<NaiveDate> = None;
        assert!(!daily_due(in_memory.max(Some(mon)), mon));
        let sun = NaiveDate::from_ymd_opt(2024, 3, 3).unwrap();
        assert!(daily_due(in_memory.max(Some(sun)), mon));
    }
}
