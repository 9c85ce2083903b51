use sqlx::MySqlPool;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::error::{HrError, HrResult};
use crate::settings::cached_settings;
use crate::utils::error_log::log_error;
use crate::workday::service::{BulkWorkdayJob, bulk_process_workdays};

/// Handle to the `long` background queue. Jobs run one at a time in
/// submission order.
#[derive(Clone)]
pub struct JobQueue {
    tx: UnboundedSender<BulkWorkdayJob>,
}

impl JobQueue {
    pub fn enqueue(&self, job: BulkWorkdayJob) -> HrResult<()> {
        tracing::debug!(employee_id = job.employee_id, days = job.unmarked_days.len(), "Job enqueued");
        self.tx
            .send(job)
            .map_err(|_| HrError::Validation("Background queue is not running".to_string()))
    }

    #[cfg(test)]
    pub(crate) fn detached() -> (Self, UnboundedReceiver<BulkWorkdayJob>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

/// Spawns the worker draining the queue and returns its handle.
pub fn start_long_queue(pool: MySqlPool) -> JobQueue {
    let (tx, rx) = mpsc::unbounded_channel();
    actix_web::rt::spawn(run_worker(pool, rx));
    JobQueue { tx }
}

async fn run_worker(pool: MySqlPool, mut rx: UnboundedReceiver<BulkWorkdayJob>) {
    tracing::info!("Long queue worker started");
    while let Some(job) = rx.recv().await {
        let result = match cached_settings(&pool).await {
            Ok(settings) => bulk_process_workdays(&pool, &settings, &job).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(outcome) => tracing::info!(
                employee_id = job.employee_id,
                processed = outcome.missing_dates.len(),
                "Bulk workday job finished"
            ),
            Err(e) => {
                log_error(
                    &pool,
                    "bulk_process_workdays() error",
                    &format!("employee: {}, error: {}", job.employee_id, e),
                )
                .await;
            }
        }
    }
    tracing::info!("Long queue worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workday::service::BulkFlag;
    use chrono::NaiveDate;

    fn job(employee_id: u64) -> BulkWorkdayJob {
        BulkWorkdayJob {
            employee_id,
            unmarked_days: vec![NaiveDate::from_ymd_opt(2024, 3, 4).unwrap()],
            flag: BulkFlag::CreateWorkday,
        }
    }

    #[actix_web::test]
    async fn jobs_arrive_in_submission_order() {
        let (queue, mut rx) = JobQueue::detached();
        queue.enqueue(job(1)).unwrap();
        queue.enqueue(job(2)).unwrap();
        assert_eq!(rx.recv().await.map(|j| j.employee_id), Some(1));
        assert_eq!(rx.recv().await.map(|j| j.employee_id), Some(2));
    }

    #[actix_web::test]
    async fn enqueue_fails_once_worker_is_gone() {
        let (queue, rx) = JobQueue::detached();
        drop(rx);
        let err = queue.enqueue(job(1)).unwrap_err();
        assert_eq!(err.to_string(), "Background queue is not running");
    }
}
