use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr)]
pub enum JobStatus {
    Complete,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ScheduledJobLog {
    pub id: u64,
    pub job_type: String,
    pub status: String,
    pub details: Option<String>,
    pub created_at: DateTime<Utc>,
    pub reported: bool,
}
