use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "job_status", rename_all = "lowercase")]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Claimed,
    Processing,
    Ready,
    Failed,
}

impl JobStatus {
    /// Terminal states never transition except `failed -> pending` via an
    /// explicit retry.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Ready | JobStatus::Failed)
    }
}

impl Display for JobStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            JobStatus::Pending => write!(f, "pending"),
            JobStatus::Claimed => write!(f, "claimed"),
            JobStatus::Processing => write!(f, "processing"),
            JobStatus::Ready => write!(f, "ready"),
            JobStatus::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for JobStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "claimed" => Ok(JobStatus::Claimed),
            "processing" => Ok(JobStatus::Processing),
            "ready" => Ok(JobStatus::Ready),
            "failed" => Ok(JobStatus::Failed),
            _ => Err(anyhow::anyhow!("Invalid job status: {}", s)),
        }
    }
}

/// One attempt to process one ingested file.
///
/// At most one non-terminal job exists per `file_id` at a time; the
/// database enforces this with a partial unique index.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProcessingJob {
    pub id: Uuid,
    pub file_id: Uuid,
    pub status: JobStatus,
    /// Worker identity holding the claim, null unless claimed/processing.
    pub claimed_by: Option<String>,
    pub claimed_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Stage-tagged message from the most recent failed attempt.
    pub last_error: Option<String>,
    pub attempt_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProcessingJob {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Whether this claim has outlived the staleness window and the owning
    /// worker is presumed crashed.
    pub fn is_stale(&self, stale_claim_secs: i64, now: DateTime<Utc>) -> bool {
        if self.is_terminal() {
            return false;
        }
        match self.claimed_at {
            Some(claimed_at) => {
                now.signed_duration_since(claimed_at).num_seconds() >= stale_claim_secs
            }
            None => false,
        }
    }
}

/// Aggregated job counts for an owner.
#[derive(Debug, Serialize)]
pub struct JobStats {
    pub total: i64,
    pub pending: i64,
    pub claimed: i64,
    pub processing: i64,
    pub ready: i64,
    pub failed: i64,
}
