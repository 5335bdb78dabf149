use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use filecask_core::models::{JobStats, JobStatus, ProcessingJob};
use filecask_core::AppError;

const JOB_COLUMNS: &str = r#"
    id,
    file_id,
    status,
    claimed_by,
    claimed_at,
    finished_at,
    last_error,
    attempt_count,
    created_at,
    updated_at
"#;

/// Repository for `processing_jobs`.
///
/// The claim protocol is a two-step candidate-select plus conditional
/// update: a claim succeeds only if the row is still `pending`, so exactly
/// one of any number of racing workers wins and the losers observe a lost
/// race rather than an error. The partial unique index on non-terminal jobs
/// backs the one-active-job-per-file invariant on the enqueue side.
#[derive(Clone)]
pub struct JobRepository {
    pool: PgPool,
}

impl JobRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Enqueue a `pending` job for a file. Fails with `Conflict` when a
    /// non-terminal job already exists for the file.
    #[tracing::instrument(skip(self))]
    pub async fn enqueue(&self, file_id: Uuid) -> Result<ProcessingJob, AppError> {
        let job = sqlx::query_as::<Postgres, ProcessingJob>(&format!(
            r#"
            INSERT INTO processing_jobs (file_id)
            VALUES ($1)
            RETURNING {JOB_COLUMNS}
            "#,
        ))
        .bind(file_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let Some(db_err) = e.as_database_error() {
                if db_err.is_unique_violation() {
                    return AppError::Conflict(format!(
                        "A non-terminal job already exists for file {}",
                        file_id
                    ));
                }
            }
            AppError::Database(e)
        })?;

        tracing::info!(job_id = %job.id, file_id = %file_id, "Processing job enqueued");

        Ok(job)
    }

    #[tracing::instrument(skip(self))]
    pub async fn get(&self, job_id: Uuid) -> Result<Option<ProcessingJob>, AppError> {
        let job = sqlx::query_as::<Postgres, ProcessingJob>(&format!(
            r#"
            SELECT {JOB_COLUMNS}
            FROM processing_jobs
            WHERE id = $1
            "#,
        ))
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(job)
    }

    /// Latest job for a file, terminal or not (status queries).
    #[tracing::instrument(skip(self))]
    pub async fn latest_for_file(&self, file_id: Uuid) -> Result<Option<ProcessingJob>, AppError> {
        let job = sqlx::query_as::<Postgres, ProcessingJob>(&format!(
            r#"
            SELECT {JOB_COLUMNS}
            FROM processing_jobs
            WHERE file_id = $1
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        ))
        .bind(file_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(job)
    }

    /// The non-terminal job for a file, if any.
    #[tracing::instrument(skip(self))]
    pub async fn active_for_file(&self, file_id: Uuid) -> Result<Option<ProcessingJob>, AppError> {
        let job = sqlx::query_as::<Postgres, ProcessingJob>(&format!(
            r#"
            SELECT {JOB_COLUMNS}
            FROM processing_jobs
            WHERE file_id = $1
              AND status IN ('pending', 'claimed', 'processing')
            LIMIT 1
            "#,
        ))
        .bind(file_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(job)
    }

    /// Oldest claimable candidate. Purely advisory: the claim itself is the
    /// conditional update in [`try_claim`](Self::try_claim).
    #[tracing::instrument(skip(self))]
    pub async fn next_pending(&self) -> Result<Option<ProcessingJob>, AppError> {
        let job = sqlx::query_as::<Postgres, ProcessingJob>(&format!(
            r#"
            SELECT {JOB_COLUMNS}
            FROM processing_jobs
            WHERE status = 'pending'
            ORDER BY created_at ASC
            LIMIT 1
            "#,
        ))
        .fetch_optional(&self.pool)
        .await?;

        Ok(job)
    }

    /// Atomically claim a job: succeeds only if the row is still `pending`.
    /// Returns `None` when another worker won the race.
    #[tracing::instrument(skip(self))]
    pub async fn try_claim(
        &self,
        job_id: Uuid,
        worker_id: &str,
    ) -> Result<Option<ProcessingJob>, AppError> {
        let job = sqlx::query_as::<Postgres, ProcessingJob>(&format!(
            r#"
            UPDATE processing_jobs
            SET status = 'claimed',
                claimed_by = $2,
                claimed_at = NOW(),
                attempt_count = attempt_count + 1,
                updated_at = NOW()
            WHERE id = $1 AND status = 'pending'
            RETURNING {JOB_COLUMNS}
            "#,
        ))
        .bind(job_id)
        .bind(worker_id)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(ref job) = job {
            tracing::debug!(
                job_id = %job.id,
                file_id = %job.file_id,
                worker_id = %worker_id,
                attempt = job.attempt_count,
                "Job claimed"
            );
        }

        Ok(job)
    }

    /// Transition a claimed job to `processing` before running the pipeline.
    /// Conditional on the claim still being ours (a stale-claim reclaim may
    /// have intervened).
    #[tracing::instrument(skip(self))]
    pub async fn mark_processing(
        &self,
        job_id: Uuid,
        worker_id: &str,
    ) -> Result<Option<ProcessingJob>, AppError> {
        let job = sqlx::query_as::<Postgres, ProcessingJob>(&format!(
            r#"
            UPDATE processing_jobs
            SET status = 'processing',
                updated_at = NOW()
            WHERE id = $1 AND status = 'claimed' AND claimed_by = $2
            RETURNING {JOB_COLUMNS}
            "#,
        ))
        .bind(job_id)
        .bind(worker_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(job)
    }

    /// Record a stage-tagged failure. The file stays listed with whatever
    /// derivatives were produced before the failure.
    #[tracing::instrument(skip(self))]
    pub async fn mark_failed(
        &self,
        job_id: Uuid,
        last_error: &str,
    ) -> Result<ProcessingJob, AppError> {
        let job = sqlx::query_as::<Postgres, ProcessingJob>(&format!(
            r#"
            UPDATE processing_jobs
            SET status = 'failed',
                last_error = $2,
                finished_at = NOW(),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {JOB_COLUMNS}
            "#,
        ))
        .bind(job_id)
        .bind(last_error)
        .fetch_one(&self.pool)
        .await?;

        tracing::error!(
            job_id = %job.id,
            file_id = %job.file_id,
            attempt = job.attempt_count,
            error = %last_error,
            "Job failed"
        );

        Ok(job)
    }

    /// Explicit retry of a failed job: back to `pending` with the attempt
    /// bound reset. The only non-monotonic transition in the state machine.
    #[tracing::instrument(skip(self))]
    pub async fn retry_failed(&self, job_id: Uuid) -> Result<ProcessingJob, AppError> {
        let job = sqlx::query_as::<Postgres, ProcessingJob>(&format!(
            r#"
            UPDATE processing_jobs
            SET status = 'pending',
                claimed_by = NULL,
                claimed_at = NULL,
                finished_at = NULL,
                last_error = NULL,
                attempt_count = 0,
                updated_at = NOW()
            WHERE id = $1 AND status = 'failed'
            RETURNING {JOB_COLUMNS}
            "#,
        ))
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| {
            AppError::Conflict(format!("Job {} is not in a retryable state", job_id))
        })?;

        tracing::info!(job_id = %job.id, file_id = %job.file_id, "Job manually retried");

        Ok(job)
    }

    /// Supersede a still-pending job for a file ahead of a new submission.
    /// Returns whether a job was superseded. Claimed/processing jobs are
    /// never superseded; they must reach a terminal state first.
    #[tracing::instrument(skip(self))]
    pub async fn supersede_pending(&self, file_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE processing_jobs
            SET status = 'failed',
                last_error = 'superseded: replaced by a new submission',
                finished_at = NOW(),
                updated_at = NOW()
            WHERE file_id = $1 AND status = 'pending'
            "#,
        )
        .bind(file_id)
        .execute(&self.pool)
        .await?;

        let superseded = result.rows_affected() > 0;
        if superseded {
            tracing::info!(file_id = %file_id, "Pending job superseded");
        }

        Ok(superseded)
    }

    /// Reset jobs claimed longer than the staleness window back to
    /// `pending`. The owning worker is presumed crashed; every stage write
    /// is an idempotent overwrite, so a re-run is safe. Returns the number
    /// of reclaimed jobs.
    #[tracing::instrument(skip(self))]
    pub async fn reclaim_stale(&self, stale_claim_secs: i64) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE processing_jobs
            SET status = 'pending',
                claimed_by = NULL,
                claimed_at = NULL,
                updated_at = NOW()
            WHERE status IN ('claimed', 'processing')
              AND claimed_at < NOW() - ($1 * interval '1 second')
            "#,
        )
        .bind(stale_claim_secs)
        .execute(&self.pool)
        .await?;

        let count = result.rows_affected();
        if count > 0 {
            tracing::warn!(
                count = count,
                stale_claim_secs = stale_claim_secs,
                "Reclaimed stale job claims"
            );
        }

        Ok(count)
    }

    /// Aggregated job counts for an owner.
    #[tracing::instrument(skip(self))]
    pub async fn stats(&self, owner_id: Uuid) -> Result<JobStats, AppError> {
        use sqlx::Row;
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) as total,
                COUNT(*) FILTER (WHERE j.status = 'pending') as pending,
                COUNT(*) FILTER (WHERE j.status = 'claimed') as claimed,
                COUNT(*) FILTER (WHERE j.status = 'processing') as processing,
                COUNT(*) FILTER (WHERE j.status = 'ready') as ready,
                COUNT(*) FILTER (WHERE j.status = 'failed') as failed
            FROM processing_jobs j
            JOIN ingested_files f ON f.id = j.file_id
            WHERE f.owner_id = $1
            "#,
        )
        .bind(owner_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(JobStats {
            total: row.get::<Option<i64>, _>("total").unwrap_or(0),
            pending: row.get::<Option<i64>, _>("pending").unwrap_or(0),
            claimed: row.get::<Option<i64>, _>("claimed").unwrap_or(0),
            processing: row.get::<Option<i64>, _>("processing").unwrap_or(0),
            ready: row.get::<Option<i64>, _>("ready").unwrap_or(0),
            failed: row.get::<Option<i64>, _>("failed").unwrap_or(0),
        })
    }

    /// Delete terminal jobs older than the given number of days, bounding
    /// growth of the jobs table. Returns the number of rows deleted.
    #[tracing::instrument(skip(self))]
    pub async fn delete_old_finished(&self, older_than_days: i32) -> Result<u64, AppError> {
        use sqlx::Row;

        let result = sqlx::query(
            r#"
            WITH deleted AS (
                DELETE FROM processing_jobs
                WHERE status IN ('ready', 'failed')
                    AND COALESCE(finished_at, updated_at) < NOW() - ($1 * interval '1 day')
                RETURNING id
            )
            SELECT COUNT(*)::bigint FROM deleted
            "#,
        )
        .bind(older_than_days)
        .fetch_one(&self.pool)
        .await?;

        let count: i64 = result.get(0);
        let count = count.max(0) as u64;

        if count > 0 {
            tracing::info!(
                count = count,
                older_than_days = older_than_days,
                "Deleted old finished jobs"
            );
        }

        Ok(count)
    }

    /// Current job status for a file id: `(status, last_error)` of the
    /// latest job, if the file has ever been enqueued.
    #[tracing::instrument(skip(self))]
    pub async fn status_for_file(
        &self,
        file_id: Uuid,
    ) -> Result<Option<(JobStatus, Option<String>)>, AppError> {
        Ok(self
            .latest_for_file(file_id)
            .await?
            .map(|job| (job.status, job.last_error)))
    }
}
