//! The worker loop.
//!
//! Claim protocol: select a pending candidate, then a single conditional
//! update that succeeds only if the row is still `pending`. A lost race is
//! not an error; the loop simply moves on. Jobs claimed longer than the
//! staleness window are reclaimed by the reaper (the owning worker is
//! presumed crashed), which is safe because every stage write is an
//! idempotent overwrite.
//!
//! Stage failures never crash the worker; they are recorded on the job
//! with a stage tag and the loop continues. Only metadata-store
//! unavailability is fatal: without it the worker cannot safely claim or
//! record anything.

use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;
use tokio::sync::mpsc;
use tokio::time::sleep;
use uuid::Uuid;

use filecask_core::models::{ProcessingJob, Stage};
use filecask_core::{AppError, WorkerConfig};
use filecask_db::{finalize_ready, FileFinalize, FileRepository, JobRepository};
use filecask_processing::{classify, Pipeline};
use filecask_storage::{keys, with_storage_retries, Storage, StorageError};

pub struct WorkerLoop {
    pool: PgPool,
    files: FileRepository,
    jobs: JobRepository,
    pipeline: Arc<Pipeline>,
    storage: Arc<dyn Storage>,
    config: WorkerConfig,
    worker_id: String,
}

impl WorkerLoop {
    pub fn new(
        pool: PgPool,
        files: FileRepository,
        jobs: JobRepository,
        pipeline: Arc<Pipeline>,
        storage: Arc<dyn Storage>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            pool,
            files,
            jobs,
            pipeline,
            storage,
            config,
            worker_id: make_worker_id(),
        }
    }

    /// Identity recorded as `claimed_by` on claimed jobs.
    pub fn worker_id(&self) -> &str {
        &self.worker_id
    }

    /// Run until a shutdown signal arrives. Returns an error only on
    /// metadata-store failure, which is fatal to the process.
    pub async fn run(&self, mut shutdown_rx: mpsc::Receiver<()>) -> Result<(), AppError> {
        tracing::info!(
            worker_id = %self.worker_id,
            poll_interval_ms = self.config.poll_interval_ms,
            stale_claim_secs = self.config.stale_claim_secs,
            "Worker loop started"
        );

        let (reaper_shutdown_tx, reaper_shutdown_rx) = mpsc::channel::<()>(1);
        if self.config.stale_reap_interval_secs > 0 {
            self.spawn_reaper(reaper_shutdown_rx);
        } else {
            drop(reaper_shutdown_rx);
        }

        let poll_interval = Duration::from_millis(self.config.poll_interval_ms);
        let mut idle = false;

        let result = loop {
            let idle_backoff = idle;
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    tracing::info!(worker_id = %self.worker_id, "Worker loop shutting down");
                    break Ok(());
                }
                _ = async { if idle_backoff { sleep(poll_interval).await } } => {
                    match self.tick().await {
                        Ok(processed) => {
                            idle = !processed;
                        }
                        Err(e) => {
                            // The metadata store is the only shared mutable
                            // resource; without it nothing can be claimed
                            // or recorded.
                            tracing::error!(
                                worker_id = %self.worker_id,
                                error = %e,
                                "Metadata store failure, worker exiting"
                            );
                            break Err(e);
                        }
                    }
                }
            }
        };

        let _ = reaper_shutdown_tx.send(()).await;
        tracing::info!(worker_id = %self.worker_id, "Worker loop stopped");

        result
    }

    /// One claim cycle. Returns whether there was work (claim attempts
    /// count as work so a lost race retries immediately instead of
    /// sleeping).
    async fn tick(&self) -> Result<bool, AppError> {
        let Some(candidate) = self.jobs.next_pending().await? else {
            return Ok(false);
        };

        let Some(job) = self.jobs.try_claim(candidate.id, &self.worker_id).await? else {
            // Another worker won the race; not an error, move on.
            tracing::debug!(
                worker_id = %self.worker_id,
                job_id = %candidate.id,
                "Claim race lost"
            );
            return Ok(true);
        };

        self.process(job).await?;
        Ok(true)
    }

    /// Drive one claimed job through the pipeline and finalize. Stage
    /// failures are recorded on the job; only metadata errors propagate.
    #[tracing::instrument(skip(self, job), fields(job_id = %job.id, file_id = %job.file_id, worker_id = %self.worker_id))]
    async fn process(&self, job: ProcessingJob) -> Result<(), AppError> {
        let Some(job) = self.jobs.mark_processing(job.id, &self.worker_id).await? else {
            // The claim was reclaimed as stale before we started; whoever
            // holds it now will produce the same artifacts.
            tracing::warn!(job_id = %job.id, "Claim lost before processing, skipping");
            return Ok(());
        };

        let file = match self.files.get(job.file_id).await? {
            Some(file) => file,
            None => {
                self.jobs
                    .mark_failed(job.id, "finalize: file missing or deleted")
                    .await?;
                return Ok(());
            }
        };

        let original_key = keys::original_key(file.owner_id, file.id);
        let key = original_key.as_str();
        let original = match with_storage_retries(
            "get",
            self.config.storage_retry_attempts,
            || async move { self.storage.get(key).await },
        )
        .await
        {
            Ok(bytes) => bytes,
            Err(e) => {
                self.fail_with_storage_error(&job, Stage::Extract, e).await?;
                return Ok(());
            }
        };

        let plan = classify(
            &file.declared_mime_type,
            &file.extension(),
            original.len() as u64,
        );

        match self.pipeline.run(&file, &original, &plan).await {
            Ok(outcome) => {
                let finalize = FileFinalize {
                    size_bytes: outcome.size_bytes,
                    content_hash: outcome.content_hash.clone(),
                    resolved_mime_type: outcome.resolved_mime_type.clone(),
                };
                if let Err(e) = finalize_ready(
                    &self.pool,
                    job.id,
                    file.id,
                    &finalize,
                    &outcome.derivatives,
                )
                .await
                {
                    // If recording the failure also fails, the metadata
                    // store is down and the error propagates as fatal.
                    self.jobs
                        .mark_failed(job.id, &format!("{}: {}", Stage::Finalize, e))
                        .await?;
                }
            }
            Err(stage_err) => {
                self.jobs.mark_failed(job.id, &stage_err.tagged()).await?;
            }
        }

        Ok(())
    }

    async fn fail_with_storage_error(
        &self,
        job: &ProcessingJob,
        stage: Stage,
        err: StorageError,
    ) -> Result<(), AppError> {
        self.jobs
            .mark_failed(job.id, &format!("{}: {}", stage, err))
            .await?;
        Ok(())
    }

    /// Spawn the stale-claim reaper and the finished-job retention
    /// cleanup on their own intervals.
    fn spawn_reaper(&self, mut shutdown_rx: mpsc::Receiver<()>) {
        let jobs = self.jobs.clone();
        let stale_claim_secs = self.config.stale_claim_secs;
        let reap_interval = Duration::from_secs(self.config.stale_reap_interval_secs);
        let retention_days = self.config.job_retention_days;

        tokio::spawn(async move {
            let mut reap = tokio::time::interval(reap_interval);
            reap.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            let mut cleanup = tokio::time::interval(Duration::from_secs(24 * 3600));
            cleanup.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = reap.tick() => {
                        if let Err(e) = jobs.reclaim_stale(stale_claim_secs).await {
                            tracing::error!(error = %e, "Stale claim reaper failed");
                        }
                    }
                    _ = cleanup.tick() => {
                        if retention_days > 0 {
                            if let Err(e) = jobs.delete_old_finished(retention_days).await {
                                tracing::error!(error = %e, "Finished job cleanup failed");
                            }
                        }
                    }
                    _ = shutdown_rx.recv() => break,
                }
            }
        });
    }
}

/// Hostname plus a process-unique suffix; stable for the process lifetime
/// so claims and logs correlate.
fn make_worker_id() -> String {
    let host = hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string());
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}:{}", host, &suffix[..8])
}
